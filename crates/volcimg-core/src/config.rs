//! Configuration for the volcimg client.
//!
//! All configuration is driven by environment variables and resolved once at
//! process start. Nothing here is rotated at runtime.

use std::fmt;
use std::time::Duration;

use tracing::warn;

use crate::error::{VolcError, VolcResult};
use crate::types::{Region, ServiceName};

/// Access key value shipped in templates; treated as "not configured".
pub const PLACEHOLDER_ACCESS_KEY_ID: &str = "YOUR_ACCESS_KEY_ID";

/// Secret key value shipped in templates; treated as "not configured".
pub const PLACEHOLDER_SECRET_KEY: &str = "YOUR_SECRET_ACCESS_KEY";

/// A configuration value that was read but not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigDiagnostic {
    /// The variable was set to a value that cannot be used; the default stays.
    IgnoredValue {
        /// Environment variable name.
        variable: &'static str,
        /// Raw value as found.
        value: String,
    },
}

impl ConfigDiagnostic {
    /// Emit this diagnostic as a warning.
    pub fn log(&self) {
        match self {
            Self::IgnoredValue { variable, value } => {
                warn!(variable, value = %value, "ignoring invalid configuration value");
            }
        }
    }
}

impl fmt::Display for ConfigDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IgnoredValue { variable, value } => {
                write!(f, "ignoring invalid {variable}={value:?}")
            }
        }
    }
}

/// Process-wide configuration for talking to the visual API.
#[derive(Clone)]
pub struct VolcConfig {
    /// Access key ID placed in the credential scope.
    pub access_key_id: String,
    /// Secret key the signing key is derived from. Never logged.
    pub secret_key: String,
    /// API host, also sent as the `Host` header and signed.
    pub host: String,
    /// URL scheme used to reach `host`.
    pub scheme: String,
    /// Service name in the credential scope.
    pub service: ServiceName,
    /// Region in the credential scope.
    pub region: Region,
    /// `Action` query parameter.
    pub action: String,
    /// `Version` query parameter.
    pub version: String,
    /// Model identifier sent as `req_key`.
    pub req_key: String,
    /// Optional transport timeout. `None` waits for the transport's own limit.
    pub timeout: Option<Duration>,
    /// Log level filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for VolcConfig {
    fn default() -> Self {
        Self {
            access_key_id: PLACEHOLDER_ACCESS_KEY_ID.to_owned(),
            secret_key: PLACEHOLDER_SECRET_KEY.to_owned(),
            host: "visual.volcengineapi.com".to_owned(),
            scheme: "https".to_owned(),
            service: ServiceName::default(),
            region: Region::default(),
            action: "CVProcess".to_owned(),
            version: "2022-08-31".to_owned(),
            req_key: "high_aes_general_v30l_zt2i".to_owned(),
            timeout: None,
            log_level: "info".to_owned(),
        }
    }
}

impl fmt::Debug for VolcConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VolcConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_key", &"<redacted>")
            .field("host", &self.host)
            .field("scheme", &self.scheme)
            .field("service", &self.service)
            .field("region", &self.region)
            .field("action", &self.action)
            .field("version", &self.version)
            .field("req_key", &self.req_key)
            .field("timeout", &self.timeout)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl VolcConfig {
    /// Load configuration from environment variables.
    ///
    /// Problems are logged immediately; use [`VolcConfig::load_from_env`] when
    /// no subscriber is installed yet.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup, logging any
    /// ignored values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let (config, diagnostics) = Self::load_from_lookup(lookup);
        for diagnostic in &diagnostics {
            diagnostic.log();
        }
        config
    }

    /// Load configuration from environment variables, returning ignored
    /// values instead of logging them.
    #[must_use]
    pub fn load_from_env() -> (Self, Vec<ConfigDiagnostic>) {
        Self::load_from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unset variables keep their defaults. An unparsable or zero
    /// `VOLC_TIMEOUT_SECS` is ignored and reported in the returned list.
    pub fn load_from_lookup<F>(lookup: F) -> (Self, Vec<ConfigDiagnostic>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let mut diagnostics = Vec::new();

        if let Some(v) = lookup("VOLCANO_AK") {
            config.access_key_id = v;
        }
        if let Some(v) = lookup("VOLCANO_SK") {
            config.secret_key = v;
        }
        if let Some(v) = lookup("VOLC_API_HOST") {
            config.host = v;
        }
        if let Some(v) = lookup("VOLC_API_SCHEME") {
            config.scheme = v;
        }
        if let Some(v) = lookup("VOLC_SERVICE") {
            config.service = ServiceName::new(v);
        }
        if let Some(v) = lookup("VOLC_REGION") {
            config.region = Region::new(v);
        }
        if let Some(v) = lookup("VOLC_ACTION") {
            config.action = v;
        }
        if let Some(v) = lookup("VOLC_API_VERSION") {
            config.version = v;
        }
        if let Some(v) = lookup("VOLC_REQ_KEY") {
            config.req_key = v;
        }
        if let Some(v) = lookup("VOLC_TIMEOUT_SECS") {
            match v.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Some(Duration::from_secs(secs)),
                _ => diagnostics.push(ConfigDiagnostic::IgnoredValue {
                    variable: "VOLC_TIMEOUT_SECS",
                    value: v,
                }),
            }
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        (config, diagnostics)
    }

    /// Check that real credentials are configured.
    ///
    /// Must pass before anything is signed or sent.
    pub fn validate_credentials(&self) -> VolcResult<()> {
        let access_key = self.access_key_id.trim();
        let secret_key = self.secret_key.trim();

        if access_key.is_empty() || access_key == PLACEHOLDER_ACCESS_KEY_ID {
            return Err(VolcError::Configuration(
                "access key ID is not configured (set VOLCANO_AK)".to_owned(),
            ));
        }
        if secret_key.is_empty() || secret_key == PLACEHOLDER_SECRET_KEY {
            return Err(VolcError::Configuration(
                "secret key is not configured (set VOLCANO_SK)".to_owned(),
            ));
        }
        Ok(())
    }

    /// Base URL of the API, without path or query.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}
