//! Credential provider trait and implementations.
//!
//! A [`CredentialProvider`] resolves secret keys from access key IDs on the
//! verifying side. [`StaticCredentialProvider`] covers tests and a single
//! locally configured key pair.

use std::collections::HashMap;
use std::fmt;

use crate::error::AuthError;

/// Trait for looking up secret keys by access key ID.
pub trait CredentialProvider: Send + Sync {
    /// Retrieve the secret key for the given access key ID.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccessKeyNotFound`] if the access key ID is not recognized.
    fn get_secret_key(&self, access_key_id: &str) -> Result<String, AuthError>;
}

/// In-memory credential provider backed by a `HashMap`.
///
/// # Examples
///
/// ```
/// use volcimg_auth::credentials::{CredentialProvider, StaticCredentialProvider};
///
/// let provider = StaticCredentialProvider::new(vec![
///     ("AKEXAMPLE".to_owned(), "testsecret".to_owned()),
/// ]);
///
/// let secret = provider.get_secret_key("AKEXAMPLE").unwrap();
/// assert_eq!(secret, "testsecret");
/// ```
#[derive(Clone)]
pub struct StaticCredentialProvider {
    credentials: HashMap<String, String>,
}

impl StaticCredentialProvider {
    /// Create a provider from (access_key_id, secret_key) pairs.
    pub fn new(credentials: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            credentials: credentials.into_iter().collect(),
        }
    }
}

impl fmt::Debug for StaticCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialProvider")
            .field("access_key_ids", &self.credentials.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn get_secret_key(&self, access_key_id: &str) -> Result<String, AuthError> {
        self.credentials
            .get(access_key_id)
            .cloned()
            .ok_or_else(|| AuthError::AccessKeyNotFound(access_key_id.to_owned()))
    }
}
