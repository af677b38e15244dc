//! Signed HTTP client for `CVProcess`.
//!
//! Each call is a single attempt: no retries, no queuing. The network call is
//! the only suspension point and is awaited to completion.

use std::fmt::Write as _;

use serde_json::Value;
use tracing::{debug, error, info, warn};
use volcimg_auth::build_query_string;
use volcimg_auth::canonical::build_canonical_uri;
use volcimg_auth::signer::{CONTENT_TYPE_JSON, SigningInput, sign, signing_timestamp};
use volcimg_core::{VolcConfig, VolcError, VolcResult};
use volcimg_model::{Dimensions, GenerationRequest, NormalizationOutcome, field_text, normalize};

/// Header carrying the signing timestamp.
pub const X_DATE: &str = "X-Date";

/// Header carrying the hex SHA-256 of the body.
pub const X_CONTENT_SHA256: &str = "X-Content-Sha256";

/// A fully signed request, ready to send.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// Target URL, query included.
    pub url: String,
    /// Headers in send order.
    pub headers: Vec<(&'static str, String)>,
    /// Body bytes; exactly the bytes that were hashed.
    pub body: Vec<u8>,
}

/// Client for the visual API.
#[derive(Debug, Clone)]
pub struct VolcImageClient {
    http: reqwest::Client,
    config: VolcConfig,
}

impl VolcImageClient {
    /// Build a client. Fails before anything is signed if credentials are missing.
    pub fn new(config: VolcConfig) -> VolcResult<Self> {
        config.validate_credentials()?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| VolcError::Configuration(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &VolcConfig {
        &self.config
    }

    /// Generate images for a prompt at the given size.
    ///
    /// Rejects blank prompts with [`VolcError::Validation`] before any network
    /// call. Transport failures are errors; service errors and unknown shapes
    /// come back as [`NormalizationOutcome`] variants.
    pub async fn generate(
        &self,
        prompt: &str,
        dimensions: Dimensions,
    ) -> VolcResult<NormalizationOutcome> {
        let request = GenerationRequest::new(prompt, dimensions, self.config.req_key.as_str())?;
        self.send(&request).await
    }

    /// Sign and send a prepared request, then normalize the response.
    pub async fn send(&self, request: &GenerationRequest) -> VolcResult<NormalizationOutcome> {
        let signed = self.sign_request(request)?;

        info!(
            dimensions = %request.dimensions(),
            aspect_ratio = request.aspect_ratio().map_or("custom", |r| r.label()),
            "Sending generation request"
        );

        let mut builder = self.http.post(&signed.url);
        for (name, value) in &signed.headers {
            builder = builder.header(*name, value);
        }
        let response = builder.body(signed.body).send().await.map_err(|e| {
            error!(error = %e, "Generation request failed");
            transport_error(&e)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| transport_error(&e))?;

        if !status.is_success() {
            let message = describe_failure(status, &text);
            error!(status = status.as_u16(), body = %text, "API returned an error status");
            return Err(VolcError::Transport {
                status: Some(status.as_u16()),
                message,
            });
        }

        let raw: Value = serde_json::from_str(&text).map_err(|e| VolcError::Transport {
            status: Some(status.as_u16()),
            message: format!("response body is not JSON: {e}"),
        })?;

        let outcome = normalize(&raw, request.prompt());
        match &outcome {
            NormalizationOutcome::Images(images) => {
                info!(images = images.len(), "Generation succeeded");
            }
            NormalizationOutcome::ApiError { code, message } => {
                warn!(%code, %message, "Service reported an error");
            }
            NormalizationOutcome::UnrecognizedShape => {
                warn!(body = %text, "Cannot interpret response");
            }
        }
        Ok(outcome)
    }

    /// Serialize, hash and sign a request without sending it.
    ///
    /// The timestamp is read once here and shared by `X-Date` and the
    /// credential scope.
    pub fn sign_request(&self, request: &GenerationRequest) -> VolcResult<SignedRequest> {
        let body = request.to_json_bytes()?;
        let query = build_query_string(&[
            ("Action", self.config.action.as_str()),
            ("Version", self.config.version.as_str()),
        ]);
        let canonical_uri = build_canonical_uri("/");

        let signing = sign(&SigningInput {
            method: "POST",
            canonical_uri: &canonical_uri,
            canonical_query_string: &query,
            body: &body,
            host: &self.config.host,
            service: self.config.service.as_str(),
            region: self.config.region.as_str(),
            access_key_id: &self.config.access_key_id,
            secret_key: &self.config.secret_key,
            timestamp: signing_timestamp(),
        });
        debug!(x_date = %signing.iso_timestamp, "Signed request");

        Ok(SignedRequest {
            url: format!("{}{canonical_uri}?{query}", self.config.base_url()),
            headers: vec![
                ("Content-Type", CONTENT_TYPE_JSON.to_owned()),
                (X_DATE, signing.iso_timestamp),
                (X_CONTENT_SHA256, signing.content_hash),
                ("Authorization", signing.authorization_header),
                ("Host", self.config.host.clone()),
            ],
            body,
        })
    }

    /// Download an image referenced by URL.
    pub async fn fetch_image(&self, url: &str) -> VolcResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| transport_error(&e))?;
        let bytes = response.bytes().await.map_err(|e| transport_error(&e))?;
        Ok(bytes.to_vec())
    }
}

fn transport_error(err: &reqwest::Error) -> VolcError {
    VolcError::Transport {
        status: err.status().map(|s| s.as_u16()),
        message: err.to_string(),
    }
}

/// Build the message for a non-2xx response, including any error metadata the
/// body carries.
fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    let mut message = format!("API request failed with status {}", status.as_u16());
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    if let Some(error) = parsed
        .as_ref()
        .and_then(|v| v.pointer("/ResponseMetadata/Error"))
        .and_then(Value::as_object)
    {
        let code = field_text(error, "Code");
        let detail = field_text(error, "Message");
        let _ = write!(message, "; error code: {code}; error message: {detail}");
    } else if let Some(detail) = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
    {
        let _ = write!(message, "; message: {detail}");
    } else if let Some(reason) = status.canonical_reason() {
        let _ = write!(message, "; {reason}");
    }
    message
}
