//! Error types for request authentication.
//!
//! Signing itself is total and never fails; these errors come from the
//! verification side, when a received request is checked against its
//! `Authorization` header.

/// Errors that can occur while verifying a signed request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header is missing from the request.
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    /// The `Authorization` header could not be parsed.
    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    /// The signing algorithm is not supported (only HMAC-SHA256 is supported).
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A header referenced in `SignedHeaders` is missing.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// The `Credential` component is not `AK/date/region/service/request`.
    #[error("Invalid credential format")]
    InvalidCredential,

    /// The credential scope date does not match the `x-date` header.
    #[error("Credential date {scope} does not match x-date {timestamp}")]
    DateMismatch {
        /// Date from the credential scope.
        scope: String,
        /// Value of the `x-date` header.
        timestamp: String,
    },

    /// The access key ID was not found in the credential store.
    #[error("Access key not found: {0}")]
    AccessKeyNotFound(String),

    /// `x-content-sha256` does not match the received body.
    #[error("Content hash does not match body")]
    ContentHashMismatch,

    /// The computed signature does not match the provided signature.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,
}
