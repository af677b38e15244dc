//! Error types for volcimg.

/// Every way a generation pipeline run can end without images.
///
/// All variants are terminal for the current invocation. [`VolcError::Decode`]
/// is the exception in spirit: it is recorded per image and never aborts the
/// rest of a batch.
#[derive(Debug, thiserror::Error)]
pub enum VolcError {
    /// Credentials are absent or still hold the placeholder values.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request was rejected before any network call (e.g. an empty prompt).
    #[error("validation error: {0}")]
    Validation(String),

    /// Network failure, non-2xx status, or a body that is not JSON.
    #[error("transport error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Transport {
        /// HTTP status when a response was received.
        status: Option<u16>,
        /// Underlying message, including service error metadata when present.
        message: String,
    },

    /// The service answered with a structured error.
    #[error("service error {code}: {message}")]
    Service {
        /// Service error code (`ResponseMetadata.Error.Code`).
        code: String,
        /// Service error message (`ResponseMetadata.Error.Message`).
        message: String,
    },

    /// The response parsed as JSON but matched no known shape.
    #[error("cannot interpret response: no known image shape matched")]
    UnrecognizedShape,

    /// Neither JPEG nor PNG interpretation of one base64 image succeeded.
    #[error("image {index} could not be decoded: {message}")]
    Decode {
        /// Zero-based position of the image in its batch.
        index: usize,
        /// Last decoder failure.
        message: String,
    },
}

impl VolcError {
    /// Build a [`VolcError::Transport`] without an HTTP status.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }
}

/// Convenience result type for volcimg operations.
pub type VolcResult<T> = Result<T, VolcError>;
