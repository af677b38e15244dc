//! Normalized response representation.

use std::fmt;

use volcimg_core::{VolcError, VolcResult};

/// How an image payload is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageEncoding {
    /// Raw base64 image bytes, no data-URI prefix. Format is undeclared.
    Base64,
    /// Fully-qualified URL to fetch the image from.
    Url,
}

impl fmt::Display for ImageEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Base64 => "base64",
            Self::Url => "url",
        })
    }
}

/// One image in a normalized response.
///
/// The payload is never empty or whitespace-only: [`ImageDescriptor::new`]
/// refuses such entries, so they are dropped before a descriptor exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    encoding: ImageEncoding,
    payload: String,
    alt_text: String,
}

impl ImageDescriptor {
    /// Build a descriptor, or `None` when the payload is blank.
    ///
    /// The stored payload is trimmed.
    #[must_use]
    pub fn new(encoding: ImageEncoding, payload: &str, alt_text: impl Into<String>) -> Option<Self> {
        let payload = payload.trim();
        if payload.is_empty() {
            return None;
        }
        Some(Self {
            encoding,
            payload: payload.to_owned(),
            alt_text: alt_text.into(),
        })
    }

    /// Payload encoding.
    #[must_use]
    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    /// Base64 text or URL.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Alternative text for display.
    #[must_use]
    pub fn alt_text(&self) -> &str {
        &self.alt_text
    }
}

/// Result of classifying one response. Exactly one variant per response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizationOutcome {
    /// Zero or more images.
    Images(Vec<ImageDescriptor>),
    /// The service reported an error.
    ApiError {
        /// Service error code.
        code: String,
        /// Service error message.
        message: String,
    },
    /// No known shape matched.
    UnrecognizedShape,
}

impl NormalizationOutcome {
    /// Turn the outcome into images, mapping the non-image variants to errors.
    pub fn into_images(self) -> VolcResult<Vec<ImageDescriptor>> {
        match self {
            Self::Images(images) => Ok(images),
            Self::ApiError { code, message } => Err(VolcError::Service { code, message }),
            Self::UnrecognizedShape => Err(VolcError::UnrecognizedShape),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_drop_blank_payloads() {
        assert!(ImageDescriptor::new(ImageEncoding::Base64, "", "alt").is_none());
        assert!(ImageDescriptor::new(ImageEncoding::Url, " \n\t ", "alt").is_none());
    }

    #[test]
    fn test_should_trim_payload() {
        let descriptor = ImageDescriptor::new(ImageEncoding::Base64, " abc\n", "alt").unwrap();
        assert_eq!(descriptor.payload(), "abc");
        assert_eq!(descriptor.encoding().to_string(), "base64");
    }

    #[test]
    fn test_should_map_api_error_to_service_error() {
        let outcome = NormalizationOutcome::ApiError {
            code: "AccessDenied".to_owned(),
            message: "nope".to_owned(),
        };
        match outcome.into_images() {
            Err(VolcError::Service { code, message }) => {
                assert_eq!(code, "AccessDenied");
                assert_eq!(message, "nope");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            NormalizationOutcome::UnrecognizedShape.into_images(),
            Err(VolcError::UnrecognizedShape)
        ));
    }
}
