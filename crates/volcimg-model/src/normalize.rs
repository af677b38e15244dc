//! Response normalization.
//!
//! The service has answered with several JSON shapes over time. Each known
//! shape is a `(predicate, extractor)` pair in [`SHAPES`]; [`normalize`] walks
//! the table in order and the first predicate that holds decides the outcome.
//!
//! Order matters. The error shape comes first so a stray data field cannot
//! mask a real error, and newer shapes come before legacy ones so a partially
//! overlapping legacy field cannot hijack a modern response.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::response::{ImageDescriptor, ImageEncoding, NormalizationOutcome};

/// `code` value that marks a successful `binary_data_base64` response.
pub const SUCCESS_CODE: i64 = 10000;

/// One known response shape.
pub struct ResponseShape {
    /// Short name used in logs and tests.
    pub name: &'static str,
    matches: fn(&Value) -> bool,
    extract: fn(&Value, &str) -> NormalizationOutcome,
}

impl fmt::Debug for ResponseShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseShape")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Known shapes, highest priority first.
pub static SHAPES: [ResponseShape; 5] = [
    ResponseShape {
        name: "service_error",
        matches: |raw| service_error(raw).is_some(),
        extract: extract_service_error,
    },
    ResponseShape {
        name: "result_image_list",
        matches: |raw| non_empty_array(raw, "/Result/image_list").is_some(),
        extract: extract_image_list,
    },
    ResponseShape {
        name: "binary_data_base64",
        matches: |raw| {
            is_success_code(raw)
                && non_empty_array(raw, "/data/binary_data_base64").is_some()
        },
        extract: |raw, prompt| {
            extract_strings(raw, "/data/binary_data_base64", ImageEncoding::Base64, prompt)
        },
    },
    ResponseShape {
        name: "image_urls",
        matches: |raw| non_empty_array(raw, "/data/image_urls").is_some(),
        extract: |raw, prompt| extract_strings(raw, "/data/image_urls", ImageEncoding::Url, prompt),
    },
    ResponseShape {
        name: "image_base64",
        matches: |raw| non_empty_array(raw, "/data/image_base64").is_some(),
        extract: |raw, prompt| {
            extract_strings(raw, "/data/image_base64", ImageEncoding::Base64, prompt)
        },
    },
];

/// Name of the first shape `raw` matches, or `None`.
#[must_use]
pub fn classify(raw: &Value) -> Option<&'static str> {
    SHAPES
        .iter()
        .find(|shape| (shape.matches)(raw))
        .map(|shape| shape.name)
}

/// Classify a parsed response and extract its images.
///
/// `prompt_text` becomes the alt text for shapes that carry none of their own.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use volcimg_model::{NormalizationOutcome, normalize};
///
/// let raw = json!({ "data": { "image_urls": ["https://example.com/a.jpg"] } });
/// match normalize(&raw, "a red fox") {
///     NormalizationOutcome::Images(images) => assert_eq!(images[0].alt_text(), "a red fox"),
///     other => panic!("unexpected outcome: {other:?}"),
/// }
/// ```
#[must_use]
pub fn normalize(raw: &Value, prompt_text: &str) -> NormalizationOutcome {
    for shape in &SHAPES {
        if (shape.matches)(raw) {
            let outcome = (shape.extract)(raw, prompt_text);
            if let NormalizationOutcome::Images(images) = &outcome {
                debug!(shape = shape.name, images = images.len(), "Normalized response");
            } else {
                debug!(shape = shape.name, "Normalized response");
            }
            return outcome;
        }
    }
    debug!("Response matched no known shape");
    NormalizationOutcome::UnrecognizedShape
}

fn service_error(raw: &Value) -> Option<&serde_json::Map<String, Value>> {
    raw.pointer("/ResponseMetadata/Error")
        .and_then(Value::as_object)
}

/// `code` equals 10000 as a JSON number, integral or floating.
#[allow(clippy::cast_precision_loss, clippy::float_cmp)]
fn is_success_code(raw: &Value) -> bool {
    let Some(code) = raw.get("code") else {
        return false;
    };
    code.as_i64() == Some(SUCCESS_CODE) || code.as_f64() == Some(SUCCESS_CODE as f64)
}

fn non_empty_array<'a>(raw: &'a Value, pointer: &str) -> Option<&'a Vec<Value>> {
    raw.pointer(pointer)
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
}

/// Text of an error field; non-string values are rendered as JSON and a
/// missing or null field is empty.
#[must_use]
pub fn field_text(object: &serde_json::Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn extract_service_error(raw: &Value, _prompt: &str) -> NormalizationOutcome {
    let Some(error) = service_error(raw) else {
        return NormalizationOutcome::UnrecognizedShape;
    };
    NormalizationOutcome::ApiError {
        code: field_text(error, "Code"),
        message: field_text(error, "Message"),
    }
}

fn extract_image_list(raw: &Value, _prompt: &str) -> NormalizationOutcome {
    let images = non_empty_array(raw, "/Result/image_list")
        .into_iter()
        .flatten()
        .enumerate()
        .filter_map(|(index, entry)| {
            let payload = entry.get("image").and_then(Value::as_str).unwrap_or_default();
            ImageDescriptor::new(ImageEncoding::Base64, payload, format!("image {}", index + 1))
        })
        .collect();
    NormalizationOutcome::Images(images)
}

fn extract_strings(
    raw: &Value,
    pointer: &str,
    encoding: ImageEncoding,
    prompt: &str,
) -> NormalizationOutcome {
    let entries = non_empty_array(raw, pointer).map_or(&[][..], Vec::as_slice);
    let images: Vec<ImageDescriptor> = entries
        .iter()
        .filter_map(|entry| {
            let payload = entry.as_str().unwrap_or_default();
            ImageDescriptor::new(encoding, payload, prompt)
        })
        .collect();

    let skipped = entries.len() - images.len();
    if skipped > 0 {
        debug!(pointer, skipped, "Skipped blank image entries");
    }
    NormalizationOutcome::Images(images)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const PROMPT: &str = "a lighthouse at dusk";

    fn images(outcome: NormalizationOutcome) -> Vec<ImageDescriptor> {
        match outcome {
            NormalizationOutcome::Images(images) => images,
            other => panic!("expected images, got {other:?}"),
        }
    }

    #[test]
    fn test_should_prefer_service_error_over_images() {
        let raw = json!({
            "ResponseMetadata": { "Error": { "Code": "InvalidParameter", "Message": "bad width" } },
            "Result": { "image_list": [{ "image": "abc" }] },
            "code": 10000,
            "data": { "binary_data_base64": ["abc"] }
        });
        assert_eq!(classify(&raw), Some("service_error"));
        assert_eq!(
            normalize(&raw, PROMPT),
            NormalizationOutcome::ApiError {
                code: "InvalidParameter".to_owned(),
                message: "bad width".to_owned(),
            }
        );
    }

    #[test]
    fn test_should_tolerate_missing_error_fields() {
        let raw = json!({ "ResponseMetadata": { "Error": { "Code": 50400 } } });
        assert_eq!(
            normalize(&raw, PROMPT),
            NormalizationOutcome::ApiError {
                code: "50400".to_owned(),
                message: String::new(),
            }
        );
    }

    #[test]
    fn test_should_ignore_metadata_without_error() {
        let raw = json!({
            "ResponseMetadata": { "RequestId": "r-1" },
            "Result": { "image_list": [{ "image": "abc" }] }
        });
        assert_eq!(classify(&raw), Some("result_image_list"));
    }

    #[test]
    fn test_should_extract_image_list_with_indexed_alt_text() {
        let raw = json!({
            "Result": { "image_list": [{ "image": "Zmlyc3Q=" }, { "image": "  " }, { "image": "dGhpcmQ=" }] }
        });
        let images = images(normalize(&raw, PROMPT));
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].alt_text(), "image 1");
        assert_eq!(images[1].alt_text(), "image 3");
        assert!(images.iter().all(|i| i.encoding() == ImageEncoding::Base64));
    }

    #[test]
    fn test_should_prefer_image_list_over_legacy_fields() {
        let raw = json!({
            "Result": { "image_list": [{ "image": "bmV3" }] },
            "data": { "image_urls": ["https://example.com/old.jpg"] }
        });
        let images = images(normalize(&raw, PROMPT));
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].payload(), "bmV3");
    }

    #[test]
    fn test_should_drop_blank_binary_entries() {
        let raw = json!({ "code": 10000, "data": { "binary_data_base64": ["", "  ", "abc"] } });
        let images = images(normalize(&raw, PROMPT));
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].payload(), "abc");
        assert_eq!(images[0].alt_text(), PROMPT);
        assert_eq!(images[0].encoding(), ImageEncoding::Base64);
    }

    #[test]
    fn test_should_require_success_code_for_binary_data() {
        let raw = json!({ "code": 50413, "data": { "binary_data_base64": ["abc"] } });
        assert_eq!(normalize(&raw, PROMPT), NormalizationOutcome::UnrecognizedShape);

        let raw = json!({ "code": "10000", "data": { "binary_data_base64": ["abc"] } });
        assert_eq!(classify(&raw), None);

        let raw = json!({ "code": 10000.0, "data": { "binary_data_base64": ["abc"] } });
        assert_eq!(classify(&raw), Some("binary_data_base64"));

        let raw = json!({ "code": 10000.5, "data": { "binary_data_base64": ["abc"] } });
        assert_eq!(classify(&raw), None);
    }

    #[test]
    fn test_should_fall_through_empty_binary_data_to_urls() {
        let raw = json!({
            "code": 10000,
            "data": { "binary_data_base64": [], "image_urls": ["https://example.com/a.png"] }
        });
        assert_eq!(classify(&raw), Some("image_urls"));
    }

    #[test]
    fn test_should_extract_image_urls() {
        let raw = json!({ "data": { "image_urls": ["https://example.com/a.png", null, "https://example.com/b.png"] } });
        let images = images(normalize(&raw, PROMPT));
        assert_eq!(images.len(), 2);
        assert!(images.iter().all(|i| i.encoding() == ImageEncoding::Url));
        assert_eq!(images[1].payload(), "https://example.com/b.png");
    }

    #[test]
    fn test_should_not_match_empty_image_urls() {
        let raw = json!({ "data": { "image_urls": [] } });
        assert_eq!(normalize(&raw, PROMPT), NormalizationOutcome::UnrecognizedShape);
    }

    #[test]
    fn test_should_fall_through_empty_image_urls_to_legacy_base64() {
        let raw = json!({ "data": { "image_urls": [], "image_base64": ["bGVnYWN5"] } });
        let images = images(normalize(&raw, PROMPT));
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].encoding(), ImageEncoding::Base64);
        assert_eq!(images[0].alt_text(), PROMPT);
    }

    #[test]
    fn test_should_report_unrecognized_shapes() {
        for raw in [
            json!({}),
            json!([]),
            json!("text"),
            json!({ "data": { "image_urls": "https://example.com/a.png" } }),
            json!({ "Result": { "image_list": [] } }),
        ] {
            assert_eq!(normalize(&raw, PROMPT), NormalizationOutcome::UnrecognizedShape, "{raw}");
        }
    }

    #[test]
    fn test_should_list_shapes_in_priority_order() {
        let names: Vec<&str> = SHAPES.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            [
                "service_error",
                "result_image_list",
                "binary_data_base64",
                "image_urls",
                "image_base64"
            ]
        );
    }
}
