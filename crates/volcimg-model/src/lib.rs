//! Request and response model for the visual API.
//!
//! - [`request`] builds the immutable [`GenerationRequest`] sent per action,
//!   including the dimension clamp and aspect-ratio presets.
//! - [`response`] defines the normalized image representation.
//! - [`normalize`] classifies a raw JSON response against the known shapes.

pub mod normalize;
pub mod request;
pub mod response;

pub use normalize::{field_text, normalize};
pub use request::{AspectRatio, Dimensions, GenerationRequest, RequestBody};
pub use response::{ImageDescriptor, ImageEncoding, NormalizationOutcome};
