//! Generation pipeline for the Volcengine visual API.
//!
//! One user action runs one sequential pipeline:
//!
//! ```text
//! GenerationRequest -> sign -> POST -> normalize -> render
//! ```
//!
//! [`VolcImageClient`] covers the first four steps. [`render()`] resolves each
//! normalized image through the JPEG-then-PNG decode fallback, and [`Gallery`]
//! holds the results of the latest run only.

pub mod client;
pub mod render;

pub use client::{SignedRequest, VolcImageClient, X_CONTENT_SHA256, X_DATE};
pub use render::{
    DecodeFormat, DecodeState, Gallery, ImageCrateDecoder, ImageDecoder, PLACEHOLDER_GLYPH,
    RenderedImage, ResolvedAs, render,
};
