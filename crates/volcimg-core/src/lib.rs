//! Core types, configuration, and error handling for volcimg.
//!
//! This crate provides the building blocks shared by the signing, model, and
//! client crates: the process-wide [`VolcConfig`], the [`VolcError`] taxonomy,
//! and the region/service identifiers that scope request signatures.

mod config;
mod error;
mod types;

pub use config::{
    ConfigDiagnostic, PLACEHOLDER_ACCESS_KEY_ID, PLACEHOLDER_SECRET_KEY, VolcConfig,
};
pub use error::{VolcError, VolcResult};
pub use types::{Region, ServiceName};
