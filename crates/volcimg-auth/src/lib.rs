//! HMAC-SHA256 request signing for the Volcengine visual API.
//!
//! The scheme belongs to the canonical-request family popularized by AWS
//! Signature Version 4, with its own algorithm tag (`HMAC-SHA256`), header
//! names (`x-date`, `x-content-sha256`) and scope terminator (`request`).
//! Signatures must be byte-exact: the server recomputes them from what it
//! receives.
//!
//! # Usage
//!
//! ```rust
//! use volcimg_auth::{SigningInput, sign};
//!
//! let timestamp = chrono::DateTime::parse_from_rfc3339("2024-05-10T02:30:43Z")
//!     .unwrap()
//!     .with_timezone(&chrono::Utc);
//! let result = sign(&SigningInput {
//!     method: "POST",
//!     canonical_uri: "/",
//!     canonical_query_string: "Action=CVProcess&Version=2022-08-31",
//!     body: b"{}",
//!     host: "visual.volcengineapi.com",
//!     service: "cv",
//!     region: "cn-north-1",
//!     access_key_id: "AKEXAMPLE",
//!     secret_key: "secret",
//!     timestamp,
//! });
//! assert_eq!(result.iso_timestamp, "20240510T023043Z");
//! assert!(result.authorization_header.starts_with("HMAC-SHA256 Credential=AKEXAMPLE/"));
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical request and query string construction
//! - [`credentials`] - Credential provider trait and in-memory implementation
//! - [`error`] - Authentication error types
//! - [`signer`] - Key derivation and request signing
//! - [`verify`] - Server-side recomputation and signature check

pub mod canonical;
pub mod credentials;
pub mod error;
pub mod signer;
pub mod verify;

pub use canonical::build_query_string;
pub use credentials::{CredentialProvider, StaticCredentialProvider};
pub use error::AuthError;
pub use signer::{SigningInput, SigningResult, hash_payload, sign};
pub use verify::{AuthResult, verify_request};
