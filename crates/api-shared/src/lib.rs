//! # API Shared
//!
//! Shared definitions for the CarePulse APIs.
//!
//! Contains:
//! - JSON request/response types with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the `carepulse` CLI so both speak the same shapes.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;

/// Errors raised while converting API input into core types.
#[derive(Debug, thiserror::Error)]
pub enum DtoError {
    #[error("identification document is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}
