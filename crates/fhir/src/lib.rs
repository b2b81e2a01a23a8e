//! FHIR wire/boundary support for CarePulse patient records.
//!
//! This crate provides the **wire model** and **translation helpers** for the on-disk,
//! version-controlled `patient.yaml` written when a patient registers.
//!
//! This crate focuses on:
//! - FHIR semantic alignment (without FHIR JSON/REST transport)
//! - serialisation/deserialisation with strict schema checks
//! - translation between the flat domain record and the nested wire structs
//!
//! Registration fields with no FHIR `Patient` home (occupation, insurance, medical history,
//! consents, document reference) live under a `carepulse` block.

pub mod patient;

// Re-export facades
pub use patient::Patient;

// Re-export public domain-level types
pub use patient::{DocumentReference, Gender, PatientData};

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("invalid UUID: {0}")]
    InvalidUuid(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
