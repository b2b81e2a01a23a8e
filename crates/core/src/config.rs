//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.
//!
//! Environment variables:
//! - `PATIENT_DATA_DIR`: storage root (default: `patient_data`)
//! - `CAREPULSE_CATALOG`: YAML catalog of doctors and identification types (default: built-in)
//! - `CAREPULSE_COMMIT_NAME`, `CAREPULSE_COMMIT_EMAIL`: identity on record commits

use crate::author::Author;
use crate::catalog::RegistrationCatalog;
use crate::constants::{DEFAULT_PATIENT_DATA_DIR, PATIENTS_DIR_NAME, USERS_DIR_NAME};
use crate::error::PatientResult;
use std::path::{Path, PathBuf};

pub const PATIENT_DATA_DIR_ENV: &str = "PATIENT_DATA_DIR";
pub const CATALOG_ENV: &str = "CAREPULSE_CATALOG";
pub const COMMIT_NAME_ENV: &str = "CAREPULSE_COMMIT_NAME";
pub const COMMIT_EMAIL_ENV: &str = "CAREPULSE_COMMIT_EMAIL";

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    patient_data_dir: PathBuf,
    catalog: RegistrationCatalog,
    commit_author: Author,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PatientError::InvalidCatalog`] if the catalog fails validation.
    pub fn new(
        patient_data_dir: PathBuf,
        catalog: RegistrationCatalog,
        commit_author: Author,
    ) -> PatientResult<Self> {
        catalog.validate()?;
        Ok(Self {
            patient_data_dir,
            catalog,
            commit_author,
        })
    }

    /// Resolve configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded or the commit identity is invalid.
    pub fn from_env() -> PatientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PatientResult<Self> {
        let patient_data_dir = patient_data_dir_from_env_value(lookup(PATIENT_DATA_DIR_ENV));
        let catalog = catalog_from_env_value(lookup(CATALOG_ENV))?;
        let author = Author::from_env_values(lookup(COMMIT_NAME_ENV), lookup(COMMIT_EMAIL_ENV))?;
        Self::new(patient_data_dir, catalog, author)
    }

    pub fn patient_data_dir(&self) -> &Path {
        &self.patient_data_dir
    }

    pub fn users_dir(&self) -> PathBuf {
        self.patient_data_dir.join(USERS_DIR_NAME)
    }

    pub fn patients_dir(&self) -> PathBuf {
        self.patient_data_dir.join(PATIENTS_DIR_NAME)
    }

    pub fn catalog(&self) -> &RegistrationCatalog {
        &self.catalog
    }

    pub fn commit_author(&self) -> &Author {
        &self.commit_author
    }
}

/// Resolve the patient data directory from an optional environment value.
///
/// Blank values fall back to [`DEFAULT_PATIENT_DATA_DIR`].
pub fn patient_data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PATIENT_DATA_DIR))
}

/// Resolve the registration catalog from an optional file path.
///
/// Without a path the built-in catalog is used.
pub fn catalog_from_env_value(value: Option<String>) -> PatientResult<RegistrationCatalog> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(path) => RegistrationCatalog::load(Path::new(&path)),
        None => Ok(RegistrationCatalog::default()),
    }
}
