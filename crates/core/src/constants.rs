//! Constants used throughout the CarePulse core crate.
//!
//! This module contains all path and filename constants to ensure
//! consistency across the codebase and make maintenance easier.

/// Default directory for patient data storage when no explicit directory is configured.
pub const DEFAULT_PATIENT_DATA_DIR: &str = "patient_data";

/// Directory name for user account storage.
pub const USERS_DIR_NAME: &str = "users";

/// Directory name for registered patient storage.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Filename for user account files.
pub const USER_YAML_FILENAME: &str = "user.yaml";

/// Filename for the FHIR-aligned patient resource.
pub const PATIENT_YAML_FILENAME: &str = "patient.yaml";

/// Filename for the per-patient ignore list.
pub const GITIGNORE_FILENAME: &str = ".gitignore";

/// Document bytes live under `files/` and are never committed.
pub const DEFAULT_GITIGNORE: &str = "files/\n";

/// Commit identity used when none is configured.
pub const DEFAULT_COMMIT_AUTHOR_NAME: &str = "CarePulse Registration";
pub const DEFAULT_COMMIT_AUTHOR_EMAIL: &str = "registration@carepulse.local";

/// Identification type preselected on a fresh registration form.
pub const DEFAULT_IDENTIFICATION_TYPE: &str = "Birth Certificate";

/// Static asset paths used by the registration and appointment pages.
pub const LOGO_FULL_ICON: &str = "/assets/icons/logo-full.svg";
pub const APPOINTMENT_IMAGE: &str = "/assets/images/appointment-img.png";
pub const REGISTER_IMAGE: &str = "/assets/images/register-img.png";
pub const USER_ICON: &str = "/assets/icons/user.svg";
pub const EMAIL_ICON: &str = "/assets/icons/email.svg";

pub const COPYRIGHT_NOTICE: &str = "© 2024 CarePulse";
