//! # CarePulse Core
//!
//! Patient registration for the CarePulse clinic front desk.
//!
//! This crate contains the registration form, its validation, the submission pipeline that
//! hands a completed form to a store, and the on-disk store itself:
//! - User accounts and patient records in sharded directories under `PATIENT_DATA_DIR`
//! - A Git repository per record, with the first commit written atomically
//! - Identification documents in content-addressed storage beside the patient record
//!
//! **No API concerns**: HTTP servers and DTOs belong in `api-rest` and `api-shared`.

pub mod actions;
pub mod appointment;
pub mod author;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod form;
pub mod repositories;
pub mod store;
pub mod submission;
pub mod user;

pub(crate) mod repo;
pub(crate) mod versioned_files;

#[cfg(test)]
pub(crate) mod test_support;

pub use actions::PatientActions;
pub use appointment::{load_new_appointment, AppointmentFormType, NewAppointmentView};
pub use author::Author;
pub use catalog::{Doctor, RegistrationCatalog};
pub use config::{catalog_from_env_value, patient_data_dir_from_env_value, CoreConfig};
pub use error::{PatientError, PatientResult};
pub use form::{FieldErrors, FormController, FormError, PatientField, PatientFormValues};
pub use store::LocalStore;
pub use submission::{
    DocumentEnvelope, Navigator, RegisterPatientPayload, RegistrationSubmitter, Route,
    SubmissionState, SubmissionStatus, SubmitOutcome,
};
pub use user::{NewUser, User, ValidatedNewUser};

pub use carepulse_types::{EmailAddress, NonEmptyText, PhoneNumber};
pub use carepulse_uuid::ShardableUuid;
pub use fhir::{DocumentReference, Gender, PatientData};
