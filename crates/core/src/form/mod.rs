//! The patient registration form.
//!
//! The form is a closed set of [`PatientField`]s. Each field has one [`FieldKind`] which fixes
//! the control it renders as and the [`ValueShape`] it accepts. Values live in a
//! [`FormController`], which validates them against a [`PatientFormSchema`] built from the
//! [`RegistrationCatalog`](crate::catalog::RegistrationCatalog).
//!
//! Control flow:
//!
//! ```text
//! FieldRenderer ── set_value ──▶ FormController ── validate ──▶ PatientFormSchema
//!                                      │
//!                                handle_submit
//!                                      ▼
//!                            ValidatedPatientForm ──▶ submission pipeline
//! ```

mod controller;
mod field;
mod layout;
mod schema;
mod values;

pub use controller::FormController;
pub use field::{
    FieldConfig, FieldIcon, FieldKind, FieldRenderer, PatientField, RenderedControl,
    SelectOption, ValueShape,
};
pub use layout::{
    registration_layout, FormSection, RenderedSection, FORM_HEADING, FORM_SUBHEADING, SUBMIT_LABEL,
};
pub use schema::{FieldErrors, FieldRules, PatientFormSchema, Rule, ValidatedPatientForm};
pub(crate) use schema::user_form_rules;
pub use values::{FieldValue, PatientFormValues, UploadedFile};

/// Errors raised when a value does not fit the field it is written to.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormError {
    #[error("field '{field}' expects a {expected} value, got {found}")]
    WrongValueShape {
        field: PatientField,
        expected: ValueShape,
        found: ValueShape,
    },
}
