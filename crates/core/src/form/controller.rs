//! Form state: values, dirty set and validation errors.

use super::field::PatientField;
use super::schema::{FieldErrors, PatientFormSchema, ValidatedPatientForm};
use super::values::{FieldValue, PatientFormValues, UploadedFile};
use super::FormError;
use crate::catalog::RegistrationCatalog;
use std::collections::BTreeSet;

/// Holds the registration form's values and validation state.
///
/// Errors are only shown once the user has tried to submit. After the first submit attempt,
/// each change revalidates the changed field so messages clear as soon as the value is fixed.
#[derive(Clone, Debug)]
pub struct FormController {
    catalog: RegistrationCatalog,
    schema: PatientFormSchema,
    values: PatientFormValues,
    dirty: BTreeSet<PatientField>,
    errors: FieldErrors,
    submit_count: u32,
}

impl FormController {
    /// A fresh form with defaults drawn from `catalog`.
    pub fn new(catalog: &RegistrationCatalog) -> Self {
        Self::with_values(catalog, PatientFormValues::defaults_for(catalog))
    }

    /// A form pre-populated with `values`. Nothing is marked dirty.
    pub fn with_values(catalog: &RegistrationCatalog, values: PatientFormValues) -> Self {
        Self {
            catalog: catalog.clone(),
            schema: PatientFormSchema::from_catalog(catalog),
            values,
            dirty: BTreeSet::new(),
            errors: FieldErrors::new(),
            submit_count: 0,
        }
    }

    pub fn values(&self) -> &PatientFormValues {
        &self.values
    }

    pub fn value(&self, field: PatientField) -> FieldValue {
        self.values.get(field)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error(&self, field: PatientField) -> Option<&str> {
        self.errors.get(field.name())
    }

    pub fn is_dirty(&self, field: PatientField) -> bool {
        self.dirty.contains(&field)
    }

    pub fn dirty_fields(&self) -> impl Iterator<Item = PatientField> + '_ {
        self.dirty.iter().copied()
    }

    pub fn submit_count(&self) -> u32 {
        self.submit_count
    }

    /// Change handler for any field.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::WrongValueShape`] if `value` does not fit the field's kind. The form
    /// is left untouched in that case.
    pub fn set_value(&mut self, field: PatientField, value: FieldValue) -> Result<(), FormError> {
        self.values.set(field, value)?;
        self.dirty.insert(field);

        if self.submit_count > 0 {
            self.errors.remove(field.name());
            if let Some(message) = self.schema.validate_field(field, &self.values) {
                self.errors.insert(field.name(), message);
            }
        }
        Ok(())
    }

    pub fn set_text(&mut self, field: PatientField, text: impl Into<String>) -> Result<(), FormError> {
        self.set_value(field, FieldValue::Text(text.into()))
    }

    pub fn set_checked(&mut self, field: PatientField, checked: bool) -> Result<(), FormError> {
        self.set_value(field, FieldValue::Bool(checked))
    }

    pub fn set_document(&mut self, document: Option<UploadedFile>) -> Result<(), FormError> {
        self.set_value(PatientField::IdentificationDocument, FieldValue::File(document))
    }

    /// Validate every field, replacing the error map.
    ///
    /// Returns the validated values when the form is valid; the pipeline must not run otherwise.
    pub fn handle_submit(&mut self) -> Option<ValidatedPatientForm> {
        self.submit_count = self.submit_count.saturating_add(1);
        match self.schema.validate(&self.values) {
            Ok(validated) => {
                self.errors.clear();
                Some(validated)
            }
            Err(errors) => {
                self.errors = errors;
                None
            }
        }
    }

    /// Restore defaults and forget all state.
    pub fn reset(&mut self) {
        self.values = PatientFormValues::defaults_for(&self.catalog);
        self.dirty.clear();
        self.errors.clear();
        self.submit_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::ValueShape;

    fn filled_controller() -> FormController {
        let mut form = FormController::new(&RegistrationCatalog::default());
        let text = [
            (PatientField::Name, "Jane Doe"),
            (PatientField::Email, "jane@example.com"),
            (PatientField::Phone, "+15551234567"),
            (PatientField::BirthDate, "1990-05-14"),
            (PatientField::Gender, "Female"),
            (PatientField::Address, "14th Street, New York"),
            (PatientField::Occupation, "Engineer"),
            (PatientField::EmergencyContactName, "John Doe"),
            (PatientField::EmergencyContactNumber, "+15557654321"),
            (PatientField::PrimaryPhysician, "John Green"),
            (PatientField::InsuranceProvider, "BlueCross"),
            (PatientField::InsurancePolicyNumber, "ABC123"),
        ];
        for (field, value) in text {
            form.set_text(field, value).unwrap();
        }
        for field in [
            PatientField::TreatmentConsent,
            PatientField::DisclosureConsent,
            PatientField::PrivacyConsent,
        ] {
            form.set_checked(field, true).unwrap();
        }
        form
    }

    #[test]
    fn changes_mark_fields_dirty() {
        let mut form = FormController::new(&RegistrationCatalog::default());
        assert_eq!(form.dirty_fields().count(), 0);
        form.set_text(PatientField::Name, "Jane").unwrap();
        assert!(form.is_dirty(PatientField::Name));
        assert!(!form.is_dirty(PatientField::Email));
    }

    #[test]
    fn errors_are_hidden_until_first_submit() {
        let mut form = FormController::new(&RegistrationCatalog::default());
        form.set_text(PatientField::Name, "J").unwrap();
        assert!(form.error(PatientField::Name).is_none());

        assert!(form.handle_submit().is_none());
        assert_eq!(
            form.error(PatientField::Name),
            Some("Name must be at least 2 characters")
        );
        assert_eq!(form.submit_count(), 1);
    }

    #[test]
    fn changes_after_submit_revalidate_the_field() {
        let mut form = FormController::new(&RegistrationCatalog::default());
        assert!(form.handle_submit().is_none());
        assert!(form.error(PatientField::Email).is_some());

        form.set_text(PatientField::Email, "jane@example.com").unwrap();
        assert!(form.error(PatientField::Email).is_none());
        assert!(form.error(PatientField::Phone).is_some());

        form.set_checked(PatientField::PrivacyConsent, true).unwrap();
        assert!(form.error(PatientField::PrivacyConsent).is_none());
        form.set_checked(PatientField::PrivacyConsent, false).unwrap();
        assert!(form.error(PatientField::PrivacyConsent).is_some());
    }

    #[test]
    fn wrong_shape_is_rejected_and_not_marked_dirty() {
        let mut form = FormController::new(&RegistrationCatalog::default());
        let err = form
            .set_value(PatientField::Gender, FieldValue::Bool(true))
            .expect_err("gender takes text");
        assert!(matches!(
            err,
            FormError::WrongValueShape {
                expected: ValueShape::Text,
                found: ValueShape::Bool,
                ..
            }
        ));
        assert!(!form.is_dirty(PatientField::Gender));
        assert_eq!(form.values().gender, "Male");
    }

    #[test]
    fn valid_form_submits_and_clears_errors() {
        let mut form = filled_controller();
        let validated = form.handle_submit().expect("form should be valid");
        assert_eq!(validated.values().primary_physician, "John Green");
        assert!(form.errors().is_empty());
    }

    fn custom_catalog() -> RegistrationCatalog {
        RegistrationCatalog::from_yaml(
            "doctors:\n  - name: Ada Byron\n    image: /assets/images/dr-byron.png\n\
             identificationTypes: [Passport]\n\
             genderOptions: [Female, Other]\n",
        )
        .unwrap()
    }

    #[test]
    fn defaults_come_from_the_catalog() {
        let mut form = FormController::new(&custom_catalog());
        assert_eq!(form.values().gender, "Female");
        assert_eq!(form.values().identification_type, "Passport");

        for (field, value) in [
            (PatientField::Name, "Jane Doe"),
            (PatientField::Email, "jane@example.com"),
            (PatientField::Phone, "+15551234567"),
            (PatientField::BirthDate, "1990-05-14"),
            (PatientField::Address, "14th Street, New York"),
            (PatientField::Occupation, "Engineer"),
            (PatientField::EmergencyContactName, "John Doe"),
            (PatientField::EmergencyContactNumber, "+15557654321"),
            (PatientField::PrimaryPhysician, "Ada Byron"),
            (PatientField::InsuranceProvider, "BlueCross"),
            (PatientField::InsurancePolicyNumber, "ABC123"),
        ] {
            form.set_text(field, value).unwrap();
        }
        for field in [
            PatientField::TreatmentConsent,
            PatientField::DisclosureConsent,
            PatientField::PrivacyConsent,
        ] {
            form.set_checked(field, true).unwrap();
        }

        assert!(form.handle_submit().is_some(), "errors: {:?}", form.errors());

        form.set_text(PatientField::Gender, "Other").unwrap();
        form.reset();
        assert_eq!(form.values().gender, "Female");
        assert_eq!(form.values().identification_type, "Passport");
    }

    #[test]
    fn reset_restores_defaults() {
        let mut form = filled_controller();
        form.handle_submit();
        form.reset();
        assert_eq!(form.values(), &PatientFormValues {
            birth_date: form.values().birth_date.clone(),
            ..PatientFormValues::default()
        });
        assert_eq!(form.submit_count(), 0);
        assert_eq!(form.dirty_fields().count(), 0);
    }
}
