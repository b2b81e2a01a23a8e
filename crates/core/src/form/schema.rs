//! Declarative validation rules for the registration and sign-up forms.

use super::field::PatientField;
use super::values::{FieldValue, PatientFormValues};
use crate::catalog::RegistrationCatalog;
use carepulse_types::{EmailAddress, PhoneNumber};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// A single validation rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rule {
    /// The value must be present.
    Required { message: &'static str },
    /// Character count of the trimmed text, inclusive.
    Length { min: usize, max: usize },
    Email,
    Phone,
    /// `YYYY-MM-DD`.
    IsoDate,
    /// The text must equal one of `options`.
    OneOf {
        options: Vec<String>,
        message: &'static str,
    },
    MustBeTrue { message: &'static str },
}

impl Rule {
    /// Check `value`, returning the error message if it fails.
    ///
    /// `subject` is the human name of the field used in length messages.
    pub fn check(&self, subject: &str, value: &FieldValue) -> Option<String> {
        match self {
            Rule::Required { message } => value.is_empty().then(|| message.to_string()),
            Rule::Length { min, max } => {
                let count = value.as_text().map(|s| s.trim().chars().count()).unwrap_or(0);
                if count < *min {
                    Some(format!("{subject} must be at least {min} characters"))
                } else if count > *max {
                    Some(format!("{subject} must be at most {max} characters"))
                } else {
                    None
                }
            }
            Rule::Email => {
                let ok = value.as_text().is_some_and(|s| EmailAddress::is_valid(s.trim()));
                (!ok).then(|| "Invalid email address".to_string())
            }
            Rule::Phone => {
                let ok = value.as_text().is_some_and(|s| PhoneNumber::is_valid(s.trim()));
                (!ok).then(|| "Invalid phone number".to_string())
            }
            Rule::IsoDate => {
                let ok = value.as_text().is_some_and(|s| {
                    let s = s.trim();
                    s.len() == 10 && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                });
                (!ok).then(|| "Invalid date".to_string())
            }
            Rule::OneOf { options, message } => {
                let ok = value
                    .as_text()
                    .is_some_and(|s| options.iter().any(|o| o == s.trim()));
                (!ok).then(|| message.to_string())
            }
            Rule::MustBeTrue { message } => {
                (value.as_bool() != Some(true)).then(|| message.to_string())
            }
        }
    }
}

/// Rules for one field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRules {
    /// Error-map key.
    pub name: &'static str,
    /// Human name used in messages.
    pub subject: &'static str,
    /// Optional fields skip every rule while empty.
    pub optional: bool,
    pub rules: Vec<Rule>,
}

impl FieldRules {
    fn required(name: &'static str, subject: &'static str, rules: Vec<Rule>) -> Self {
        Self {
            name,
            subject,
            optional: false,
            rules,
        }
    }

    fn optional(name: &'static str, subject: &'static str, rules: Vec<Rule>) -> Self {
        Self {
            name,
            subject,
            optional: true,
            rules,
        }
    }

    /// Run the rules in order and return the first failure.
    pub fn check(&self, value: &FieldValue) -> Option<String> {
        if self.optional && value.is_empty() {
            return None;
        }
        self.rules.iter().find_map(|r| r.check(self.subject, value))
    }
}

/// Per-field error messages, at most one per field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `field` unless the field already has one.
    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn remove(&mut self, field: &str) {
        self.0.remove(field);
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Values that passed the registration schema.
///
/// Only [`PatientFormSchema::validate`] constructs this, so holding one proves the values
/// were valid at the time of submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedPatientForm(PatientFormValues);

impl ValidatedPatientForm {
    pub fn values(&self) -> &PatientFormValues {
        &self.0
    }

    pub fn into_values(self) -> PatientFormValues {
        self.0
    }
}

/// The registration form's rule set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientFormSchema {
    fields: Vec<(PatientField, FieldRules)>,
}

impl PatientFormSchema {
    /// Build the rule set, taking one-of options from `catalog`.
    pub fn from_catalog(catalog: &RegistrationCatalog) -> Self {
        use PatientField as F;

        let text = |min, max| Rule::Length { min, max };

        let fields = vec![
            (F::Name, FieldRules::required("name", "Name", vec![text(2, 50)])),
            (F::Email, FieldRules::required("email", "Email", vec![Rule::Email])),
            (F::Phone, FieldRules::required("phone", "Phone", vec![Rule::Phone])),
            (
                F::BirthDate,
                FieldRules::required("birthDate", "Birth date", vec![Rule::IsoDate]),
            ),
            (
                F::Gender,
                FieldRules::required(
                    "gender",
                    "Gender",
                    vec![Rule::OneOf {
                        options: catalog.gender_labels(),
                        message: "Select a gender",
                    }],
                ),
            ),
            (
                F::Address,
                FieldRules::required("address", "Address", vec![text(5, 500)]),
            ),
            (
                F::Occupation,
                FieldRules::required("occupation", "Occupation", vec![text(2, 500)]),
            ),
            (
                F::EmergencyContactName,
                FieldRules::required("emergencyContactName", "Contact name", vec![text(2, 50)]),
            ),
            (
                F::EmergencyContactNumber,
                FieldRules::required(
                    "emergencyContactNumber",
                    "Emergency contact number",
                    vec![Rule::Phone],
                ),
            ),
            (
                F::PrimaryPhysician,
                FieldRules::required(
                    "primaryPhysician",
                    "Primary physician",
                    vec![
                        Rule::Required {
                            message: "Select at least one doctor",
                        },
                        Rule::OneOf {
                            options: catalog.doctor_names(),
                            message: "Select at least one doctor",
                        },
                    ],
                ),
            ),
            (
                F::InsuranceProvider,
                FieldRules::required("insuranceProvider", "Insurance name", vec![text(2, 50)]),
            ),
            (
                F::InsurancePolicyNumber,
                FieldRules::required(
                    "insurancePolicyNumber",
                    "Policy number",
                    vec![text(2, 50)],
                ),
            ),
            (F::Allergies, FieldRules::optional("allergies", "Allergies", vec![])),
            (
                F::CurrentMedication,
                FieldRules::optional("currentMedication", "Current medication", vec![]),
            ),
            (
                F::FamilyMedicalHistory,
                FieldRules::optional("familyMedicalHistory", "Family medical history", vec![]),
            ),
            (
                F::PastMedicalHistory,
                FieldRules::optional("pastMedicalHistory", "Past medical history", vec![]),
            ),
            (
                F::IdentificationType,
                FieldRules::optional(
                    "identificationType",
                    "Identification type",
                    vec![Rule::OneOf {
                        options: catalog.identification_types.clone(),
                        message: "Select a valid identification type",
                    }],
                ),
            ),
            (
                F::IdentificationNumber,
                FieldRules::optional("identificationNumber", "Identification number", vec![]),
            ),
            (
                F::IdentificationDocument,
                FieldRules::optional("identificationDocument", "Identification document", vec![]),
            ),
            (
                F::TreatmentConsent,
                FieldRules::required(
                    "treatmentConsent",
                    "Treatment consent",
                    vec![Rule::MustBeTrue {
                        message: "You must consent to treatment in order to proceed",
                    }],
                ),
            ),
            (
                F::DisclosureConsent,
                FieldRules::required(
                    "disclosureConsent",
                    "Disclosure consent",
                    vec![Rule::MustBeTrue {
                        message: "You must consent to disclosure in order to proceed",
                    }],
                ),
            ),
            (
                F::PrivacyConsent,
                FieldRules::required(
                    "privacyConsent",
                    "Privacy consent",
                    vec![Rule::MustBeTrue {
                        message: "You must consent to privacy in order to proceed",
                    }],
                ),
            ),
        ];

        Self { fields }
    }

    pub fn rules_for(&self, field: PatientField) -> Option<&FieldRules> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, rules)| rules)
    }

    /// Validate a single field.
    pub fn validate_field(&self, field: PatientField, values: &PatientFormValues) -> Option<String> {
        self.rules_for(field)
            .and_then(|rules| rules.check(&values.get(field)))
    }

    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns the per-field messages if any field fails.
    pub fn validate(&self, values: &PatientFormValues) -> Result<ValidatedPatientForm, FieldErrors> {
        let mut errors = FieldErrors::new();
        for (field, rules) in &self.fields {
            if let Some(message) = rules.check(&values.get(*field)) {
                errors.insert(rules.name, message);
            }
        }

        if errors.is_empty() {
            Ok(ValidatedPatientForm(values.clone()))
        } else {
            Err(errors)
        }
    }
}

/// Rules of the sign-up form that precedes registration.
pub(crate) fn user_form_rules() -> [FieldRules; 3] {
    [
        FieldRules::required("name", "Name", vec![Rule::Length { min: 2, max: 50 }]),
        FieldRules::required("email", "Email", vec![Rule::Email]),
        FieldRules::required("phone", "Phone", vec![Rule::Phone]),
    ]
}
