//! Field values and the typed value store behind the registration form.

use super::field::{PatientField, ValueShape};
use super::FormError;
use crate::catalog::RegistrationCatalog;
use crate::constants::DEFAULT_IDENTIFICATION_TYPE;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An identification document held in memory until submission.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// A value written into, or read out of, a single form field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    File(Option<UploadedFile>),
}

impl FieldValue {
    pub fn shape(&self) -> ValueShape {
        match self {
            FieldValue::Text(_) => ValueShape::Text,
            FieldValue::Bool(_) => ValueShape::Bool,
            FieldValue::File(_) => ValueShape::File,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// True for blank text, `false`, and a missing file.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Bool(b) => !b,
            FieldValue::File(f) => f.is_none(),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::File(None) => serializer.serialize_none(),
            FieldValue::File(Some(file)) => {
                let mut state = serializer.serialize_struct("UploadedFile", 3)?;
                state.serialize_field("fileName", &file.file_name)?;
                state.serialize_field("mimeType", &file.mime_type)?;
                state.serialize_field("size", &file.bytes.len())?;
                state.end()
            }
        }
    }
}

/// Every value of the registration form.
///
/// Deserialises from camelCase keys; missing keys take the form defaults. The document is never
/// read from text input and must be attached through
/// [`FormController::set_value`](super::FormController::set_value).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct PatientFormValues {
    pub name: String,
    pub email: String,
    pub phone: String,
    /// `YYYY-MM-DD`, as produced by the date picker.
    pub birth_date: String,
    pub gender: String,
    pub address: String,
    pub occupation: String,
    pub emergency_contact_name: String,
    pub emergency_contact_number: String,
    pub primary_physician: String,
    pub insurance_provider: String,
    pub insurance_policy_number: String,
    pub allergies: String,
    pub current_medication: String,
    pub family_medical_history: String,
    pub past_medical_history: String,
    pub identification_type: String,
    pub identification_number: String,
    #[serde(skip)]
    pub identification_document: Option<UploadedFile>,
    pub treatment_consent: bool,
    pub disclosure_consent: bool,
    pub privacy_consent: bool,
}

impl Default for PatientFormValues {
    /// Defaults for the built-in catalog.
    fn default() -> Self {
        Self::defaults_for(&RegistrationCatalog::default())
    }
}

impl PatientFormValues {
    /// Initial values of a fresh form offering `catalog`'s options.
    ///
    /// Gender starts at the first configured option. Identification type starts at
    /// "Birth Certificate" when offered, otherwise at the first configured type.
    pub fn defaults_for(catalog: &RegistrationCatalog) -> Self {
        let gender = catalog
            .gender_options
            .first()
            .map(|g| g.label().to_string())
            .unwrap_or_default();
        let identification_type = catalog
            .identification_types
            .iter()
            .find(|t| t.as_str() == DEFAULT_IDENTIFICATION_TYPE)
            .or_else(|| catalog.identification_types.first())
            .cloned()
            .unwrap_or_default();

        Self {
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            birth_date: Local::now().date_naive().format("%Y-%m-%d").to_string(),
            gender,
            address: String::new(),
            occupation: String::new(),
            emergency_contact_name: String::new(),
            emergency_contact_number: String::new(),
            primary_physician: String::new(),
            insurance_provider: String::new(),
            insurance_policy_number: String::new(),
            allergies: String::new(),
            current_medication: String::new(),
            family_medical_history: String::new(),
            past_medical_history: String::new(),
            identification_type,
            identification_number: String::new(),
            identification_document: None,
            treatment_consent: false,
            disclosure_consent: false,
            privacy_consent: false,
        }
    }

    /// Read the current value of `field`.
    pub fn get(&self, field: PatientField) -> FieldValue {
        use PatientField::*;

        match field {
            TreatmentConsent => FieldValue::Bool(self.treatment_consent),
            DisclosureConsent => FieldValue::Bool(self.disclosure_consent),
            PrivacyConsent => FieldValue::Bool(self.privacy_consent),
            IdentificationDocument => FieldValue::File(self.identification_document.clone()),
            _ => FieldValue::Text(self.text(field).map(str::to_string).unwrap_or_default()),
        }
    }

    /// Borrow a text field. `None` for boolean and file fields.
    pub fn text(&self, field: PatientField) -> Option<&str> {
        use PatientField::*;

        let value = match field {
            Name => &self.name,
            Email => &self.email,
            Phone => &self.phone,
            BirthDate => &self.birth_date,
            Gender => &self.gender,
            Address => &self.address,
            Occupation => &self.occupation,
            EmergencyContactName => &self.emergency_contact_name,
            EmergencyContactNumber => &self.emergency_contact_number,
            PrimaryPhysician => &self.primary_physician,
            InsuranceProvider => &self.insurance_provider,
            InsurancePolicyNumber => &self.insurance_policy_number,
            Allergies => &self.allergies,
            CurrentMedication => &self.current_medication,
            FamilyMedicalHistory => &self.family_medical_history,
            PastMedicalHistory => &self.past_medical_history,
            IdentificationType => &self.identification_type,
            IdentificationNumber => &self.identification_number,
            IdentificationDocument | TreatmentConsent | DisclosureConsent | PrivacyConsent => {
                return None
            }
        };
        Some(value.as_str())
    }

    /// Write `value` into `field`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::WrongValueShape`] if the value's shape does not match the field.
    pub fn set(&mut self, field: PatientField, value: FieldValue) -> Result<(), FormError> {
        use PatientField::*;

        let expected = field.value_shape();
        let found = value.shape();
        if expected != found {
            return Err(FormError::WrongValueShape {
                field,
                expected,
                found,
            });
        }

        match (field, value) {
            (TreatmentConsent, FieldValue::Bool(b)) => self.treatment_consent = b,
            (DisclosureConsent, FieldValue::Bool(b)) => self.disclosure_consent = b,
            (PrivacyConsent, FieldValue::Bool(b)) => self.privacy_consent = b,
            (IdentificationDocument, FieldValue::File(f)) => self.identification_document = f,
            (field, FieldValue::Text(s)) => {
                let slot = match field {
                    Name => &mut self.name,
                    Email => &mut self.email,
                    Phone => &mut self.phone,
                    BirthDate => &mut self.birth_date,
                    Gender => &mut self.gender,
                    Address => &mut self.address,
                    Occupation => &mut self.occupation,
                    EmergencyContactName => &mut self.emergency_contact_name,
                    EmergencyContactNumber => &mut self.emergency_contact_number,
                    PrimaryPhysician => &mut self.primary_physician,
                    InsuranceProvider => &mut self.insurance_provider,
                    InsurancePolicyNumber => &mut self.insurance_policy_number,
                    Allergies => &mut self.allergies,
                    CurrentMedication => &mut self.current_medication,
                    FamilyMedicalHistory => &mut self.family_medical_history,
                    PastMedicalHistory => &mut self.past_medical_history,
                    IdentificationType => &mut self.identification_type,
                    IdentificationNumber => &mut self.identification_number,
                    IdentificationDocument | TreatmentConsent | DisclosureConsent
                    | PrivacyConsent => {
                        return Err(FormError::WrongValueShape {
                            field,
                            expected,
                            found,
                        })
                    }
                };
                *slot = s;
            }
            (field, _) => {
                return Err(FormError::WrongValueShape {
                    field,
                    expected,
                    found,
                })
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fresh_form() {
        let values = PatientFormValues::default();
        assert_eq!(values.name, "");
        assert_eq!(values.gender, "Male");
        assert_eq!(values.identification_type, "Birth Certificate");
        assert_eq!(
            values.birth_date,
            Local::now().date_naive().format("%Y-%m-%d").to_string()
        );
        assert!(values.identification_document.is_none());
        assert!(!values.treatment_consent && !values.disclosure_consent && !values.privacy_consent);
    }

    #[test]
    fn set_and_get_each_shape() {
        let mut values = PatientFormValues::default();
        values
            .set(PatientField::Occupation, FieldValue::Text("Engineer".into()))
            .unwrap();
        values
            .set(PatientField::PrivacyConsent, FieldValue::Bool(true))
            .unwrap();
        let file = UploadedFile {
            bytes: vec![1, 2, 3],
            file_name: "id.png".into(),
            mime_type: "image/png".into(),
        };
        values
            .set(
                PatientField::IdentificationDocument,
                FieldValue::File(Some(file.clone())),
            )
            .unwrap();

        assert_eq!(
            values.get(PatientField::Occupation),
            FieldValue::Text("Engineer".into())
        );
        assert_eq!(values.get(PatientField::PrivacyConsent), FieldValue::Bool(true));
        assert_eq!(
            values.get(PatientField::IdentificationDocument),
            FieldValue::File(Some(file))
        );
    }

    #[test]
    fn set_rejects_wrong_shape() {
        let mut values = PatientFormValues::default();
        let err = values
            .set(PatientField::TreatmentConsent, FieldValue::Text("yes".into()))
            .expect_err("text into a checkbox should fail");
        assert_eq!(
            err,
            FormError::WrongValueShape {
                field: PatientField::TreatmentConsent,
                expected: ValueShape::Bool,
                found: ValueShape::Text,
            }
        );
        assert!(values
            .set(PatientField::Name, FieldValue::Bool(true))
            .is_err());
        assert!(values
            .set(PatientField::IdentificationDocument, FieldValue::Text(String::new()))
            .is_err());
    }

    #[test]
    fn deserialises_camel_case_with_defaults() {
        let values: PatientFormValues = serde_yaml::from_str(
            "name: Jane Doe\nemergencyContactName: John Doe\nprivacyConsent: true\n",
        )
        .expect("values should parse");
        assert_eq!(values.name, "Jane Doe");
        assert_eq!(values.emergency_contact_name, "John Doe");
        assert!(values.privacy_consent);
        assert_eq!(values.identification_type, "Birth Certificate");
    }

    #[test]
    fn deserialise_rejects_unknown_keys() {
        let result: Result<PatientFormValues, _> = serde_yaml::from_str("nickname: JD\n");
        assert!(result.is_err());
    }

    #[test]
    fn file_value_serialises_without_bytes() {
        let value = FieldValue::File(Some(UploadedFile {
            bytes: vec![0; 10],
            file_name: "scan.pdf".into(),
            mime_type: "application/pdf".into(),
        }));
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"fileName": "scan.pdf", "mimeType": "application/pdf", "size": 10})
        );
    }
}
