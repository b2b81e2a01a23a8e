//! Field identities, field kinds and control rendering.

use super::controller::FormController;
use super::values::FieldValue;
use serde::Serialize;
use std::fmt;

/// Every field on the registration form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PatientField {
    Name,
    Email,
    Phone,
    BirthDate,
    Gender,
    Address,
    Occupation,
    EmergencyContactName,
    EmergencyContactNumber,
    PrimaryPhysician,
    InsuranceProvider,
    InsurancePolicyNumber,
    Allergies,
    CurrentMedication,
    FamilyMedicalHistory,
    PastMedicalHistory,
    IdentificationType,
    IdentificationNumber,
    IdentificationDocument,
    TreatmentConsent,
    DisclosureConsent,
    PrivacyConsent,
}

impl PatientField {
    pub const ALL: [PatientField; 22] = [
        PatientField::Name,
        PatientField::Email,
        PatientField::Phone,
        PatientField::BirthDate,
        PatientField::Gender,
        PatientField::Address,
        PatientField::Occupation,
        PatientField::EmergencyContactName,
        PatientField::EmergencyContactNumber,
        PatientField::PrimaryPhysician,
        PatientField::InsuranceProvider,
        PatientField::InsurancePolicyNumber,
        PatientField::Allergies,
        PatientField::CurrentMedication,
        PatientField::FamilyMedicalHistory,
        PatientField::PastMedicalHistory,
        PatientField::IdentificationType,
        PatientField::IdentificationNumber,
        PatientField::IdentificationDocument,
        PatientField::TreatmentConsent,
        PatientField::DisclosureConsent,
        PatientField::PrivacyConsent,
    ];

    /// The camelCase name used on the wire and as the error-map key.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::BirthDate => "birthDate",
            Self::Gender => "gender",
            Self::Address => "address",
            Self::Occupation => "occupation",
            Self::EmergencyContactName => "emergencyContactName",
            Self::EmergencyContactNumber => "emergencyContactNumber",
            Self::PrimaryPhysician => "primaryPhysician",
            Self::InsuranceProvider => "insuranceProvider",
            Self::InsurancePolicyNumber => "insurancePolicyNumber",
            Self::Allergies => "allergies",
            Self::CurrentMedication => "currentMedication",
            Self::FamilyMedicalHistory => "familyMedicalHistory",
            Self::PastMedicalHistory => "pastMedicalHistory",
            Self::IdentificationType => "identificationType",
            Self::IdentificationNumber => "identificationNumber",
            Self::IdentificationDocument => "identificationDocument",
            Self::TreatmentConsent => "treatmentConsent",
            Self::DisclosureConsent => "disclosureConsent",
            Self::PrivacyConsent => "privacyConsent",
        }
    }

    /// The only value shape this field accepts.
    pub const fn value_shape(self) -> ValueShape {
        match self {
            Self::TreatmentConsent | Self::DisclosureConsent | Self::PrivacyConsent => {
                ValueShape::Bool
            }
            Self::IdentificationDocument => ValueShape::File,
            _ => ValueShape::Text,
        }
    }
}

impl fmt::Display for PatientField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The kind of value a field holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueShape {
    Text,
    Bool,
    File,
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueShape::Text => "text",
            ValueShape::Bool => "boolean",
            ValueShape::File => "file",
        })
    }
}

/// Leading icon of a text input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldIcon {
    pub src: &'static str,
    pub alt: &'static str,
}

/// One entry of a select control.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl SelectOption {
    pub fn text(value: &str) -> Self {
        Self {
            value: value.to_string(),
            label: value.to_string(),
            image: None,
        }
    }
}

/// The control a field renders as.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldKind {
    Input {
        #[serde(skip_serializing_if = "Option::is_none")]
        icon: Option<FieldIcon>,
    },
    PhoneInput,
    DatePicker,
    Select {
        options: Vec<SelectOption>,
    },
    Textarea,
    Checkbox,
    RadioGroup {
        options: Vec<String>,
    },
    FileUpload,
}

impl FieldKind {
    pub const fn value_shape(&self) -> ValueShape {
        match self {
            FieldKind::Checkbox => ValueShape::Bool,
            FieldKind::FileUpload => ValueShape::File,
            _ => ValueShape::Text,
        }
    }
}

/// Static configuration of one form field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldConfig {
    pub field: PatientField,
    pub label: &'static str,
    pub placeholder: Option<&'static str>,
    pub kind: FieldKind,
}

/// A control description bound to the controller's current value and error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedControl {
    pub name: PatientField,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
    pub control: FieldKind,
    pub value: FieldValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub disabled: bool,
}

/// Maps a field configuration to its control description.
pub struct FieldRenderer;

impl FieldRenderer {
    /// Render `config` against the controller's state.
    ///
    /// `disabled` is set while a submission is in flight.
    pub fn render(config: &FieldConfig, form: &FormController, disabled: bool) -> RenderedControl {
        RenderedControl {
            name: config.field,
            label: config.label,
            placeholder: config.placeholder,
            control: config.kind.clone(),
            value: form.value(config.field),
            error: form.error(config.field).map(str::to_string),
            disabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_name_matches_name() {
        for field in PatientField::ALL {
            let json = serde_json::to_value(field).unwrap();
            assert_eq!(json, serde_json::Value::String(field.name().to_string()));
        }
    }

    #[test]
    fn kind_serialises_with_type_tag() {
        let kind = FieldKind::RadioGroup {
            options: vec!["Male".into(), "Female".into()],
        };
        assert_eq!(
            serde_json::to_value(kind).unwrap(),
            serde_json::json!({"type": "radioGroup", "options": ["Male", "Female"]})
        );
        assert_eq!(
            serde_json::to_value(FieldKind::PhoneInput).unwrap(),
            serde_json::json!({"type": "phoneInput"})
        );
    }
}
