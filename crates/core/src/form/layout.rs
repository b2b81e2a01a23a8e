//! Section layout of the registration form.

use super::controller::FormController;
use super::field::{FieldConfig, FieldIcon, FieldKind, FieldRenderer, PatientField, RenderedControl, SelectOption};
use crate::catalog::RegistrationCatalog;
use crate::constants::{EMAIL_ICON, USER_ICON};
use serde::Serialize;

pub const FORM_HEADING: &str = "Welcome";
pub const FORM_SUBHEADING: &str = "Let us know more about yourself.";
pub const SUBMIT_LABEL: &str = "Get Started";

/// A titled group of fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormSection {
    pub title: &'static str,
    pub fields: Vec<FieldConfig>,
}

impl FormSection {
    /// Render every field of the section.
    pub fn render(&self, form: &FormController, disabled: bool) -> RenderedSection {
        RenderedSection {
            title: self.title,
            controls: self
                .fields
                .iter()
                .map(|f| FieldRenderer::render(f, form, disabled))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderedSection {
    pub title: &'static str,
    pub controls: Vec<RenderedControl>,
}

fn field(
    field: PatientField,
    label: &'static str,
    placeholder: Option<&'static str>,
    kind: FieldKind,
) -> FieldConfig {
    FieldConfig {
        field,
        label,
        placeholder,
        kind,
    }
}

fn input(icon: Option<(&'static str, &'static str)>) -> FieldKind {
    FieldKind::Input {
        icon: icon.map(|(src, alt)| FieldIcon { src, alt }),
    }
}

/// The four sections of the registration form, options filled from `catalog`.
pub fn registration_layout(catalog: &RegistrationCatalog) -> Vec<FormSection> {
    use PatientField as F;

    let doctors = catalog
        .doctors
        .iter()
        .map(|d| SelectOption {
            value: d.name.clone(),
            label: d.name.clone(),
            image: Some(d.image.clone()),
        })
        .collect();
    let id_types = catalog
        .identification_types
        .iter()
        .map(|t| SelectOption::text(t))
        .collect();

    vec![
        FormSection {
            title: "Personal Information",
            fields: vec![
                field(F::Name, "Full Name", Some("John Doe"), input(Some((USER_ICON, "user")))),
                field(
                    F::Email,
                    "Email",
                    Some("johndoe@gmail.com"),
                    input(Some((EMAIL_ICON, "email"))),
                ),
                field(F::Phone, "Phone Number", Some("(555) 124342344"), FieldKind::PhoneInput),
                field(F::BirthDate, "Date Of Birth", None, FieldKind::DatePicker),
                field(
                    F::Gender,
                    "Gender",
                    None,
                    FieldKind::RadioGroup {
                        options: catalog.gender_labels(),
                    },
                ),
                field(F::Address, "Address", Some("14th Street, New York"), input(None)),
                field(
                    F::Occupation,
                    "Occupation",
                    Some("Software Engineer"),
                    input(Some((USER_ICON, "user"))),
                ),
                field(
                    F::EmergencyContactName,
                    "Emergency contact name",
                    Some("Guardian's name"),
                    input(None),
                ),
                field(
                    F::EmergencyContactNumber,
                    "Emergency contact number",
                    Some("(555) 124342344"),
                    FieldKind::PhoneInput,
                ),
            ],
        },
        FormSection {
            title: "Medical Information",
            fields: vec![
                field(
                    F::PrimaryPhysician,
                    "Primary care physician",
                    Some("Select a physician"),
                    FieldKind::Select { options: doctors },
                ),
                field(
                    F::InsuranceProvider,
                    "Insurance Provider",
                    Some("BlueCross BlueShield"),
                    input(None),
                ),
                field(
                    F::InsurancePolicyNumber,
                    "Insurance Policy Number",
                    Some("ABC123456789"),
                    input(None),
                ),
                field(F::Allergies, "Allergies (if any)", Some("Peanuts"), FieldKind::Textarea),
                field(
                    F::CurrentMedication,
                    "Current Medication (if any)",
                    Some("Paracetamol 500mg"),
                    FieldKind::Textarea,
                ),
                field(
                    F::FamilyMedicalHistory,
                    "Family medical history",
                    Some("Mother had brain cancer, Father had heart disease"),
                    FieldKind::Textarea,
                ),
                field(
                    F::PastMedicalHistory,
                    "Past Medical History",
                    Some("Appendectomy"),
                    FieldKind::Textarea,
                ),
            ],
        },
        FormSection {
            title: "Identification and Verification",
            fields: vec![
                field(
                    F::IdentificationType,
                    "Identification Type",
                    Some("Select Identification Type"),
                    FieldKind::Select { options: id_types },
                ),
                field(F::IdentificationNumber, "Identification Number", Some("123456789"), input(None)),
                field(
                    F::IdentificationDocument,
                    "Scanned copy of identification document",
                    None,
                    FieldKind::FileUpload,
                ),
            ],
        },
        FormSection {
            title: "Consent and Privacy",
            fields: vec![
                field(F::TreatmentConsent, "I consent to treatment", None, FieldKind::Checkbox),
                field(
                    F::DisclosureConsent,
                    "I consent to disclosure of information",
                    None,
                    FieldKind::Checkbox,
                ),
                field(F::PrivacyConsent, "I consent to privacy policy", None, FieldKind::Checkbox),
            ],
        },
    ]
}
