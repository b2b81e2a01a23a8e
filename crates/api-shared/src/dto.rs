//! JSON shapes exchanged with API clients.
//!
//! Binary content (identification documents) travels base64-encoded.

use crate::DtoError;
use base64::engine::general_purpose;
use base64::Engine as _;
use carepulse_core::constants::{COPYRIGHT_NOTICE, REGISTER_IMAGE};
use carepulse_core::form::{
    RenderedSection, UploadedFile, FORM_HEADING, FORM_SUBHEADING, SUBMIT_LABEL,
};
use carepulse_core::{
    AppointmentFormType, DocumentReference, FieldErrors, NewAppointmentView, NewUser,
    PatientData, PatientFormValues, User,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// A user-visible failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub message: String,
}

/// Per-field validation messages, keyed by field name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldErrorsRes {
    #[schema(value_type = Object)]
    pub errors: FieldErrors,
}

// ============================================================================
// Users
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserReq {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl From<CreateUserReq> for NewUser {
    fn from(req: CreateUserReq) -> Self {
        NewUser {
            name: req.name,
            email: req.email,
            phone: req.phone,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRes {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: String,
}

impl From<User> for UserRes {
    fn from(user: User) -> Self {
        UserRes {
            id: user.id.to_string(),
            name: user.name.into_string(),
            email: user.email.as_str().to_string(),
            phone: user.phone.as_str().to_string(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Registration form
// ============================================================================

/// The registration page: heading, sections of rendered controls, submit label.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationFormRes {
    pub heading: String,
    pub subheading: String,
    pub submit_label: String,
    pub illustration: String,
    pub footer: String,
    #[schema(value_type = Vec<Object>)]
    pub sections: Vec<RenderedSection>,
}

impl RegistrationFormRes {
    pub fn new(sections: Vec<RenderedSection>) -> Self {
        Self {
            heading: FORM_HEADING.into(),
            subheading: FORM_SUBHEADING.into(),
            submit_label: SUBMIT_LABEL.into(),
            illustration: REGISTER_IMAGE.into(),
            footer: COPYRIGHT_NOTICE.into(),
            sections,
        }
    }
}

/// An uploaded document: bytes base64-encoded, with the uploader's filename and MIME type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpload {
    pub file_name: String,
    pub mime_type: String,
    pub blob_file: String,
}

impl DocumentUpload {
    pub fn from_bytes(bytes: &[u8], file_name: &str, mime_type: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            blob_file: general_purpose::STANDARD.encode(bytes),
        }
    }
}

impl TryFrom<DocumentUpload> for UploadedFile {
    type Error = DtoError;

    fn try_from(upload: DocumentUpload) -> Result<Self, Self::Error> {
        Ok(UploadedFile {
            bytes: general_purpose::STANDARD.decode(upload.blob_file.as_bytes())?,
            file_name: upload.file_name,
            mime_type: upload.mime_type,
        })
    }
}

/// A completed registration form as submitted by the client.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPatientReq {
    #[schema(value_type = Object)]
    pub values: PatientFormValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identification_document: Option<DocumentUpload>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPatientRes {
    /// Where the client should go next.
    pub redirect: String,
    pub patient: PatientRes,
}

// ============================================================================
// Patients
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRefRes {
    pub hash: String,
    pub file_name: String,
    pub media_type: Option<String>,
    pub size_bytes: u64,
}

impl From<DocumentReference> for DocumentRefRes {
    fn from(doc: DocumentReference) -> Self {
        DocumentRefRes {
            hash: doc.hash,
            file_name: doc.file_name,
            media_type: doc.media_type,
            size_bytes: doc.size_bytes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientRes {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub gender: String,
    pub birth_date: String,
    pub address: String,
    pub occupation: String,
    pub emergency_contact_name: String,
    pub emergency_contact_number: String,
    pub primary_physician: String,
    pub insurance_provider: String,
    pub insurance_policy_number: String,
    pub allergies: Option<String>,
    pub current_medication: Option<String>,
    pub family_medical_history: Option<String>,
    pub past_medical_history: Option<String>,
    pub identification_type: Option<String>,
    pub identification_number: Option<String>,
    pub identification_document: Option<DocumentRefRes>,
    pub treatment_consent: bool,
    pub disclosure_consent: bool,
    pub privacy_consent: bool,
    pub last_updated: Option<String>,
}

impl From<PatientData> for PatientRes {
    fn from(p: PatientData) -> Self {
        PatientRes {
            id: p.id.to_string(),
            user_id: p.user_id.to_string(),
            name: p.name,
            email: p.email,
            phone: p.phone,
            gender: p.gender.label().to_string(),
            birth_date: p.birth_date.format("%Y-%m-%d").to_string(),
            address: p.address,
            occupation: p.occupation,
            emergency_contact_name: p.emergency_contact_name,
            emergency_contact_number: p.emergency_contact_number,
            primary_physician: p.primary_physician,
            insurance_provider: p.insurance_provider,
            insurance_policy_number: p.insurance_policy_number,
            allergies: p.allergies,
            current_medication: p.current_medication,
            family_medical_history: p.family_medical_history,
            past_medical_history: p.past_medical_history,
            identification_type: p.identification_type,
            identification_number: p.identification_number,
            identification_document: p.identification_document.map(DocumentRefRes::from),
            treatment_consent: p.treatment_consent,
            disclosure_consent: p.disclosure_consent,
            privacy_consent: p.privacy_consent,
            last_updated: p.last_updated.map(|lu| lu.to_rfc3339()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointmentRes {
    pub user_id: String,
    pub patient_id: Option<String>,
    #[serde(rename = "type")]
    pub form_type: String,
    pub logo: String,
    pub illustration: String,
    pub footer: String,
}

impl From<NewAppointmentView> for NewAppointmentRes {
    fn from(view: NewAppointmentView) -> Self {
        NewAppointmentRes {
            user_id: view.user_id.to_string(),
            patient_id: view.patient_id.map(|id| id.to_string()),
            form_type: match view.form_type {
                AppointmentFormType::Create => "create".into(),
            },
            logo: view.logo.into(),
            illustration: view.illustration.into(),
            footer: view.footer.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_upload_decodes_to_uploaded_file() {
        let upload = DocumentUpload::from_bytes(b"scan", "id.png", "image/png");
        assert_eq!(upload.blob_file, "c2Nhbg==");

        let file = UploadedFile::try_from(upload).unwrap();
        assert_eq!(file.bytes, b"scan");
        assert_eq!(file.file_name, "id.png");
        assert_eq!(file.mime_type, "image/png");
    }

    #[test]
    fn document_upload_rejects_bad_base64() {
        let upload = DocumentUpload {
            file_name: "id.png".into(),
            mime_type: "image/png".into(),
            blob_file: "***".into(),
        };
        assert!(matches!(
            UploadedFile::try_from(upload),
            Err(DtoError::InvalidBase64(_))
        ));
    }

    #[test]
    fn register_request_accepts_camel_case_values() {
        let json = serde_json::json!({
            "values": {
                "name": "Jane Doe",
                "birthDate": "1990-05-14",
                "treatmentConsent": true
            },
            "identificationDocument": {
                "fileName": "id.png",
                "mimeType": "image/png",
                "blobFile": "c2Nhbg=="
            }
        });
        let req: RegisterPatientReq = serde_json::from_value(json).unwrap();
        assert_eq!(req.values.name, "Jane Doe");
        assert_eq!(req.values.birth_date, "1990-05-14");
        assert!(req.values.treatment_consent);
        assert!(req.identification_document.is_some());
    }

    #[test]
    fn create_user_request_maps_to_new_user() {
        let new_user: NewUser = CreateUserReq {
            name: "Jane".into(),
            email: "jane@example.com".into(),
            phone: "+15551234567".into(),
        }
        .into();
        assert_eq!(new_user.email, "jane@example.com");
    }
}
