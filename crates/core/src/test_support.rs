//! Fixtures shared by unit tests.

use crate::author::Author;
use crate::catalog::RegistrationCatalog;
use crate::config::CoreConfig;
use crate::submission::{local_midnight, RegisterPatientPayload};
use crate::user::{NewUser, ValidatedNewUser};
use carepulse_uuid::ShardableUuid;
use chrono::NaiveDate;
use fhir::Gender;
use std::path::Path;
use std::sync::Arc;

pub(crate) fn test_cfg(patient_data_dir: &Path) -> Arc<CoreConfig> {
    Arc::new(
        CoreConfig::new(
            patient_data_dir.to_path_buf(),
            RegistrationCatalog::default(),
            Author::new("Test Registrar", "registrar@example.com").unwrap(),
        )
        .expect("CoreConfig::new should succeed"),
    )
}

pub(crate) fn validated_user(email: &str) -> ValidatedNewUser {
    NewUser {
        name: "Jane Doe".into(),
        email: email.into(),
        phone: "+15551234567".into(),
    }
    .validate()
    .expect("fixture user should validate")
}

pub(crate) fn sample_payload(user_id: &ShardableUuid) -> RegisterPatientPayload {
    let birth_date = NaiveDate::from_ymd_opt(1990, 1, 15).unwrap();
    RegisterPatientPayload {
        user_id: user_id.clone(),
        name: "Jane Doe".into(),
        email: "jane@example.com".into(),
        phone: "+15551234567".into(),
        birth_date: local_midnight(birth_date).unwrap(),
        gender: Gender::Female,
        address: "1 High Street, Leeds".into(),
        occupation: "Engineer".into(),
        emergency_contact_name: "John Doe".into(),
        emergency_contact_number: "+15557654321".into(),
        primary_physician: "John Green".into(),
        insurance_provider: "BlueCross".into(),
        insurance_policy_number: "ABC123".into(),
        allergies: Some("Penicillin".into()),
        current_medication: None,
        family_medical_history: None,
        past_medical_history: None,
        identification_type: Some("Passport".into()),
        identification_number: Some("P1234567".into()),
        identification_document: None,
        treatment_consent: true,
        disclosure_consent: true,
        privacy_consent: true,
    }
}
