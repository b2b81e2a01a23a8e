//! Registration submission pipeline.
//!
//! Turns a validated form into a [`RegisterPatientPayload`], calls
//! [`PatientActions::register_patient`], and navigates to the appointment page on success.
//!
//! State machine:
//!
//! ```text
//! Idle ──submit──▶ Submitting ──record──▶ NavigatedAway
//!   ▲                  │
//!   └──── Failed ◀─────┘  (error or empty result; submit re-enabled)
//! ```
//!
//! The state lives in a [`SubmissionStatus`] handle shared with whoever renders the submit
//! control. A submit while `Submitting` is ignored without a remote call.

use crate::actions::PatientActions;
use crate::error::{PatientError, PatientResult};
use crate::form::{FieldErrors, FormController, UploadedFile, ValidatedPatientForm};
use crate::user::User;
use base64::{engine::general_purpose, Engine as _};
use carepulse_uuid::ShardableUuid;
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use fhir::Gender;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

pub const REGISTRATION_FAILED_MESSAGE: &str =
    "We couldn't complete your registration. Please try again.";
pub const EMPTY_RESULT_MESSAGE: &str =
    "Registration did not return a patient record. Please try again.";
pub const ALREADY_REGISTERED_MESSAGE: &str =
    "A patient record already exists for this account.";

// ============================================================================
// Payload
// ============================================================================

/// The identification document packaged for transport.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DocumentEnvelope {
    /// Document bytes, base64 on the wire.
    #[serde(with = "base64_bytes")]
    pub blob_file: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

impl fmt::Debug for DocumentEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentEnvelope")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.blob_file.len())
            .finish()
    }
}

impl From<UploadedFile> for DocumentEnvelope {
    fn from(file: UploadedFile) -> Self {
        Self {
            blob_file: file.bytes,
            file_name: file.file_name,
            mime_type: file.mime_type,
        }
    }
}

mod base64_bytes {
    use super::general_purpose;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        general_purpose::STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Everything `register_patient` needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterPatientPayload {
    pub user_id: ShardableUuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Local midnight of the entered date.
    pub birth_date: DateTime<Local>,
    pub gender: Gender,
    pub address: String,
    pub occupation: String,
    pub emergency_contact_name: String,
    pub emergency_contact_number: String,
    pub primary_physician: String,
    pub insurance_provider: String,
    pub insurance_policy_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_medication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_medical_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub past_medical_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identification_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identification_number: Option<String>,
    /// Absent entirely when no document was uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identification_document: Option<DocumentEnvelope>,
    pub treatment_consent: bool,
    pub disclosure_consent: bool,
    pub privacy_consent: bool,
}

/// Midnight of `date` in the local time zone.
///
/// If midnight does not exist locally (a DST gap), the first valid instant of the day is used.
pub fn local_midnight(date: NaiveDate) -> PatientResult<DateTime<Local>> {
    let midnight = date.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            (1..=2)
                .map(|h| midnight + chrono::Duration::hours(h))
                .find_map(|t| Local.from_local_datetime(&t).earliest())
        })
        .ok_or_else(|| PatientError::InvalidInput(format!("no local midnight for {date}")))
}

fn optional(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl RegisterPatientPayload {
    /// Assemble the payload from validated values and the acting user's id.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::InvalidInput`] if the birth date or gender cannot be converted.
    pub fn from_form(user_id: &ShardableUuid, form: ValidatedPatientForm) -> PatientResult<Self> {
        let v = form.into_values();

        let birth_date = NaiveDate::parse_from_str(v.birth_date.trim(), "%Y-%m-%d")
            .map_err(|e| PatientError::InvalidInput(format!("birth date: {e}")))?;
        let gender: Gender = v
            .gender
            .parse()
            .map_err(|e: fhir::FhirError| PatientError::InvalidInput(e.to_string()))?;

        Ok(Self {
            user_id: user_id.clone(),
            name: v.name.trim().to_string(),
            email: v.email.trim().to_ascii_lowercase(),
            phone: v.phone.trim().to_string(),
            birth_date: local_midnight(birth_date)?,
            gender,
            address: v.address.trim().to_string(),
            occupation: v.occupation.trim().to_string(),
            emergency_contact_name: v.emergency_contact_name.trim().to_string(),
            emergency_contact_number: v.emergency_contact_number.trim().to_string(),
            primary_physician: v.primary_physician.trim().to_string(),
            insurance_provider: v.insurance_provider.trim().to_string(),
            insurance_policy_number: v.insurance_policy_number.trim().to_string(),
            allergies: optional(v.allergies),
            current_medication: optional(v.current_medication),
            family_medical_history: optional(v.family_medical_history),
            past_medical_history: optional(v.past_medical_history),
            identification_type: optional(v.identification_type),
            identification_number: optional(v.identification_number),
            identification_document: v.identification_document.map(DocumentEnvelope::from),
            treatment_consent: v.treatment_consent,
            disclosure_consent: v.disclosure_consent,
            privacy_consent: v.privacy_consent,
        })
    }
}

// ============================================================================
// Navigation
// ============================================================================

/// Pages the pipeline can navigate to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    NewAppointment { user_id: ShardableUuid },
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::NewAppointment { user_id } => {
                write!(f, "/patients/{user_id}/new-appointment")
            }
        }
    }
}

/// Receives navigation requests.
pub trait Navigator: Send + Sync {
    fn push(&self, route: &Route);
}

// ============================================================================
// Submission state
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    NavigatedAway(Route),
    /// Idle again, with a message for the user.
    Failed { message: String },
}

impl SubmissionState {
    /// Whether the submit control accepts a click.
    pub fn submit_enabled(&self) -> bool {
        matches!(self, SubmissionState::Idle | SubmissionState::Failed { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            SubmissionState::Failed { message } => Some(message),
            _ => None,
        }
    }
}

/// Shared handle on the submission state.
#[derive(Clone, Debug, Default)]
pub struct SubmissionStatus(Arc<Mutex<SubmissionState>>);

impl SubmissionStatus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SubmissionState> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self) -> SubmissionState {
        self.lock().clone()
    }

    pub fn is_submitting(&self) -> bool {
        *self.lock() == SubmissionState::Submitting
    }

    /// Move to `Submitting` if the submit control is enabled. Returns false otherwise.
    fn try_begin(&self) -> bool {
        let mut state = self.lock();
        if state.submit_enabled() {
            *state = SubmissionState::Submitting;
            true
        } else {
            false
        }
    }

    fn set(&self, next: SubmissionState) {
        *self.lock() = next;
    }
}

/// Result of one submit attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Validation failed; nothing was sent.
    Invalid(FieldErrors),
    /// The submit control was disabled; nothing was sent.
    Ignored,
    Navigated(Route),
    /// The user already has a patient record; nothing new was stored.
    AlreadyRegistered { message: String },
    Failed { message: String },
}

// ============================================================================
// Pipeline
// ============================================================================

/// Drives one registration form's submissions.
pub struct RegistrationSubmitter<A, N> {
    actions: Arc<A>,
    navigator: N,
    status: SubmissionStatus,
}

impl<A: PatientActions, N: Navigator> RegistrationSubmitter<A, N> {
    pub fn new(actions: Arc<A>, navigator: N) -> Self {
        Self {
            actions,
            navigator,
            status: SubmissionStatus::new(),
        }
    }

    /// A handle observers can poll for the current state.
    pub fn status(&self) -> SubmissionStatus {
        self.status.clone()
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Submit `form` on behalf of `user`.
    pub async fn submit(&self, form: &mut FormController, user: &User) -> SubmitOutcome {
        if !self.status.get().submit_enabled() {
            return SubmitOutcome::Ignored;
        }

        let Some(validated) = form.handle_submit() else {
            return SubmitOutcome::Invalid(form.errors().clone());
        };

        if !self.status.try_begin() {
            return SubmitOutcome::Ignored;
        }

        let payload = match RegisterPatientPayload::from_form(&user.id, validated) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "failed to build registration payload");
                return self.fail(REGISTRATION_FAILED_MESSAGE);
            }
        };

        match self.actions.register_patient(payload).await {
            Ok(Some(patient)) => {
                tracing::info!(user_id = %user.id, patient_id = %patient.id, "patient registered");
                let route = Route::NewAppointment {
                    user_id: user.id.clone(),
                };
                self.status.set(SubmissionState::NavigatedAway(route.clone()));
                self.navigator.push(&route);
                SubmitOutcome::Navigated(route)
            }
            Ok(None) => {
                tracing::error!(user_id = %user.id, "register_patient returned no record");
                self.fail(EMPTY_RESULT_MESSAGE)
            }
            Err(PatientError::AlreadyRegistered(patient_id)) => {
                tracing::error!(user_id = %user.id, %patient_id, "user is already registered");
                self.fail(ALREADY_REGISTERED_MESSAGE);
                SubmitOutcome::AlreadyRegistered {
                    message: ALREADY_REGISTERED_MESSAGE.to_string(),
                }
            }
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "register_patient failed");
                self.fail(REGISTRATION_FAILED_MESSAGE)
            }
        }
    }

    fn fail(&self, message: &str) -> SubmitOutcome {
        self.status.set(SubmissionState::Failed {
            message: message.to_string(),
        });
        SubmitOutcome::Failed {
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RegistrationCatalog;
    use crate::form::PatientField;
    use crate::user::ValidatedNewUser;
    use chrono::{Timelike, Utc};
    use fhir::PatientData;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Clone, Copy)]
    enum Reply {
        Record,
        Empty,
        Error,
        Duplicate,
    }

    struct MockActions {
        reply: Reply,
        calls: AtomicUsize,
        payloads: Mutex<Vec<RegisterPatientPayload>>,
        gate: Option<Arc<Notify>>,
    }

    impl MockActions {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                payloads: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_payload(&self) -> RegisterPatientPayload {
            self.payloads.lock().unwrap().last().cloned().expect("a payload was sent")
        }
    }

    fn record_for(payload: &RegisterPatientPayload) -> PatientData {
        PatientData {
            id: ShardableUuid::new(),
            user_id: payload.user_id.clone(),
            name: payload.name.clone(),
            email: payload.email.clone(),
            phone: payload.phone.clone(),
            gender: payload.gender,
            birth_date: payload.birth_date.date_naive(),
            address: payload.address.clone(),
            occupation: payload.occupation.clone(),
            emergency_contact_name: payload.emergency_contact_name.clone(),
            emergency_contact_number: payload.emergency_contact_number.clone(),
            primary_physician: payload.primary_physician.clone(),
            insurance_provider: payload.insurance_provider.clone(),
            insurance_policy_number: payload.insurance_policy_number.clone(),
            allergies: None,
            current_medication: None,
            family_medical_history: None,
            past_medical_history: None,
            identification_type: None,
            identification_number: None,
            identification_document: None,
            treatment_consent: true,
            disclosure_consent: true,
            privacy_consent: true,
            last_updated: Some(Utc::now()),
        }
    }

    impl PatientActions for MockActions {
        async fn create_user(&self, _new_user: ValidatedNewUser) -> PatientResult<User> {
            unimplemented!("not used by the pipeline")
        }

        async fn get_user(&self, _user_id: &ShardableUuid) -> PatientResult<Option<User>> {
            Ok(None)
        }

        async fn get_patient(&self, _user_id: &ShardableUuid) -> PatientResult<Option<PatientData>> {
            Ok(None)
        }

        async fn register_patient(
            &self,
            payload: RegisterPatientPayload,
        ) -> PatientResult<Option<PatientData>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let record = record_for(&payload);
            self.payloads.lock().unwrap().push(payload);
            match self.reply {
                Reply::Record => Ok(Some(record)),
                Reply::Empty => Ok(None),
                Reply::Error => Err(PatientError::InvalidInput("store unavailable".into())),
                Reply::Duplicate => Err(PatientError::AlreadyRegistered(record.id.to_string())),
            }
        }
    }

    #[derive(Default)]
    struct RecordingNavigator {
        routes: Mutex<Vec<String>>,
    }

    impl Navigator for RecordingNavigator {
        fn push(&self, route: &Route) {
            self.routes.lock().unwrap().push(route.to_string());
        }
    }

    fn user() -> User {
        User {
            id: ShardableUuid::parse("1b2c3d4e5f60718293a4b5c6d7e8f901").unwrap(),
            name: carepulse_types::NonEmptyText::new("Jane Doe").unwrap(),
            email: carepulse_types::EmailAddress::parse("jane@example.com").unwrap(),
            phone: carepulse_types::PhoneNumber::parse("+15551234567").unwrap(),
            created_at: Utc::now(),
        }
    }

    fn valid_form() -> FormController {
        let mut form = FormController::new(&RegistrationCatalog::default());
        for (field, value) in [
            (PatientField::Name, "Jane Doe"),
            (PatientField::Email, "jane@example.com"),
            (PatientField::Phone, "+15551234567"),
            (PatientField::BirthDate, "1990-05-14"),
            (PatientField::Gender, "Female"),
            (PatientField::Address, "14th Street, New York"),
            (PatientField::Occupation, "Engineer"),
            (PatientField::EmergencyContactName, "John Doe"),
            (PatientField::EmergencyContactNumber, "+15557654321"),
            (PatientField::PrimaryPhysician, "Jane Powell"),
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
        form
    }

    fn submitter(actions: MockActions) -> RegistrationSubmitter<MockActions, RecordingNavigator> {
        RegistrationSubmitter::new(Arc::new(actions), RecordingNavigator::default())
    }

    #[tokio::test]
    async fn invalid_form_makes_no_remote_call() {
        let s = submitter(MockActions::new(Reply::Record));
        let mut form = FormController::new(&RegistrationCatalog::default());

        let outcome = s.submit(&mut form, &user()).await;

        let SubmitOutcome::Invalid(errors) = outcome else {
            panic!("expected Invalid, got {outcome:?}");
        };
        assert!(errors.get("name").is_some());
        assert_eq!(s.actions.calls(), 0);
        assert_eq!(s.status().get(), SubmissionState::Idle);
        assert!(s.navigator().routes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn payload_without_document_omits_envelope() {
        let s = submitter(MockActions::new(Reply::Record));
        let mut form = valid_form();

        s.submit(&mut form, &user()).await;

        let payload = s.actions.last_payload();
        assert!(payload.identification_document.is_none());
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("identificationDocument").is_none());
        assert_eq!(json["userId"], "1b2c3d4e5f60718293a4b5c6d7e8f901");
    }

    #[tokio::test]
    async fn payload_with_document_keeps_name_and_type() {
        let s = submitter(MockActions::new(Reply::Record));
        let mut form = valid_form();
        form.set_document(Some(UploadedFile {
            bytes: b"%PDF-1.7".to_vec(),
            file_name: "passport scan.pdf".into(),
            mime_type: "application/pdf".into(),
        }))
        .unwrap();

        s.submit(&mut form, &user()).await;

        let envelope = s
            .actions
            .last_payload()
            .identification_document
            .expect("envelope present");
        assert_eq!(envelope.file_name, "passport scan.pdf");
        assert_eq!(envelope.mime_type, "application/pdf");
        assert_eq!(envelope.blob_file, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn birth_date_becomes_local_midnight() {
        let s = submitter(MockActions::new(Reply::Record));
        let mut form = valid_form();

        s.submit(&mut form, &user()).await;

        let birth_date = s.actions.last_payload().birth_date;
        assert_eq!(
            birth_date.date_naive(),
            NaiveDate::from_ymd_opt(1990, 5, 14).unwrap()
        );
        assert_eq!((birth_date.hour(), birth_date.minute()), (0, 0));
    }

    #[tokio::test]
    async fn success_navigates_exactly_once() {
        let s = submitter(MockActions::new(Reply::Record));
        let mut form = valid_form();

        let outcome = s.submit(&mut form, &user()).await;
        let again = s.submit(&mut form, &user()).await;

        let expected = "/patients/1b2c3d4e5f60718293a4b5c6d7e8f901/new-appointment";
        assert!(matches!(outcome, SubmitOutcome::Navigated(ref r) if r.to_string() == expected));
        assert_eq!(again, SubmitOutcome::Ignored);
        assert_eq!(*s.navigator().routes.lock().unwrap(), vec![expected.to_string()]);
        assert_eq!(s.actions.calls(), 1);
        assert!(!s.status().get().submit_enabled());
    }

    #[tokio::test]
    async fn rejected_registration_re_enables_submit_without_navigation() {
        let s = submitter(MockActions::new(Reply::Error));
        let mut form = valid_form();

        let outcome = s.submit(&mut form, &user()).await;

        assert_eq!(
            outcome,
            SubmitOutcome::Failed {
                message: REGISTRATION_FAILED_MESSAGE.into()
            }
        );
        let state = s.status().get();
        assert!(state.submit_enabled());
        assert_eq!(state.error_message(), Some(REGISTRATION_FAILED_MESSAGE));
        assert!(s.navigator().routes.lock().unwrap().is_empty());

        // The user can try again.
        s.submit(&mut form, &user()).await;
        assert_eq!(s.actions.calls(), 2);
    }

    #[tokio::test]
    async fn empty_result_is_a_failure() {
        let s = submitter(MockActions::new(Reply::Empty));
        let mut form = valid_form();

        let outcome = s.submit(&mut form, &user()).await;

        assert_eq!(
            outcome,
            SubmitOutcome::Failed {
                message: EMPTY_RESULT_MESSAGE.into()
            }
        );
        assert!(s.navigator().routes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_registration_has_its_own_outcome() {
        let s = submitter(MockActions::new(Reply::Duplicate));
        let mut form = valid_form();

        let outcome = s.submit(&mut form, &user()).await;

        assert_eq!(
            outcome,
            SubmitOutcome::AlreadyRegistered {
                message: ALREADY_REGISTERED_MESSAGE.into()
            }
        );
        let state = s.status().get();
        assert!(state.submit_enabled());
        assert_eq!(state.error_message(), Some(ALREADY_REGISTERED_MESSAGE));
        assert!(s.navigator().routes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_while_submitting_is_ignored() {
        let gate = Arc::new(Notify::new());
        let mut actions = MockActions::new(Reply::Record);
        actions.gate = Some(gate.clone());
        let s = Arc::new(submitter(actions));

        let first = {
            let s = s.clone();
            tokio::spawn(async move {
                let mut form = valid_form();
                s.submit(&mut form, &user()).await
            })
        };

        while !s.status().is_submitting() {
            tokio::task::yield_now().await;
        }
        assert!(!s.status().get().submit_enabled());

        let mut second_form = valid_form();
        assert_eq!(s.submit(&mut second_form, &user()).await, SubmitOutcome::Ignored);

        gate.notify_one();
        let outcome = first.await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Navigated(_)));
        assert_eq!(s.actions.calls(), 1);
    }

    #[test]
    fn envelope_serialises_bytes_as_base64() {
        let envelope = DocumentEnvelope {
            blob_file: b"hello".to_vec(),
            file_name: "a.txt".into(),
            mime_type: "text/plain".into(),
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["blobFile"], "aGVsbG8=");
        let back: DocumentEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn optional_fields_are_trimmed_to_none() {
        assert_eq!(optional("  ".into()), None);
        assert_eq!(optional(" Peanuts ".into()), Some("Peanuts".into()));
    }
}
