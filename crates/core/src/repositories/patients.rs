//! Patient registration storage.
//!
//! A registration becomes a FHIR-aligned `patient.yaml` in a fresh versioned directory under
//! `patients/`. An uploaded identification document is stored content-addressed beside it
//! under `files/`, which the record's `.gitignore` keeps out of history; `patient.yaml`
//! carries the document's hash.
//!
//! Registration is all-or-nothing: if any step fails the patient directory is removed.

use crate::config::CoreConfig;
use crate::constants::{DEFAULT_GITIGNORE, GITIGNORE_FILENAME, PATIENT_YAML_FILENAME};
use crate::error::{PatientError, PatientResult};
use crate::repo::create_unique_shared_dir;
use crate::repositories::sharded_files;
use crate::repositories::users::UserRepository;
use crate::submission::{DocumentEnvelope, RegisterPatientPayload};
use crate::versioned_files::{
    cleanup_after_failure, CommitAction, CommitDomain, CommitMessage, FileToWrite,
    VersionedFileService,
};
use carepulse_files::{FileMetadata, FilesService};
use carepulse_uuid::ShardableUuid;
use chrono::Utc;
use fhir::{DocumentReference, Patient, PatientData};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct PatientRepository {
    cfg: Arc<CoreConfig>,
}

impl PatientRepository {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Persist a registration and return the stored record.
    ///
    /// # Errors
    ///
    /// - [`PatientError::InvalidInput`] if any consent is missing,
    /// - [`PatientError::UserNotFound`] if the payload's user does not exist,
    /// - [`PatientError::AlreadyRegistered`] if the user already has a patient record,
    /// - a storage, serialisation, file or Git error otherwise.
    pub fn register(&self, payload: RegisterPatientPayload) -> PatientResult<PatientData> {
        if !(payload.treatment_consent && payload.disclosure_consent && payload.privacy_consent) {
            return Err(PatientError::InvalidInput(
                "all three consents are required to register".into(),
            ));
        }

        let users = UserRepository::new(self.cfg.clone());
        if users.get(&payload.user_id)?.is_none() {
            return Err(PatientError::UserNotFound(payload.user_id.to_string()));
        }
        if let Some(existing) = self.find_by_user(&payload.user_id)? {
            return Err(PatientError::AlreadyRegistered(existing.id.to_string()));
        }

        let message = CommitMessage::new(
            CommitDomain::Registration,
            CommitAction::Create,
            "Patient registered",
        )?;

        let patients_dir = self.cfg.patients_dir();
        fs::create_dir_all(&patients_dir).map_err(PatientError::StorageDirCreation)?;
        let (patient_id, patient_dir) = create_unique_shared_dir(&patients_dir, ShardableUuid::new)?;

        let prepared = self.prepare_record(&patients_dir, &patient_id, payload);
        let (data, yaml) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => return Err(cleanup_after_failure(&patient_dir, e)),
        };

        VersionedFileService::init_and_commit(
            &patient_dir,
            self.cfg.commit_author(),
            &message,
            &[
                FileToWrite {
                    relative_path: Path::new(GITIGNORE_FILENAME),
                    content: DEFAULT_GITIGNORE,
                },
                FileToWrite {
                    relative_path: Path::new(PATIENT_YAML_FILENAME),
                    content: &yaml,
                },
            ],
        )?;

        tracing::info!(patient_id = %data.id, user_id = %data.user_id, "patient registered");
        Ok(data)
    }

    /// Store the document (if any) and render the record.
    fn prepare_record(
        &self,
        patients_dir: &Path,
        patient_id: &ShardableUuid,
        payload: RegisterPatientPayload,
    ) -> PatientResult<(PatientData, String)> {
        let identification_document = match payload.identification_document {
            Some(envelope) => Some(store_document(patients_dir, patient_id, &envelope)?),
            None => None,
        };

        let data = PatientData {
            id: patient_id.clone(),
            user_id: payload.user_id,
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            gender: payload.gender,
            birth_date: payload.birth_date.date_naive(),
            address: payload.address,
            occupation: payload.occupation,
            emergency_contact_name: payload.emergency_contact_name,
            emergency_contact_number: payload.emergency_contact_number,
            primary_physician: payload.primary_physician,
            insurance_provider: payload.insurance_provider,
            insurance_policy_number: payload.insurance_policy_number,
            allergies: payload.allergies,
            current_medication: payload.current_medication,
            family_medical_history: payload.family_medical_history,
            past_medical_history: payload.past_medical_history,
            identification_type: payload.identification_type,
            identification_number: payload.identification_number,
            identification_document,
            treatment_consent: payload.treatment_consent,
            disclosure_consent: payload.disclosure_consent,
            privacy_consent: payload.privacy_consent,
            last_updated: Some(Utc::now()),
        };

        let yaml = Patient::render(&data)?;
        Ok((data, yaml))
    }

    /// Load a patient record by its own id.
    pub fn get(&self, patient_id: &ShardableUuid) -> PatientResult<Option<PatientData>> {
        let path = self.patient_file(patient_id);
        if !path.is_file() {
            return Ok(None);
        }
        read_patient(&path).map(Some)
    }

    /// The patient registered by `user_id`, if any.
    pub fn find_by_user(&self, user_id: &ShardableUuid) -> PatientResult<Option<PatientData>> {
        Ok(self.list().into_iter().find(|p| &p.user_id == user_id))
    }

    /// All stored patients, most recently updated first. Unreadable entries are logged and
    /// skipped.
    pub fn list(&self) -> Vec<PatientData> {
        let mut patients: Vec<PatientData> =
            sharded_files(&self.cfg.patients_dir(), PATIENT_YAML_FILENAME)
                .into_iter()
                .filter_map(|path| match read_patient(&path) {
                    Ok(patient) => Some(patient),
                    Err(e) => {
                        tracing::warn!(
                            "failed to parse patient.yaml: {} - {}",
                            path.display(),
                            e
                        );
                        None
                    }
                })
                .collect();
        patients.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        patients
    }

    /// Read the bytes of a patient's stored identification document.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::PatientNotFound`] for an unknown patient, or a
    /// [`carepulse_files::FilesError`] if the hash is malformed or not stored.
    pub fn read_document(&self, patient_id: &ShardableUuid, hash: &str) -> PatientResult<Vec<u8>> {
        if self.get(patient_id)?.is_none() {
            return Err(PatientError::PatientNotFound(patient_id.to_string()));
        }
        let files = FilesService::new(&self.cfg.patients_dir(), patient_id.clone())?;
        Ok(files.read(hash)?)
    }

    fn patient_file(&self, patient_id: &ShardableUuid) -> PathBuf {
        patient_id
            .sharded_dir(&self.cfg.patients_dir())
            .join(PATIENT_YAML_FILENAME)
    }
}

fn store_document(
    patients_dir: &Path,
    patient_id: &ShardableUuid,
    envelope: &DocumentEnvelope,
) -> PatientResult<DocumentReference> {
    let files = FilesService::new(patients_dir, patient_id.clone())?;
    let declared = Some(envelope.mime_type.as_str()).filter(|m| !m.trim().is_empty());
    let metadata = files.add_bytes(&envelope.blob_file, &envelope.file_name, declared)?;
    Ok(document_reference(metadata))
}

fn document_reference(metadata: FileMetadata) -> DocumentReference {
    DocumentReference {
        hash: metadata.hash.to_string(),
        file_name: metadata.original_filename.into_string(),
        media_type: metadata.media_type.map(|m| m.into_string()),
        size_bytes: metadata.size_bytes,
        relative_path: metadata.relative_path.into_string(),
    }
}

fn read_patient(path: &Path) -> PatientResult<PatientData> {
    let contents = fs::read_to_string(path).map_err(PatientError::FileRead)?;
    Ok(Patient::parse(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_payload, test_cfg, validated_user};
    use fhir::Gender;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<CoreConfig>, ShardableUuid) {
        let temp = TempDir::new().unwrap();
        let cfg = test_cfg(temp.path());
        let user = UserRepository::new(cfg.clone())
            .create(validated_user("jane@example.com"))
            .unwrap();
        (temp, cfg, user.id)
    }

    fn count_record_dirs(root: &Path) -> usize {
        let mut count = 0;
        if let Ok(s1_iter) = fs::read_dir(root) {
            for s1 in s1_iter.flatten() {
                if let Ok(s2_iter) = fs::read_dir(s1.path()) {
                    for s2 in s2_iter.flatten() {
                        if let Ok(id_iter) = fs::read_dir(s2.path()) {
                            count += id_iter.flatten().count();
                        }
                    }
                }
            }
        }
        count
    }

    #[test]
    fn register_writes_versioned_patient_yaml() {
        let (_temp, cfg, user_id) = setup();
        let repo = PatientRepository::new(cfg.clone());

        let patient = repo.register(sample_payload(&user_id)).unwrap();

        assert_eq!(patient.user_id, user_id);
        assert_eq!(patient.gender, Gender::Female);
        assert!(patient.last_updated.is_some());

        let dir = patient.id.sharded_dir(&cfg.patients_dir());
        let git = git2::Repository::open(&dir).unwrap();
        let commit = git.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(
            commit.summary(),
            Some("registration:create: Patient registered")
        );
        assert_eq!(
            fs::read_to_string(dir.join(GITIGNORE_FILENAME)).unwrap(),
            DEFAULT_GITIGNORE
        );

        assert_eq!(repo.get(&patient.id).unwrap(), Some(patient.clone()));
        assert_eq!(repo.find_by_user(&user_id).unwrap(), Some(patient));
    }

    #[test]
    fn register_stores_document_outside_history() {
        let (_temp, cfg, user_id) = setup();
        let repo = PatientRepository::new(cfg.clone());
        let mut payload = sample_payload(&user_id);
        payload.identification_document = Some(DocumentEnvelope {
            blob_file: b"%PDF-1.4 scan".to_vec(),
            file_name: "passport.pdf".into(),
            mime_type: "application/pdf".into(),
        });

        let patient = repo.register(payload).unwrap();
        let doc = patient
            .identification_document
            .clone()
            .expect("document reference should be recorded");
        assert_eq!(doc.file_name, "passport.pdf");
        assert_eq!(doc.media_type.as_deref(), Some("application/pdf"));
        assert_eq!(doc.size_bytes, 13);

        let bytes = repo.read_document(&patient.id, &doc.hash).unwrap();
        assert_eq!(bytes, b"%PDF-1.4 scan");

        let dir = patient.id.sharded_dir(&cfg.patients_dir());
        let git = git2::Repository::open(&dir).unwrap();
        let tree = git.head().unwrap().peel_to_commit().unwrap().tree().unwrap();
        assert!(tree.get_path(Path::new(&doc.relative_path)).is_err());
    }

    #[test]
    fn register_rejects_unknown_user() {
        let (_temp, cfg, _user_id) = setup();
        let repo = PatientRepository::new(cfg.clone());

        let err = repo.register(sample_payload(&ShardableUuid::new())).unwrap_err();
        assert!(matches!(err, PatientError::UserNotFound(_)));
        assert!(repo.list().is_empty());
    }

    #[test]
    fn register_rejects_second_registration() {
        let (_temp, cfg, user_id) = setup();
        let repo = PatientRepository::new(cfg);

        repo.register(sample_payload(&user_id)).unwrap();
        let err = repo.register(sample_payload(&user_id)).unwrap_err();
        assert!(matches!(err, PatientError::AlreadyRegistered(_)));
        assert_eq!(repo.list().len(), 1);
    }

    #[test]
    fn register_rejects_missing_consent() {
        let (_temp, cfg, user_id) = setup();
        let repo = PatientRepository::new(cfg);
        let mut payload = sample_payload(&user_id);
        payload.privacy_consent = false;

        assert!(matches!(
            repo.register(payload),
            Err(PatientError::InvalidInput(_))
        ));
    }

    #[test]
    fn failed_document_store_leaves_no_directory() {
        let (_temp, cfg, user_id) = setup();
        let repo = PatientRepository::new(cfg.clone());
        let mut payload = sample_payload(&user_id);
        payload.identification_document = Some(DocumentEnvelope {
            blob_file: b"scan".to_vec(),
            file_name: "   ".into(),
            mime_type: "image/png".into(),
        });

        assert!(matches!(
            repo.register(payload),
            Err(PatientError::Files(_))
        ));
        assert_eq!(count_record_dirs(&cfg.patients_dir()), 0);
    }

    #[test]
    fn read_document_for_unknown_patient() {
        let (_temp, cfg, _user_id) = setup();
        let repo = PatientRepository::new(cfg);
        let err = repo
            .read_document(&ShardableUuid::new(), &"a".repeat(64))
            .unwrap_err();
        assert!(matches!(err, PatientError::PatientNotFound(_)));
    }
}
