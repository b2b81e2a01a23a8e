//! Local, on-disk implementation of [`PatientActions`].

use crate::actions::PatientActions;
use crate::config::CoreConfig;
use crate::error::PatientResult;
use crate::repositories::patients::PatientRepository;
use crate::repositories::users::UserRepository;
use crate::submission::RegisterPatientPayload;
use crate::user::{User, ValidatedNewUser};
use carepulse_uuid::ShardableUuid;
use fhir::PatientData;
use std::sync::{Arc, Mutex, MutexGuard};

/// Users and patients stored under [`CoreConfig::patient_data_dir`].
///
/// Writes are serialised within the process so the one-registration-per-user and
/// one-account-per-email checks cannot race.
#[derive(Clone, Debug)]
pub struct LocalStore {
    cfg: Arc<CoreConfig>,
    users: UserRepository,
    patients: PatientRepository,
    write_lock: Arc<Mutex<()>>,
}

impl LocalStore {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            users: UserRepository::new(cfg.clone()),
            patients: PatientRepository::new(cfg.clone()),
            cfg,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn list_users(&self) -> Vec<User> {
        self.users.list()
    }

    pub fn list_patients(&self) -> Vec<PatientData> {
        self.patients.list()
    }

    /// Load a patient by the patient's own id.
    pub fn patient_by_id(&self, patient_id: &ShardableUuid) -> PatientResult<Option<PatientData>> {
        self.patients.get(patient_id)
    }

    pub fn read_document(&self, patient_id: &ShardableUuid, hash: &str) -> PatientResult<Vec<u8>> {
        self.patients.read_document(patient_id, hash)
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn create_user_blocking(&self, new_user: ValidatedNewUser) -> PatientResult<User> {
        let _guard = self.lock_writes();
        self.users.create(new_user)
    }

    fn register_blocking(&self, payload: RegisterPatientPayload) -> PatientResult<PatientData> {
        let _guard = self.lock_writes();
        self.patients.register(payload)
    }
}

impl PatientActions for LocalStore {
    async fn create_user(&self, new_user: ValidatedNewUser) -> PatientResult<User> {
        self.create_user_blocking(new_user)
    }

    async fn get_user(&self, user_id: &ShardableUuid) -> PatientResult<Option<User>> {
        self.users.get(user_id)
    }

    async fn get_patient(&self, user_id: &ShardableUuid) -> PatientResult<Option<PatientData>> {
        self.patients.find_by_user(user_id)
    }

    async fn register_patient(
        &self,
        payload: RegisterPatientPayload,
    ) -> PatientResult<Option<PatientData>> {
        self.register_blocking(payload).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PatientError;
    use crate::test_support::{sample_payload, test_cfg, validated_user};
    use tempfile::TempDir;

    #[tokio::test]
    async fn end_to_end_sign_up_and_register() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(test_cfg(temp.path()));

        let user = store
            .create_user(validated_user("jane@example.com"))
            .await
            .unwrap();
        assert_eq!(store.get_user(&user.id).await.unwrap(), Some(user.clone()));
        assert!(store.get_patient(&user.id).await.unwrap().is_none());

        let patient = store
            .register_patient(sample_payload(&user.id))
            .await
            .unwrap()
            .expect("record should be returned");

        assert_eq!(
            store.get_patient(&user.id).await.unwrap(),
            Some(patient.clone())
        );
        assert_eq!(store.patient_by_id(&patient.id).unwrap(), Some(patient));
        assert_eq!(store.list_users().len(), 1);
        assert_eq!(store.list_patients().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_registrations_for_one_user_store_one_record() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(test_cfg(temp.path()));
        let user = store
            .create_user(validated_user("jane@example.com"))
            .await
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                let payload = sample_payload(&user.id);
                tokio::spawn(async move { store.register_patient(payload).await })
            })
            .collect();

        let mut stored = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(Some(_)) => stored += 1,
                Err(PatientError::AlreadyRegistered(_)) => {}
                other => panic!("unexpected result: {other:?}"),
            }
        }
        assert_eq!(stored, 1);
        assert_eq!(store.list_patients().len(), 1);
    }
}
