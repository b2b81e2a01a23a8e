//! The remote data operations the registration flow depends on.

use crate::error::PatientResult;
use crate::submission::RegisterPatientPayload;
use crate::user::{User, ValidatedNewUser};
use carepulse_uuid::ShardableUuid;
use fhir::PatientData;
use std::future::Future;

/// Account and patient operations behind the registration pages.
///
/// [`LocalStore`](crate::store::LocalStore) implements this on disk; tests substitute their own.
pub trait PatientActions: Send + Sync {
    /// Create an account. Signing up again with a known email returns the existing account.
    fn create_user(
        &self,
        new_user: ValidatedNewUser,
    ) -> impl Future<Output = PatientResult<User>> + Send;

    fn get_user(
        &self,
        user_id: &ShardableUuid,
    ) -> impl Future<Output = PatientResult<Option<User>>> + Send;

    /// The patient registered by `user_id`, if any.
    fn get_patient(
        &self,
        user_id: &ShardableUuid,
    ) -> impl Future<Output = PatientResult<Option<PatientData>>> + Send;

    /// Persist a registration.
    ///
    /// `Ok(None)` means the operation completed without producing a record; callers treat it
    /// as a failure.
    fn register_patient(
        &self,
        payload: RegisterPatientPayload,
    ) -> impl Future<Output = PatientResult<Option<PatientData>>> + Send;
}
