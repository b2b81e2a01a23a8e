//! The page the registration flow hands off to.

use crate::actions::PatientActions;
use crate::constants::{APPOINTMENT_IMAGE, COPYRIGHT_NOTICE, LOGO_FULL_ICON};
use crate::error::PatientResult;
use carepulse_uuid::ShardableUuid;
use serde::Serialize;

/// What the appointment form does with its input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentFormType {
    Create,
}

/// Everything the new-appointment page needs to render.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointmentView {
    pub user_id: ShardableUuid,
    /// `None` when the user has not registered as a patient yet.
    pub patient_id: Option<ShardableUuid>,
    #[serde(rename = "type")]
    pub form_type: AppointmentFormType,
    pub logo: &'static str,
    pub illustration: &'static str,
    pub footer: &'static str,
}

/// Build the new-appointment page for `user_id`, pre-populating the patient id.
pub async fn load_new_appointment<A: PatientActions>(
    actions: &A,
    user_id: &ShardableUuid,
) -> PatientResult<NewAppointmentView> {
    let patient = actions.get_patient(user_id).await?;
    if patient.is_none() {
        tracing::debug!(user_id = %user_id, "new-appointment page for unregistered user");
    }

    Ok(NewAppointmentView {
        user_id: user_id.clone(),
        patient_id: patient.map(|p| p.id),
        form_type: AppointmentFormType::Create,
        logo: LOGO_FULL_ICON,
        illustration: APPOINTMENT_IMAGE,
        footer: COPYRIGHT_NOTICE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use crate::test_support::{sample_payload, test_cfg, validated_user};
    use tempfile::TempDir;

    #[tokio::test]
    async fn prepopulates_patient_id() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(test_cfg(temp.path()));
        let user = store
            .create_user(validated_user("jane@example.com"))
            .await
            .unwrap();
        let patient = store
            .register_patient(sample_payload(&user.id))
            .await
            .unwrap()
            .unwrap();

        let view = load_new_appointment(&store, &user.id).await.unwrap();
        assert_eq!(view.patient_id, Some(patient.id));
        assert_eq!(view.form_type, AppointmentFormType::Create);
        assert_eq!(view.logo, LOGO_FULL_ICON);
        assert_eq!(view.illustration, APPOINTMENT_IMAGE);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["type"], "create");
        assert_eq!(json["userId"], user.id.to_string());
    }

    #[tokio::test]
    async fn unregistered_user_has_no_patient_id() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(test_cfg(temp.path()));
        let view = load_new_appointment(&store, &ShardableUuid::new())
            .await
            .unwrap();
        assert!(view.patient_id.is_none());
    }
}
