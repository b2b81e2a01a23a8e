//! User account storage.
//!
//! Each account is a `user.yaml` in its own versioned directory under `users/`. Email
//! addresses are unique: signing up again with a known address returns the stored account.

use crate::config::CoreConfig;
use crate::constants::USER_YAML_FILENAME;
use crate::error::{PatientError, PatientResult};
use crate::repo::create_unique_shared_dir;
use crate::repositories::sharded_files;
use crate::user::{User, ValidatedNewUser};
use crate::versioned_files::{
    cleanup_after_failure, CommitAction, CommitDomain, CommitMessage, FileToWrite,
    VersionedFileService,
};
use carepulse_types::EmailAddress;
use carepulse_uuid::ShardableUuid;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct UserRepository {
    cfg: Arc<CoreConfig>,
}

impl UserRepository {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Create an account, or return the existing one for the same email address.
    ///
    /// # Errors
    ///
    /// Returns a storage, serialisation or Git error. A partially written account directory
    /// is removed before returning.
    pub fn create(&self, new_user: ValidatedNewUser) -> PatientResult<User> {
        if let Some(existing) = self.find_by_email(&new_user.email)? {
            tracing::debug!(user_id = %existing.id, "sign-up matched an existing account");
            return Ok(existing);
        }

        let message =
            CommitMessage::new(CommitDomain::Account, CommitAction::Create, "Account created")?;
        let users_dir = self.cfg.users_dir();
        fs::create_dir_all(&users_dir).map_err(PatientError::StorageDirCreation)?;
        let (id, user_dir) = create_unique_shared_dir(&users_dir, ShardableUuid::new)?;

        let user = User {
            id,
            name: new_user.name,
            email: new_user.email,
            phone: new_user.phone,
            created_at: Utc::now(),
        };

        let yaml = match serde_yaml::to_string(&user) {
            Ok(yaml) => yaml,
            Err(e) => {
                return Err(cleanup_after_failure(
                    &user_dir,
                    PatientError::YamlSerialization(e),
                ))
            }
        };

        VersionedFileService::init_and_commit(
            &user_dir,
            self.cfg.commit_author(),
            &message,
            &[FileToWrite {
                relative_path: Path::new(USER_YAML_FILENAME),
                content: &yaml,
            }],
        )?;

        tracing::info!(user_id = %user.id, "account created");
        Ok(user)
    }

    /// Load an account by id. `Ok(None)` if no such account is stored.
    pub fn get(&self, user_id: &ShardableUuid) -> PatientResult<Option<User>> {
        let path = self.user_file(user_id);
        if !path.is_file() {
            return Ok(None);
        }
        read_user(&path).map(Some)
    }

    /// All stored accounts, oldest first. Unreadable entries are logged and skipped.
    pub fn list(&self) -> Vec<User> {
        let mut users: Vec<User> = sharded_files(&self.cfg.users_dir(), USER_YAML_FILENAME)
            .into_iter()
            .filter_map(|path| match read_user(&path) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::warn!("failed to parse user.yaml: {} - {}", path.display(), e);
                    None
                }
            })
            .collect();
        users.sort_by_key(|u| u.created_at);
        users
    }

    pub fn find_by_email(&self, email: &EmailAddress) -> PatientResult<Option<User>> {
        Ok(self.list().into_iter().find(|u| &u.email == email))
    }

    fn user_file(&self, user_id: &ShardableUuid) -> PathBuf {
        user_id
            .sharded_dir(&self.cfg.users_dir())
            .join(USER_YAML_FILENAME)
    }
}

fn read_user(path: &Path) -> PatientResult<User> {
    let contents = fs::read_to_string(path).map_err(PatientError::FileRead)?;
    serde_yaml::from_str(&contents).map_err(PatientError::YamlDeserialization)
}
