//! Commit identity for versioned patient records.

use crate::constants::{DEFAULT_COMMIT_AUTHOR_EMAIL, DEFAULT_COMMIT_AUTHOR_NAME};
use crate::error::{PatientError, PatientResult};
use carepulse_types::{EmailAddress, NonEmptyText};

/// Identity recorded on every commit written by the patient store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Author {
    /// The display name written to the commit.
    pub name: NonEmptyText,

    /// The email address written to the commit.
    pub email: EmailAddress,
}

impl Author {
    /// Build an author from raw name and email values.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::InvalidInput`] if the name is blank, contains a newline, or
    /// the email is malformed.
    pub fn new(name: &str, email: &str) -> PatientResult<Self> {
        if name.contains(['\n', '\r']) {
            return Err(PatientError::InvalidInput(
                "commit author name must be single-line".into(),
            ));
        }
        let name = NonEmptyText::new(name)
            .map_err(|_| PatientError::InvalidInput("commit author name is required".into()))?;
        let email = EmailAddress::parse(email)
            .map_err(|e| PatientError::InvalidInput(format!("commit author email: {e}")))?;
        Ok(Self { name, email })
    }

    /// Resolve the author from optional environment values, falling back to the defaults
    /// for anything unset or blank.
    pub fn from_env_values(name: Option<String>, email: Option<String>) -> PatientResult<Self> {
        let name = name
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COMMIT_AUTHOR_NAME.to_string());
        let email = email
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COMMIT_AUTHOR_EMAIL.to_string());
        Self::new(&name, &email)
    }

    pub(crate) fn signature(&self) -> PatientResult<git2::Signature<'static>> {
        git2::Signature::now(self.name.as_str(), self.email.as_str())
            .map_err(PatientError::GitSignature)
    }
}
