//! User accounts created before patient registration.

use crate::form::{FieldErrors, FieldValue};
use carepulse_types::{EmailAddress, NonEmptyText, PhoneNumber};
use carepulse_uuid::ShardableUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct User {
    pub id: ShardableUuid,
    pub name: NonEmptyText,
    pub email: EmailAddress,
    pub phone: PhoneNumber,
    pub created_at: DateTime<Utc>,
}

/// Raw input of the sign-up form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Sign-up input that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedNewUser {
    pub name: NonEmptyText,
    pub email: EmailAddress,
    pub phone: PhoneNumber,
}

impl NewUser {
    /// Validate the sign-up form.
    ///
    /// # Errors
    ///
    /// Returns per-field messages keyed by `name`, `email` and `phone`.
    pub fn validate(&self) -> Result<ValidatedNewUser, FieldErrors> {
        let mut errors = FieldErrors::new();
        let [name_rules, email_rules, phone_rules] = crate::form::user_form_rules();

        for (rules, value) in [
            (&name_rules, &self.name),
            (&email_rules, &self.email),
            (&phone_rules, &self.phone),
        ] {
            if let Some(message) = rules.check(&FieldValue::Text(value.clone())) {
                errors.insert(rules.name, message);
            }
        }

        let name = NonEmptyText::new(&self.name);
        let email = EmailAddress::parse(&self.email);
        let phone = PhoneNumber::parse(&self.phone);

        match (errors.is_empty(), name, email, phone) {
            (true, Ok(name), Ok(email), Ok(phone)) => Ok(ValidatedNewUser { name, email, phone }),
            (_, name, email, phone) => {
                if let Err(e) = name {
                    errors.insert("name", e.to_string());
                }
                if let Err(e) = email {
                    errors.insert("email", e.to_string());
                }
                if let Err(e) = phone {
                    errors.insert("phone", e.to_string());
                }
                Err(errors)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user() -> NewUser {
        NewUser {
            name: "Jane Doe".into(),
            email: "Jane@Example.com".into(),
            phone: "+15551234567".into(),
        }
    }

    #[test]
    fn valid_user_is_normalised() {
        let validated = new_user().validate().expect("should validate");
        assert_eq!(validated.name.as_str(), "Jane Doe");
        assert_eq!(validated.email.as_str(), "jane@example.com");
        assert_eq!(validated.phone.as_str(), "+15551234567");
    }

    #[test]
    fn invalid_fields_are_reported() {
        let errors = NewUser {
            name: "J".into(),
            email: "jane".into(),
            phone: "555".into(),
        }
        .validate()
        .expect_err("should fail");
        assert_eq!(errors.get("name"), Some("Name must be at least 2 characters"));
        assert_eq!(errors.get("email"), Some("Invalid email address"));
        assert_eq!(errors.get("phone"), Some("Invalid phone number"));
    }

    #[test]
    fn user_yaml_round_trip() {
        let validated = new_user().validate().unwrap();
        let user = User {
            id: ShardableUuid::new(),
            name: validated.name,
            email: validated.email,
            phone: validated.phone,
            created_at: Utc::now(),
        };
        let yaml = serde_yaml::to_string(&user).unwrap();
        assert!(yaml.contains("createdAt"));
        let back: User = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, user);
    }
}
