//! Registration catalog: the option lists the registration form offers.
//!
//! The catalog is configuration, not code. The built-in default matches the clinic's current
//! roster; deployments can replace it with a YAML file (see [`RegistrationCatalog::from_yaml`]).
//!
//! ```yaml
//! doctors:
//!   - name: John Green
//!     image: /assets/images/dr-green.png
//! identificationTypes:
//!   - Passport
//! genderOptions: [Male, Female, Other]
//! ```

use crate::error::{PatientError, PatientResult};
use fhir::Gender;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A physician patients can choose as their primary care provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Doctor {
    pub name: String,
    pub image: String,
}

impl Doctor {
    fn new(name: &str, image: &str) -> Self {
        Self {
            name: name.to_string(),
            image: image.to_string(),
        }
    }
}

/// Option lists for the select and radio controls of the registration form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegistrationCatalog {
    pub doctors: Vec<Doctor>,
    pub identification_types: Vec<String>,
    pub gender_options: Vec<Gender>,
}

impl Default for RegistrationCatalog {
    fn default() -> Self {
        let doctors = [
            ("John Green", "/assets/images/dr-green.png"),
            ("Leila Cameron", "/assets/images/dr-cameron.png"),
            ("David Livingston", "/assets/images/dr-livingston.png"),
            ("Evan Peter", "/assets/images/dr-peter.png"),
            ("Jane Powell", "/assets/images/dr-powell.png"),
            ("Alex Ramirez", "/assets/images/dr-remirez.png"),
            ("Jasmine Lee", "/assets/images/dr-lee.png"),
            ("Alyana Cruz", "/assets/images/dr-cruz.png"),
            ("Hardik Sharma", "/assets/images/dr-sharma.png"),
        ]
        .into_iter()
        .map(|(name, image)| Doctor::new(name, image))
        .collect();

        let identification_types = [
            "Birth Certificate",
            "Driver's License",
            "Medical Insurance Card/Policy",
            "Military ID Card",
            "National Identity Card",
            "Passport",
            "Resident Alien Card (Green Card)",
            "Social Security Card",
            "State ID Card",
            "Student ID Card",
            "Voter ID Card",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            doctors,
            identification_types,
            gender_options: Gender::ALL.to_vec(),
        }
    }
}

impl RegistrationCatalog {
    /// Parse and validate a catalog from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::YamlDeserialization`] for malformed YAML or unknown keys, and
    /// [`PatientError::InvalidCatalog`] if any list is empty or contains duplicates.
    pub fn from_yaml(yaml_text: &str) -> PatientResult<Self> {
        let catalog: Self =
            serde_yaml::from_str(yaml_text).map_err(PatientError::YamlDeserialization)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog file from disk.
    pub fn load(path: &Path) -> PatientResult<Self> {
        let text = std::fs::read_to_string(path).map_err(PatientError::FileRead)?;
        Self::from_yaml(&text)
    }

    /// Check that every list is non-empty and free of duplicates.
    pub fn validate(&self) -> PatientResult<()> {
        if self.doctors.is_empty() {
            return Err(PatientError::InvalidCatalog("doctors cannot be empty".into()));
        }
        if self.identification_types.is_empty() {
            return Err(PatientError::InvalidCatalog(
                "identificationTypes cannot be empty".into(),
            ));
        }
        if self.gender_options.is_empty() {
            return Err(PatientError::InvalidCatalog(
                "genderOptions cannot be empty".into(),
            ));
        }

        let mut names = HashSet::new();
        for doctor in &self.doctors {
            if doctor.name.trim().is_empty() {
                return Err(PatientError::InvalidCatalog("doctor name cannot be blank".into()));
            }
            if !names.insert(doctor.name.as_str()) {
                return Err(PatientError::InvalidCatalog(format!(
                    "duplicate doctor '{}'",
                    doctor.name
                )));
            }
        }

        let mut types = HashSet::new();
        for id_type in &self.identification_types {
            if !types.insert(id_type.as_str()) {
                return Err(PatientError::InvalidCatalog(format!(
                    "duplicate identification type '{id_type}'"
                )));
            }
        }

        let genders: HashSet<_> = self.gender_options.iter().collect();
        if genders.len() != self.gender_options.len() {
            return Err(PatientError::InvalidCatalog(
                "duplicate gender option".into(),
            ));
        }

        Ok(())
    }

    pub fn doctor(&self, name: &str) -> Option<&Doctor> {
        self.doctors.iter().find(|d| d.name == name)
    }

    pub fn doctor_names(&self) -> Vec<String> {
        self.doctors.iter().map(|d| d.name.clone()).collect()
    }

    pub fn gender_labels(&self) -> Vec<String> {
        self.gender_options
            .iter()
            .map(|g| g.label().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_valid() {
        let catalog = RegistrationCatalog::default();
        catalog.validate().expect("default catalog should validate");
        assert_eq!(catalog.doctors.len(), 9);
        assert_eq!(catalog.identification_types[0], "Birth Certificate");
        assert_eq!(catalog.gender_labels(), vec!["Male", "Female", "Other"]);
        assert_eq!(
            catalog.doctor("Jane Powell").map(|d| d.image.as_str()),
            Some("/assets/images/dr-powell.png")
        );
    }

    #[test]
    fn from_yaml_parses_custom_catalog() {
        let yaml = r#"
doctors:
  - name: Ada Byron
    image: /assets/images/dr-byron.png
identificationTypes:
  - Passport
genderOptions: [Female, Other]
"#;
        let catalog = RegistrationCatalog::from_yaml(yaml).expect("catalog should parse");
        assert_eq!(catalog.doctor_names(), vec!["Ada Byron"]);
        assert_eq!(catalog.gender_options, vec![Gender::Female, Gender::Other]);
    }

    #[test]
    fn from_yaml_rejects_unknown_keys() {
        let yaml = "doctors: []\nidentificationTypes: []\ngenderOptions: []\nextra: 1\n";
        assert!(matches!(
            RegistrationCatalog::from_yaml(yaml),
            Err(PatientError::YamlDeserialization(_))
        ));
    }

    #[test]
    fn validate_rejects_empty_and_duplicate_lists() {
        let mut catalog = RegistrationCatalog::default();
        catalog.doctors.clear();
        assert!(matches!(
            catalog.validate(),
            Err(PatientError::InvalidCatalog(_))
        ));

        let mut catalog = RegistrationCatalog::default();
        catalog.identification_types.push("Passport".into());
        let err = catalog.validate().expect_err("duplicate should be rejected");
        assert!(err.to_string().contains("Passport"));
    }
}
