//! FHIR-aligned patient wire models and translation helpers.
//!
//! Responsibilities:
//! - Define the flat domain record produced by a completed registration
//! - Define a strict wire model for serialisation/deserialisation
//! - Translate between the two, enforcing required fields
//!
//! Notes:
//! - The patient file is written once at registration and versioned in Git
//! - The identification document bytes are not part of this file, only a reference to them

use crate::FhirError;
use carepulse_uuid::ShardableUuid;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const USER_IDENTIFIER_SYSTEM: &str = "urn:carepulse:user";
const IDENTIFICATION_IDENTIFIER_SYSTEM: &str = "urn:carepulse:identification";
const EMERGENCY_RELATIONSHIP: &str = "emergency";
const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// Public domain-level types
// ============================================================================

/// Administrative gender offered on the registration form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// All variants, in the order the form offers them.
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    /// Human-readable label, as shown on the form.
    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }

    /// Convert to FHIR wire format string.
    fn to_wire(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    /// Parse from FHIR wire format string.
    fn from_wire(s: &str) -> Option<Self> {
        match s {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Gender {
    type Err = FhirError;

    /// Accepts the label or the wire form, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gender::from_wire(&s.trim().to_ascii_lowercase())
            .ok_or_else(|| FhirError::InvalidInput(format!("unknown gender '{s}'")))
    }
}

impl Serialize for Gender {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Gender {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Reference to the stored identification document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentReference {
    /// SHA-256 of the stored bytes.
    pub hash: String,
    /// Filename supplied by the uploader.
    pub file_name: String,
    /// MIME type, if known.
    pub media_type: Option<String>,
    /// Size of the document in bytes.
    pub size_bytes: u64,
    /// Location relative to the patient directory.
    pub relative_path: String,
}

/// Domain-level carrier for a registered patient (flat structure).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientData {
    /// Unique identifier for this patient record.
    pub id: ShardableUuid,

    /// The user account that registered this patient.
    pub user_id: ShardableUuid,

    pub name: String,
    pub email: String,
    pub phone: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub address: String,
    pub occupation: String,
    pub emergency_contact_name: String,
    pub emergency_contact_number: String,

    /// Display name of the chosen primary care physician.
    pub primary_physician: String,
    pub insurance_provider: String,
    pub insurance_policy_number: String,
    pub allergies: Option<String>,
    pub current_medication: Option<String>,
    pub family_medical_history: Option<String>,
    pub past_medical_history: Option<String>,

    pub identification_type: Option<String>,
    pub identification_number: Option<String>,
    pub identification_document: Option<DocumentReference>,

    pub treatment_consent: bool,
    pub disclosure_consent: bool,
    pub privacy_consent: bool,

    /// Last updated timestamp.
    pub last_updated: Option<DateTime<Utc>>,
}

// ============================================================================
// Public Patient operations
// ============================================================================

/// Patient resource operations.
///
/// Zero-sized type used for namespacing; all methods are associated functions.
pub struct Patient;

impl Patient {
    /// Parse a patient resource from YAML text.
    ///
    /// Uses `serde_path_to_error` to report the failing field path (e.g. `telecom.0.value`)
    /// when the YAML does not match the wire schema.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the YAML does not match the wire schema or contains unknown keys,
    /// - resourceType is not "Patient",
    /// - identifiers, gender or birth date are malformed,
    /// - a required element (user identifier, name, email, phone, emergency contact,
    ///   general practitioner) is missing.
    pub fn parse(yaml_text: &str) -> Result<PatientData, FhirError> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let wire = match serde_path_to_error::deserialize::<_, PatientWire>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(FhirError::Translation(format!(
                    "Patient schema mismatch at {path}: {source}"
                )));
            }
        };

        if wire.resource_type != "Patient" {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType 'Patient', got '{}'",
                wire.resource_type
            )));
        }

        wire_to_domain(wire)
    }

    /// Render a patient resource as YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if serialisation fails.
    pub fn render(data: &PatientData) -> Result<String, FhirError> {
        let wire = domain_to_wire(data);
        serde_yaml::to_string(&wire)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise patient: {e}")))
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

/// Wire representation of a patient resource for on-disk YAML.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct PatientWire {
    #[serde(rename = "resourceType")]
    resource_type: String,

    id: String,

    #[serde(default)]
    identifier: Vec<IdentifierWire>,

    #[serde(default)]
    name: Vec<HumanNameWire>,

    #[serde(default)]
    telecom: Vec<ContactPointWire>,

    gender: String,

    #[serde(rename = "birthDate")]
    birth_date: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    address: Vec<AddressWire>,

    #[serde(default)]
    contact: Vec<PatientContactWire>,

    #[serde(rename = "generalPractitioner", default)]
    general_practitioner: Vec<ReferenceWire>,

    carepulse: CarePulseWire,

    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<MetaWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct IdentifierWire {
    system: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    type_text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct HumanNameWire {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    use_type: Option<String>,

    text: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct ContactPointWire {
    system: String,
    value: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct AddressWire {
    text: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct PatientContactWire {
    relationship: String,
    name: HumanNameWire,
    #[serde(default)]
    telecom: Vec<ContactPointWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct ReferenceWire {
    display: String,
}

/// Registration data with no FHIR `Patient` element.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct CarePulseWire {
    occupation: String,

    insurance: InsuranceWire,

    #[serde(rename = "medicalHistory", default)]
    medical_history: MedicalHistoryWire,

    consent: ConsentWire,

    #[serde(
        rename = "identificationDocument",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    identification_document: Option<DocumentWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct InsuranceWire {
    provider: String,
    #[serde(rename = "policyNumber")]
    policy_number: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct MedicalHistoryWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allergies: Option<String>,
    #[serde(
        rename = "currentMedication",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    current_medication: Option<String>,
    #[serde(rename = "familyHistory", default, skip_serializing_if = "Option::is_none")]
    family_history: Option<String>,
    #[serde(rename = "pastHistory", default, skip_serializing_if = "Option::is_none")]
    past_history: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct ConsentWire {
    treatment: bool,
    disclosure: bool,
    privacy: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct DocumentWire {
    hash: String,
    #[serde(rename = "fileName")]
    file_name: String,
    #[serde(rename = "mediaType", default, skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
    #[serde(rename = "sizeBytes")]
    size_bytes: u64,
    #[serde(rename = "relativePath")]
    relative_path: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct MetaWire {
    #[serde(rename = "lastUpdated", skip_serializing_if = "Option::is_none")]
    last_updated: Option<String>,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn parse_uuid(value: &str, what: &str) -> Result<ShardableUuid, FhirError> {
    ShardableUuid::parse(value).map_err(|e| FhirError::InvalidUuid(format!("{what}: {e}")))
}

fn telecom_value(telecom: &[ContactPointWire], system: &str) -> Option<String> {
    telecom
        .iter()
        .find(|t| t.system == system)
        .map(|t| t.value.clone())
}

fn missing(what: &str) -> FhirError {
    FhirError::InvalidInput(format!("patient resource is missing {what}"))
}

/// Convert wire format patient to flat domain type.
fn wire_to_domain(wire: PatientWire) -> Result<PatientData, FhirError> {
    let id = parse_uuid(&wire.id, "patient id")?;

    let user_id = wire
        .identifier
        .iter()
        .find(|i| i.system == USER_IDENTIFIER_SYSTEM)
        .and_then(|i| i.value.as_deref())
        .ok_or_else(|| missing("the user identifier"))
        .and_then(|v| parse_uuid(v, "user identifier"))?;

    let identification = wire
        .identifier
        .iter()
        .find(|i| i.system == IDENTIFICATION_IDENTIFIER_SYSTEM);

    let name = wire
        .name
        .first()
        .map(|n| n.text.clone())
        .ok_or_else(|| missing("a name"))?;

    let email = telecom_value(&wire.telecom, "email").ok_or_else(|| missing("an email"))?;
    let phone = telecom_value(&wire.telecom, "phone").ok_or_else(|| missing("a phone"))?;

    let gender = Gender::from_wire(&wire.gender).ok_or_else(|| {
        FhirError::InvalidInput(format!("unknown gender '{}'", wire.gender))
    })?;

    let birth_date = NaiveDate::parse_from_str(&wire.birth_date, BIRTH_DATE_FORMAT)
        .map_err(|e| FhirError::Translation(format!("Invalid birthDate: {e}")))?;

    let emergency = wire
        .contact
        .iter()
        .find(|c| c.relationship == EMERGENCY_RELATIONSHIP)
        .ok_or_else(|| missing("an emergency contact"))?;
    let emergency_contact_number = telecom_value(&emergency.telecom, "phone")
        .ok_or_else(|| missing("an emergency contact phone"))?;

    let primary_physician = wire
        .general_practitioner
        .first()
        .map(|p| p.display.clone())
        .ok_or_else(|| missing("a general practitioner"))?;

    let last_updated = wire
        .meta
        .as_ref()
        .and_then(|m| m.last_updated.as_ref())
        .and_then(|s| s.parse::<DateTime<Utc>>().ok());

    let extension = wire.carepulse;

    Ok(PatientData {
        id,
        user_id,
        name,
        email,
        phone,
        gender,
        birth_date,
        address: wire
            .address
            .first()
            .map(|a| a.text.clone())
            .unwrap_or_default(),
        occupation: extension.occupation,
        emergency_contact_name: emergency.name.text.clone(),
        emergency_contact_number,
        primary_physician,
        insurance_provider: extension.insurance.provider,
        insurance_policy_number: extension.insurance.policy_number,
        allergies: extension.medical_history.allergies,
        current_medication: extension.medical_history.current_medication,
        family_medical_history: extension.medical_history.family_history,
        past_medical_history: extension.medical_history.past_history,
        identification_type: identification.and_then(|i| i.type_text.clone()),
        identification_number: identification.and_then(|i| i.value.clone()),
        identification_document: extension.identification_document.map(|d| DocumentReference {
            hash: d.hash,
            file_name: d.file_name,
            media_type: d.media_type,
            size_bytes: d.size_bytes,
            relative_path: d.relative_path,
        }),
        treatment_consent: extension.consent.treatment,
        disclosure_consent: extension.consent.disclosure,
        privacy_consent: extension.consent.privacy,
        last_updated,
    })
}

/// Convert flat domain type to wire format patient.
fn domain_to_wire(data: &PatientData) -> PatientWire {
    let mut identifier = vec![IdentifierWire {
        system: USER_IDENTIFIER_SYSTEM.to_string(),
        type_text: None,
        value: Some(data.user_id.to_string()),
    }];
    if data.identification_type.is_some() || data.identification_number.is_some() {
        identifier.push(IdentifierWire {
            system: IDENTIFICATION_IDENTIFIER_SYSTEM.to_string(),
            type_text: data.identification_type.clone(),
            value: data.identification_number.clone(),
        });
    }

    let address = if data.address.is_empty() {
        vec![]
    } else {
        vec![AddressWire {
            text: data.address.clone(),
        }]
    };

    PatientWire {
        resource_type: "Patient".to_string(),
        id: data.id.to_string(),
        identifier,
        name: vec![HumanNameWire {
            use_type: Some("official".to_string()),
            text: data.name.clone(),
        }],
        telecom: vec![
            ContactPointWire {
                system: "email".to_string(),
                value: data.email.clone(),
            },
            ContactPointWire {
                system: "phone".to_string(),
                value: data.phone.clone(),
            },
        ],
        gender: data.gender.to_wire().to_string(),
        birth_date: data.birth_date.format(BIRTH_DATE_FORMAT).to_string(),
        address,
        contact: vec![PatientContactWire {
            relationship: EMERGENCY_RELATIONSHIP.to_string(),
            name: HumanNameWire {
                use_type: None,
                text: data.emergency_contact_name.clone(),
            },
            telecom: vec![ContactPointWire {
                system: "phone".to_string(),
                value: data.emergency_contact_number.clone(),
            }],
        }],
        general_practitioner: vec![ReferenceWire {
            display: data.primary_physician.clone(),
        }],
        carepulse: CarePulseWire {
            occupation: data.occupation.clone(),
            insurance: InsuranceWire {
                provider: data.insurance_provider.clone(),
                policy_number: data.insurance_policy_number.clone(),
            },
            medical_history: MedicalHistoryWire {
                allergies: data.allergies.clone(),
                current_medication: data.current_medication.clone(),
                family_history: data.family_medical_history.clone(),
                past_history: data.past_medical_history.clone(),
            },
            consent: ConsentWire {
                treatment: data.treatment_consent,
                disclosure: data.disclosure_consent,
                privacy: data.privacy_consent,
            },
            identification_document: data.identification_document.as_ref().map(|d| DocumentWire {
                hash: d.hash.clone(),
                file_name: d.file_name.clone(),
                media_type: d.media_type.clone(),
                size_bytes: d.size_bytes,
                relative_path: d.relative_path.clone(),
            }),
        },
        meta: data.last_updated.map(|lu| MetaWire {
            last_updated: Some(lu.to_rfc3339()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"resourceType: Patient
id: 90a8d1ea318041d9adb070a834d4e0f6
identifier:
  - system: urn:carepulse:user
    value: 1b2c3d4e5f60718293a4b5c6d7e8f901
  - system: urn:carepulse:identification
    type: Passport
    value: X1234567
name:
  - use: official
    text: Sarah Williams
telecom:
  - system: email
    value: sarah@example.com
  - system: phone
    value: "+447700900123"
gender: female
birthDate: "1992-03-20"
address:
  - text: 14th Street, New York
contact:
  - relationship: emergency
    name:
      text: Tom Williams
    telecom:
      - system: phone
        value: "+447700900456"
generalPractitioner:
  - display: Leila Cameron
carepulse:
  occupation: Engineer
  insurance:
    provider: BlueCross
    policyNumber: ABC123456789
  medicalHistory:
    allergies: Peanuts
  consent:
    treatment: true
    disclosure: true
    privacy: true
meta:
  lastUpdated: 2026-01-23T13:58:04.099304Z
"#;

    fn sample_data() -> PatientData {
        Patient::parse(SAMPLE).expect("sample should parse")
    }

    #[test]
    fn parses_sample_yaml() {
        let data = sample_data();
        assert_eq!(data.id.to_string(), "90a8d1ea318041d9adb070a834d4e0f6");
        assert_eq!(data.user_id.to_string(), "1b2c3d4e5f60718293a4b5c6d7e8f901");
        assert_eq!(data.name, "Sarah Williams");
        assert_eq!(data.email, "sarah@example.com");
        assert_eq!(data.phone, "+447700900123");
        assert_eq!(data.gender, Gender::Female);
        assert_eq!(data.birth_date, NaiveDate::from_ymd_opt(1992, 3, 20).unwrap());
        assert_eq!(data.emergency_contact_name, "Tom Williams");
        assert_eq!(data.emergency_contact_number, "+447700900456");
        assert_eq!(data.primary_physician, "Leila Cameron");
        assert_eq!(data.identification_type.as_deref(), Some("Passport"));
        assert_eq!(data.identification_number.as_deref(), Some("X1234567"));
        assert_eq!(data.allergies.as_deref(), Some("Peanuts"));
        assert!(data.current_medication.is_none());
        assert!(data.identification_document.is_none());
        assert!(data.treatment_consent && data.disclosure_consent && data.privacy_consent);
        assert!(data.last_updated.is_some());
    }

    #[test]
    fn round_trips_with_document_reference() {
        let mut data = sample_data();
        data.identification_document = Some(DocumentReference {
            hash: "ab".repeat(32),
            file_name: "passport.pdf".into(),
            media_type: Some("application/pdf".into()),
            size_bytes: 2048,
            relative_path: format!("files/sha256/ab/ab/{}", "ab".repeat(32)),
        });

        let yaml = Patient::render(&data).expect("render patient");
        let reparsed = Patient::parse(&yaml).expect("reparse yaml");
        assert_eq!(data, reparsed);
    }

    #[test]
    fn render_omits_identification_identifier_when_absent() {
        let mut data = sample_data();
        data.identification_type = None;
        data.identification_number = None;

        let yaml = Patient::render(&data).expect("render patient");
        assert!(!yaml.contains(IDENTIFICATION_IDENTIFIER_SYSTEM));
        assert!(!yaml.contains("identificationDocument"));
    }

    #[test]
    fn strict_validation_rejects_unknown_keys() {
        let input = SAMPLE.replace("gender: female", "gender: female\nunexpected_key: 1");
        let err = Patient::parse(&input).expect_err("should reject unknown key");
        match err {
            FhirError::Translation(msg) => assert!(msg.contains("unexpected_key")),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_resource_type() {
        let input = SAMPLE.replace("resourceType: Patient", "resourceType: NotPatient");
        let err = Patient::parse(&input).expect_err("should reject invalid resourceType");
        match err {
            FhirError::InvalidInput(msg) => assert!(msg.contains("NotPatient")),
            other => panic!("expected InvalidInput error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_gender() {
        let input = SAMPLE.replace("gender: female", "gender: unknown");
        assert!(matches!(
            Patient::parse(&input),
            Err(FhirError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_missing_user_identifier() {
        let input = SAMPLE.replace("urn:carepulse:user", "urn:other:user");
        let err = Patient::parse(&input).expect_err("should require user identifier");
        assert!(err.to_string().contains("user identifier"));
    }

    #[test]
    fn gender_parses_labels_case_insensitively() {
        assert_eq!("Male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("FEMALE".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!(" other ".parse::<Gender>().unwrap(), Gender::Other);
        assert!("x".parse::<Gender>().is_err());
    }
}
