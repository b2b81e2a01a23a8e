#[allow(clippy::single_component_path_imports)]
use serde_yaml;

use crate::form::FormError;

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("patient not found for user: {0}")]
    PatientNotFound(String),
    #[error("a patient is already registered for user: {0}")]
    AlreadyRegistered(String),
    #[error("invalid registration catalog: {0}")]
    InvalidCatalog(String),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create patient directory: {0}")]
    PatientDirCreation(std::io::Error),
    #[error(
        "initialise failed and cleanup also failed (path: {path}): init={init_error}; cleanup={cleanup_error}",
        path = path.display()
    )]
    CleanupAfterInitialiseFailed {
        path: std::path::PathBuf,
        #[source]
        init_error: Box<PatientError>,
        cleanup_error: std::io::Error,
    },
    #[error("failed to write file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),

    #[error(transparent)]
    Form(#[from] FormError),
    #[error("FHIR error: {0}")]
    Fhir(#[from] fhir::FhirError),
    #[error("file storage error: {0}")]
    Files(#[from] carepulse_files::FilesError),
    #[error("invalid identifier: {0}")]
    Uuid(#[from] carepulse_uuid::UuidError),
    #[error("invalid text: {0}")]
    Text(#[from] carepulse_types::TextError),

    #[error("failed to initialise git repository: {0}")]
    GitInit(git2::Error),
    #[error("failed to access git index: {0}")]
    GitIndex(git2::Error),
    #[error("failed to add file to git index: {0}")]
    GitAdd(git2::Error),
    #[error("failed to write git tree: {0}")]
    GitWriteTree(git2::Error),
    #[error("failed to find git tree: {0}")]
    GitFindTree(git2::Error),
    #[error("failed to create git signature: {0}")]
    GitSignature(git2::Error),
    #[error("failed to create git commit: {0}")]
    GitCommit(git2::Error),
    #[error("failed to get git head: {0}")]
    GitHead(git2::Error),
    #[error("failed to set git head: {0}")]
    GitSetHead(git2::Error),
    #[error("failed to peel git commit: {0}")]
    GitPeel(git2::Error),
}

pub type PatientResult<T> = std::result::Result<T, PatientError>;
