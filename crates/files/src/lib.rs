//! CarePulse File Storage
//!
//! Binary storage for documents attached to a record, most notably the scanned identification
//! document uploaded with a patient registration.
//!
//! ## Design Principles
//!
//! - Semantic data (the patient YAML) and binary bytes are kept apart
//! - Binary files are not tracked in Git
//! - Binary files are immutable once added
//! - The record references a file by its SHA-256 hash, filename and media type
//!
//! ## Repository-Scoped Storage Model
//!
//! ```text
//! <records_root>/
//! └── <s1>/<s2>/<record_id>/
//!     ├── .gitignore
//!     ├── patient.yaml
//!     └── files/        # gitignored
//!         └── sha256/
//!             └── ab/
//!                 └── cd/
//!                     └── abcd3f9e…
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use carepulse_files::FilesService;
//! use carepulse_uuid::ShardableUuid;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let root = Path::new("patient_data/patients");
//! let record_id = ShardableUuid::parse("550e8400e29b41d4a716446655440000")?;
//!
//! let service = FilesService::new(root, record_id)?;
//! let metadata = service.add_bytes(b"%PDF-1.7 ...", "passport.pdf", Some("application/pdf"))?;
//! let bytes = service.read(metadata.hash.as_str())?;
//! # Ok(())
//! # }
//! ```

mod constants;
mod files;

pub use constants::FILES_FOLDER_NAME;
pub use files::{FileMetadata, FilesService, Sha256Hash};
pub use carepulse_uuid::ShardableUuid;

/// Errors that can occur during file operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Repository directory does not exist
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    /// Input failed validation (empty filename, malformed hash)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File already exists in content-addressed storage (immutability violation)
    #[error("File with hash {0} already exists in storage")]
    FileAlreadyExists(String),

    /// No file is stored under the requested hash
    #[error("File not found for hash: {0}")]
    NotFound(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
