//! Repository-scoped file storage service implementation
//!
//! [`FilesService`] stores the bytes of uploaded documents for one record directory.
//!
//! # Content Addressing
//!
//! Files are stored under their SHA-256 hash:
//!
//! - **Integrity**: content can be verified against its hash
//! - **Immutability**: a stored file is never rewritten
//! - **Deterministic paths**: the same content always lands at the same path
//!
//! # Security Model
//!
//! - The root directory is canonicalised at construction
//! - Record existence is validated at construction
//! - Hashes supplied by callers must be 64 lowercase hex characters, so a hash can never be
//!   used to walk out of the storage directory

use crate::constants::HASH_ALGORITHM;
use crate::{FilesError, FILES_FOLDER_NAME};
use carepulse_types::NonEmptyText;
use carepulse_uuid::ShardableUuid;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// A SHA-256 digest rendered as 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Hashes `bytes`.
    pub fn digest(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Validates a caller-supplied hex digest.
    pub fn parse(input: &str) -> Result<Self, FilesError> {
        let ok = input.len() == 64
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if ok {
            Ok(Self(input.to_owned()))
        } else {
            Err(FilesError::InvalidInput(format!(
                "hash must be 64 lowercase hex characters, got: '{input}'"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Sha256Hash {
    type Error = FilesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Sha256Hash::parse(&value)
    }
}

impl From<Sha256Hash> for String {
    fn from(value: Sha256Hash) -> Self {
        value.0
    }
}

/// Metadata for a stored file
///
/// Serialised alongside the owning record so the record can reference the bytes without
/// embedding them.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FileMetadata {
    /// Hashing algorithm used (always "sha256")
    pub hash_algorithm: NonEmptyText,

    /// Hexadecimal digest of the file content
    pub hash: Sha256Hash,

    /// Path relative to the record directory where the file is stored
    pub relative_path: NonEmptyText,

    /// Size of the file in bytes
    pub size_bytes: u64,

    /// Media type (MIME type), if known
    ///
    /// The type declared by the uploader wins; otherwise the content is sniffed. `None` when
    /// neither is available.
    pub media_type: Option<NonEmptyText>,

    /// Filename supplied by the uploader
    pub original_filename: NonEmptyText,

    /// UTC timestamp when the file was stored
    pub stored_at: DateTime<Utc>,
}

/// Service for managing files within a single record directory
///
/// - Record-scoped: each instance is bound to one record
/// - Immutable: files are never modified after creation
/// - Content-addressed: files are identified by their SHA-256 hash
#[derive(Debug)]
pub struct FilesService {
    /// Root directory containing all records of this kind
    root_directory: PathBuf,

    /// Record identifier
    repository_id: ShardableUuid,
}

impl FilesService {
    /// Creates a new `FilesService` for a specific record directory
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - the root directory does not exist or is not a directory
    /// - the record directory does not exist or is not a directory
    /// - path canonicalisation fails
    pub fn new(root_directory: &Path, repository_id: ShardableUuid) -> Result<Self, FilesError> {
        if !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                root_directory.display()
            )));
        }

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        let repository_root = repository_id.sharded_dir(&root_directory);
        if !repository_root.is_dir() {
            return Err(FilesError::RepositoryNotFound(format!(
                "Repository directory does not exist: {}",
                repository_root.display()
            )));
        }

        Ok(Self {
            root_directory,
            repository_id,
        })
    }

    /// Stores `bytes` in the record's content-addressed storage
    ///
    /// # Arguments
    ///
    /// * `bytes` - File content
    /// * `original_filename` - Filename supplied by the uploader; must be non-empty
    /// * `declared_media_type` - MIME type supplied by the uploader, if any
    ///
    /// # Storage Location
    ///
    /// `<record_root>/files/sha256/<h[0..2]>/<h[2..4]>/<hash>`
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - the filename is empty
    /// - the same content is already stored for this record
    /// - directory creation or the write fails
    pub fn add_bytes(
        &self,
        bytes: &[u8],
        original_filename: &str,
        declared_media_type: Option<&str>,
    ) -> Result<FileMetadata, FilesError> {
        let original_filename = NonEmptyText::new(original_filename)
            .map_err(|_| FilesError::InvalidInput("original filename cannot be empty".into()))?;

        let hash = Sha256Hash::digest(bytes);
        let relative_path = Self::relative_path(&hash);
        let storage_path = self.repository_root().join(&relative_path);

        if storage_path.exists() {
            return Err(FilesError::FileAlreadyExists(hash.to_string()));
        }

        if let Some(parent) = storage_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                FilesError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create storage directory {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        fs::write(&storage_path, bytes).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write file to {}: {}", storage_path.display(), e),
            ))
        })?;

        let media_type = declared_media_type
            .and_then(|m| NonEmptyText::new(m).ok())
            .or_else(|| infer::get(bytes).and_then(|kind| NonEmptyText::new(kind.mime_type()).ok()));

        Ok(FileMetadata {
            hash_algorithm: NonEmptyText::new(HASH_ALGORITHM)
                .map_err(|_| FilesError::InvalidInput("hash algorithm name is empty".into()))?,
            hash,
            relative_path: NonEmptyText::new(&relative_path)
                .map_err(|_| FilesError::InvalidInput("relative path is empty".into()))?,
            size_bytes: bytes.len() as u64,
            media_type,
            original_filename,
            stored_at: Utc::now(),
        })
    }

    /// Reads a stored file by its hash
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - the hash is not 64 lowercase hex characters
    /// - no file is stored under the hash
    /// - the file cannot be read
    pub fn read(&self, hash: &str) -> Result<Vec<u8>, FilesError> {
        let hash = Sha256Hash::parse(hash)?;
        let storage_path = self.repository_root().join(Self::relative_path(&hash));

        if !storage_path.is_file() {
            return Err(FilesError::NotFound(hash.to_string()));
        }

        fs::read(&storage_path).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read file from {}: {}", storage_path.display(), e),
            ))
        })
    }

    /// `files/sha256/<h[0..2]>/<h[2..4]>/<hash>`
    fn relative_path(hash: &Sha256Hash) -> String {
        let hex = hash.as_str();
        format!(
            "{FILES_FOLDER_NAME}/{HASH_ALGORITHM}/{}/{}/{}",
            &hex[0..2],
            &hex[2..4],
            hex
        )
    }

    /// Returns the record identifier
    #[must_use]
    pub fn repository_id(&self) -> &ShardableUuid {
        &self.repository_id
    }

    /// Returns the record's root directory
    #[must_use]
    pub fn repository_root(&self) -> PathBuf {
        self.repository_id.sharded_dir(&self.root_directory)
    }

    /// Returns the `files/` directory within the record. It may not exist yet.
    #[must_use]
    pub fn files_directory(&self) -> PathBuf {
        self.repository_root().join(FILES_FOLDER_NAME)
    }
}
