//! Versioned file operations with Git-based version control.
//!
//! Each registered patient lives in its own directory, versioned by a local Git repository
//! (`git2`/libgit2). This module provides:
//!
//! - **Atomic record creation**: initialise a repository, write the record's files and make
//!   the first commit, or remove the directory entirely
//! - **Structured commit messages**: `<domain>:<action>: <summary>` with an author trailer
//!
//! ## Branch Policy
//!
//! Every patient repository uses `refs/heads/main`.
//!
//! Commit messages are labels, not content. Do not put patient identifiers or registration
//! data in them.

use crate::author::Author;
use crate::error::{PatientError, PatientResult};
use carepulse_types::NonEmptyText;
use std::fmt;
use std::path::{Path, PathBuf};

#[cfg(test)]
use std::collections::HashSet;
#[cfg(test)]
use std::sync::{LazyLock, Mutex};

const MAIN_REF: &str = "refs/heads/main";

/// What a commit touches.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) enum CommitDomain {
    Account,
    Registration,
}

impl CommitDomain {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Registration => "registration",
        }
    }
}

impl fmt::Display for CommitDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a commit does.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) enum CommitAction {
    Create,
}

impl CommitAction {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
        }
    }
}

impl fmt::Display for CommitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured, predictable commit message.
///
/// Rendering rules:
///
/// - Subject line: `<domain>:<action>: <summary>`
/// - A blank line, then `Author-Name: <name>`
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct CommitMessage {
    domain: CommitDomain,
    action: CommitAction,
    summary: NonEmptyText,
}

impl CommitMessage {
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` if the summary is empty or spans several lines.
    pub(crate) fn new(
        domain: CommitDomain,
        action: CommitAction,
        summary: impl AsRef<str>,
    ) -> PatientResult<Self> {
        let summary_str = summary.as_ref().trim();
        if summary_str.contains(['\n', '\r']) {
            return Err(PatientError::InvalidInput(
                "commit summary must be single-line".into(),
            ));
        }
        let summary = NonEmptyText::new(summary_str)
            .map_err(|_| PatientError::InvalidInput("commit summary must be non-empty".into()))?;

        Ok(Self {
            domain,
            action,
            summary,
        })
    }

    pub(crate) fn render_with_author(&self, author: &Author) -> String {
        format!(
            "{}:{}: {}\n\nAuthor-Name: {}",
            self.domain,
            self.action,
            self.summary.as_str(),
            author.name.as_str()
        )
    }
}

/// A file written into a new record, relative to the record directory.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FileToWrite<'a> {
    pub relative_path: &'a Path,
    pub content: &'a str,
}

/// A Git repository rooted at `workdir`.
pub(crate) struct VersionedFileService {
    repo: git2::Repository,
    workdir: PathBuf,
}

impl VersionedFileService {
    /// Create a new Git repository at `workdir`.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::GitInit`] if initialisation fails or the repository is bare.
    pub(crate) fn init(workdir: &Path) -> PatientResult<Self> {
        let repo = git2::Repository::init(workdir).map_err(PatientError::GitInit)?;
        // libgit2 may canonicalise the workdir; paths are stripped against its version.
        let actual_workdir = repo
            .workdir()
            .ok_or_else(|| {
                PatientError::GitInit(git2::Error::from_str("repository has no working directory"))
            })?
            .to_path_buf();
        Ok(Self {
            repo,
            workdir: actual_workdir,
        })
    }

    fn ensure_main_head(&self) -> PatientResult<()> {
        self.repo
            .set_head(MAIN_REF)
            .map_err(PatientError::GitSetHead)?;
        Ok(())
    }

    /// Resolve `path` to a workdir-relative path that stays inside the workdir.
    fn workdir_relative(&self, path: &Path) -> PatientResult<PathBuf> {
        let rel = if path.is_absolute() {
            path.strip_prefix(&self.workdir)
                .map_err(|_| {
                    PatientError::InvalidInput(
                        "path is outside the repository working directory".into(),
                    )
                })?
                .to_path_buf()
        } else {
            path.to_path_buf()
        };

        if rel
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(PatientError::InvalidInput(
                "path must not contain parent directory references (..)".into(),
            ));
        }
        Ok(rel)
    }

    /// Create a commit on `main` including only the provided paths.
    ///
    /// Paths may be workdir-relative or absolute under the workdir. Paths containing `..` are
    /// rejected.
    pub(crate) fn commit_paths(
        &self,
        author: &Author,
        message: &CommitMessage,
        paths: &[PathBuf],
    ) -> PatientResult<git2::Oid> {
        self.ensure_main_head()?;
        let mut index = self.repo.index().map_err(PatientError::GitIndex)?;

        for path in paths {
            let rel = self.workdir_relative(path)?;
            index.add_path(&rel).map_err(PatientError::GitAdd)?;
        }
        index.write().map_err(PatientError::GitIndex)?;

        let tree_id = index.write_tree().map_err(PatientError::GitWriteTree)?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(PatientError::GitFindTree)?;

        let sig = author.signature()?;
        let rendered = message.render_with_author(author);

        let parents = self.resolve_head_parents()?;
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, &rendered, &tree, &parent_refs)
            .map_err(PatientError::GitCommit)
    }

    /// Initialise a repository in `record_dir`, write `files` and commit them as the first
    /// commit. The whole directory is removed if anything fails.
    ///
    /// Every path is checked before anything is written, so a bad path never touches the
    /// filesystem outside `record_dir`.
    ///
    /// # Errors
    ///
    /// Returns the initialisation, write or commit error. If removing the directory also fails,
    /// returns [`PatientError::CleanupAfterInitialiseFailed`] carrying both errors.
    pub(crate) fn init_and_commit(
        record_dir: &Path,
        author: &Author,
        message: &CommitMessage,
        files: &[FileToWrite<'_>],
    ) -> PatientResult<git2::Oid> {
        let result: PatientResult<git2::Oid> = (|| {
            let repo = Self::init(record_dir)?;
            let paths = files
                .iter()
                .map(|f| repo.workdir_relative(f.relative_path))
                .collect::<PatientResult<Vec<_>>>()?;

            for (file, rel) in files.iter().zip(&paths) {
                let full_path = repo.workdir.join(rel);
                if let Some(parent) = full_path.parent() {
                    std::fs::create_dir_all(parent).map_err(PatientError::FileWrite)?;
                }
                std::fs::write(&full_path, file.content).map_err(PatientError::FileWrite)?;
            }

            repo.commit_paths(author, message, &paths)
        })();

        result.map_err(|init_error| cleanup_after_failure(record_dir, init_error))
    }

    fn resolve_head_parents(&self) -> PatientResult<Vec<git2::Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => {
                let commit = head.peel_to_commit().map_err(PatientError::GitPeel)?;
                Ok(vec![commit])
            }
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(vec![]),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(vec![]),
            Err(e) => Err(PatientError::GitHead(e)),
        }
    }
}

/// Remove a half-built record directory, folding a cleanup failure into the returned error.
pub(crate) fn cleanup_after_failure(record_dir: &Path, error: PatientError) -> PatientError {
    match cleanup_record_dir(record_dir) {
        Ok(()) => error,
        Err(cleanup_error) => PatientError::CleanupAfterInitialiseFailed {
            path: record_dir.to_path_buf(),
            init_error: Box::new(error),
            cleanup_error,
        },
    }
}

#[cfg(test)]
static FORCE_CLEANUP_ERROR_FOR_THREADS: LazyLock<Mutex<HashSet<std::thread::ThreadId>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

/// Make the next cleanup on the current thread fail.
#[cfg(test)]
pub(crate) fn force_cleanup_error_for_current_thread() {
    FORCE_CLEANUP_ERROR_FOR_THREADS
        .lock()
        .expect("FORCE_CLEANUP_ERROR_FOR_THREADS mutex poisoned")
        .insert(std::thread::current().id());
}

fn cleanup_record_dir(record_dir: &Path) -> std::io::Result<()> {
    #[cfg(test)]
    {
        let current_id = std::thread::current().id();
        let mut guard = FORCE_CLEANUP_ERROR_FOR_THREADS
            .lock()
            .expect("FORCE_CLEANUP_ERROR_FOR_THREADS mutex poisoned");

        if guard.remove(&current_id) {
            return Err(std::io::Error::other("forced cleanup failure (test hook)"));
        }
    }

    std::fs::remove_dir_all(record_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn author() -> Author {
        Author::new("Front Desk", "desk@example.com").unwrap()
    }

    fn message() -> CommitMessage {
        CommitMessage::new(
            CommitDomain::Registration,
            CommitAction::Create,
            "Patient registered",
        )
        .unwrap()
    }

    #[test]
    fn renders_subject_and_author_trailer() {
        let rendered = message().render_with_author(&author());
        assert_eq!(
            rendered,
            "registration:create: Patient registered\n\nAuthor-Name: Front Desk"
        );
    }

    #[test]
    fn rejects_multiline_or_empty_summary() {
        assert!(CommitMessage::new(CommitDomain::Registration, CommitAction::Create, "a\nb").is_err());
        assert!(CommitMessage::new(CommitDomain::Registration, CommitAction::Create, "  ").is_err());
    }

    #[test]
    fn init_and_commit_creates_main_branch_commit() {
        let temp = TempDir::new().unwrap();
        let record_dir = temp.path().join("record");
        std::fs::create_dir(&record_dir).unwrap();

        let files = [
            FileToWrite {
                relative_path: Path::new(".gitignore"),
                content: "files/\n",
            },
            FileToWrite {
                relative_path: Path::new("nested/data.yaml"),
                content: "a: 1\n",
            },
        ];
        let oid = VersionedFileService::init_and_commit(&record_dir, &author(), &message(), &files)
            .expect("init_and_commit should succeed");

        let repo = git2::Repository::open(&record_dir).unwrap();
        let head = repo.head().unwrap();
        assert_eq!(head.name(), Some(MAIN_REF));
        let commit = head.peel_to_commit().unwrap();
        assert_eq!(commit.id(), oid);
        assert_eq!(commit.parent_count(), 0);
        assert_eq!(commit.summary(), Some("registration:create: Patient registered"));
        assert_eq!(commit.author().email(), Some("desk@example.com"));
        let tree = commit.tree().unwrap();
        assert!(tree.get_path(Path::new(".gitignore")).is_ok());
        assert!(tree.get_path(Path::new("nested/data.yaml")).is_ok());
    }

    #[test]
    fn init_and_commit_rejects_escaping_path_before_writing() {
        let temp = TempDir::new().unwrap();
        let record_dir = temp.path().join("record");
        std::fs::create_dir(&record_dir).unwrap();

        let files = [
            FileToWrite {
                relative_path: Path::new("ok.yaml"),
                content: "ok",
            },
            FileToWrite {
                relative_path: Path::new("../escape.yaml"),
                content: "bad",
            },
        ];
        let result =
            VersionedFileService::init_and_commit(&record_dir, &author(), &message(), &files);

        assert!(matches!(result, Err(PatientError::InvalidInput(_))));
        assert!(!record_dir.exists());
        assert!(!temp.path().join("escape.yaml").exists());
    }

    #[test]
    fn init_and_commit_removes_directory_when_write_fails() {
        let temp = TempDir::new().unwrap();
        let record_dir = temp.path().join("record");
        std::fs::create_dir(&record_dir).unwrap();
        // A directory where the file should go makes the write fail.
        std::fs::create_dir(record_dir.join("patient.yaml")).unwrap();

        let files = [FileToWrite {
            relative_path: Path::new("patient.yaml"),
            content: "a: 1\n",
        }];
        let result =
            VersionedFileService::init_and_commit(&record_dir, &author(), &message(), &files);

        assert!(matches!(result, Err(PatientError::FileWrite(_))));
        assert!(!record_dir.exists());
    }

    #[test]
    fn cleanup_failure_reports_both_errors() {
        let temp = TempDir::new().unwrap();
        let record_dir = temp.path().join("record");
        std::fs::create_dir(&record_dir).unwrap();

        force_cleanup_error_for_current_thread();
        let err = cleanup_after_failure(&record_dir, PatientError::InvalidInput("boom".into()));

        match err {
            PatientError::CleanupAfterInitialiseFailed {
                path, init_error, ..
            } => {
                assert_eq!(path, record_dir);
                assert!(matches!(*init_error, PatientError::InvalidInput(_)));
            }
            other => panic!("expected CleanupAfterInitialiseFailed, got {other:?}"),
        }
        assert!(record_dir.exists());
    }
}
