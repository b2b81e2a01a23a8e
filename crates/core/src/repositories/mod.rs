//! On-disk record stores.
//!
//! Users and patients each live under their own sharded root:
//!
//! ```text
//! patient_data/
//!   users/<s1>/<s2>/<uuid>/user.yaml
//!   patients/<s1>/<s2>/<uuid>/patient.yaml
//!                             files/sha256/...   # identification documents, git-ignored
//!                             .git/
//! ```

pub mod patients;
pub mod users;

use std::fs;
use std::path::{Path, PathBuf};

/// Every `<s1>/<s2>/<uuid>/<file_name>` under `root` that exists as a file.
///
/// Unreadable shard directories are skipped.
pub(crate) fn sharded_files(root: &Path, file_name: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();

    let s1_iter = match fs::read_dir(root) {
        Ok(it) => it,
        Err(_) => return found,
    };
    for s1 in s1_iter.flatten() {
        let s1_path = s1.path();
        if !s1_path.is_dir() {
            continue;
        }

        let s2_iter = match fs::read_dir(&s1_path) {
            Ok(it) => it,
            Err(_) => continue,
        };
        for s2 in s2_iter.flatten() {
            let s2_path = s2.path();
            if !s2_path.is_dir() {
                continue;
            }

            let id_iter = match fs::read_dir(&s2_path) {
                Ok(it) => it,
                Err(_) => continue,
            };
            for id_ent in id_iter.flatten() {
                let candidate = id_ent.path().join(file_name);
                if candidate.is_file() {
                    found.push(candidate);
                }
            }
        }
    }

    found.sort();
    found
}
