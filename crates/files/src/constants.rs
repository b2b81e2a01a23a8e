/// Name of the gitignored folder that holds binary files inside a repository.
pub const FILES_FOLDER_NAME: &str = "files";

/// Hash algorithm folder under [`FILES_FOLDER_NAME`].
pub const HASH_ALGORITHM: &str = "sha256";
