use thiserror::Error;

/// Filesystem errors for the app's own directories.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory: {0}")]
    DirectoryError(String),
}

impl StorageError {
    pub fn directory(msg: impl Into<String>) -> Self {
        StorageError::DirectoryError(msg.into())
    }
}
