use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Configuration,
    SourceMissing,
    UnknownId,
    FilesystemOperation,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Configuration, message)
    }

    pub fn unknown_id(id: u64) -> Self {
        Self::new(CoreErrorCode::UnknownId, format!("no archived entry with id {id}"))
    }

    pub(crate) fn filesystem(action: &str, path: &Path, err: io::Error) -> Self {
        Self::new(
            CoreErrorCode::FilesystemOperation,
            format!("failed to {action} {}: {err}", path.display()),
        )
    }
}
