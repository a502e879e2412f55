use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchematicError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SchematicError {
    /// Keeps the whole context chain of an `anyhow` error from the client crate.
    pub(crate) fn upstream(context: &str, err: anyhow::Error) -> Self {
        SchematicError::Upstream(format!("{context}: {err:#}"))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SchematicError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SchematicError>;
