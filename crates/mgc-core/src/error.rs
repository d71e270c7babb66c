use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid pattern {pattern:?}: {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("Invalid replacement template {template:?}: {reason}")]
    Template { template: String, reason: String },

    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    AtPath {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Fatal(#[from] FatalError),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Invariant violations. These never describe a bad input file; they mean the
/// run can no longer guarantee consistent replacements and must stop.
///
/// Messages never carry the canonical (secret) value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    #[error("replacement space exhausted: template {template:?} allows at most {max} distinct values")]
    GeneratorExhausted { template: String, max: u64 },

    #[error("replacement tracker conflict: value already replaced with {existing:?}, refusing {attempted:?}")]
    TrackerConflict { existing: String, attempted: String },

    #[error("replacement tracker already initialized or in use")]
    TrackerAlreadyInitialized,
}

impl Error {
    /// I/O failure on a specific file.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::File {
            path: path.into(),
            source,
        }
    }

    /// Attach the offending path to an error raised while processing it.
    pub fn at_path(path: impl Into<PathBuf>, source: Error) -> Self {
        Error::AtPath {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Fatal(_) => true,
            Error::AtPath { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
