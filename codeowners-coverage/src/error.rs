use std::{io, path::PathBuf};

use thiserror::Error;

use crate::walk::WalkError;

/// Errors that abort loading a rules file or generating a coverage report.
#[derive(Debug, Error)]
pub enum Error {
    #[error("line {line}: invalid pattern `{pattern}`: {source}")]
    PatternCompile {
        line: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("no {file_name} found in any of: {}", candidates.join(", "))]
    RulesFileNotFound {
        file_name: String,
        candidates: Vec<String>,
    },

    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unsupported report format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
