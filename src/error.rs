//! Error kinds surfaced by a digest run.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The single error a digest run returns. Per-file read failures and walk failures both land
/// here; whichever the aggregator sees first wins.
#[derive(Error, Debug)]
pub enum DigestError {
    /// A directory could not be listed (or the root is missing).
    #[error("walk failed at {}: {source}", display_opt(.path))]
    Walk {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// A discovered file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cancelled by the caller with no underlying fault.
    #[error("digest run was cancelled")]
    Cancelled,

    #[error("digest run timed out after {0:?}")]
    TimedOut(Duration),

    #[error("configuration error: {0}")]
    Config(String),

    /// A pipeline thread panicked.
    #[error("{0} thread panicked")]
    Panicked(&'static str),
}

impl DigestError {
    pub fn is_walk(&self) -> bool {
        matches!(self, DigestError::Walk { .. })
    }

    pub fn is_read(&self) -> bool {
        matches!(self, DigestError::Read { .. })
    }

    /// Path the error is attached to, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            DigestError::Walk { path, .. } => path.as_deref(),
            DigestError::Read { path, .. } => Some(path),
            _ => None,
        }
    }
}

fn display_opt(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

/// Convert a walkdir error into a [`DigestError::Walk`].
impl From<walkdir::Error> for DigestError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from);
        let source = err
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
        DigestError::Walk { path, source }
    }
}

/// Convert a jwalk error into a [`DigestError::Walk`].
impl From<jwalk::Error> for DigestError {
    fn from(err: jwalk::Error) -> Self {
        let path = err.path().map(PathBuf::from);
        let source = std::io::Error::other(err.to_string());
        DigestError::Walk { path, source }
    }
}
