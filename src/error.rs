//! Unified error type.

use std::path::PathBuf;

/// The error type returned by stiff's fallible operations.
///
/// Everything here happens before the first request is served: a bad
/// configuration, an unreadable public directory, or a socket that cannot be
/// bound. Request-time failures (404, 500) are expressed as HTTP
/// [`Response`](crate::Response) values, never as `Error`s.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid route {0:?}, missing leading slash")]
    InvalidRoute(String),

    #[error("invalid extension {0:?}, missing dot")]
    InvalidExtension(String),

    #[error("invalid header {name:?} in route {route:?}")]
    InvalidHeader { route: String, name: String },

    #[error("failed to index {}: {source}", path.display())]
    Build {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn build(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Build { path: path.into(), source }
    }
}
