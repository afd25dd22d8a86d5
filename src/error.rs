use thiserror::Error;

/// Failures surfaced by the store and the domain repository.
///
/// Validation errors carry a human-readable message and are the only
/// variant callers are expected to branch on; everything else is converted
/// to a `{success: false, error}` envelope at the bridge.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("database is closed")]
    Closed,

    #[error("database lock poisoned")]
    Lock,
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
