use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExpirerError>;

/// Errors surfaced by the policy matcher and the expiration driver.
///
/// `NotFound` is deliberately absent here: a missing commit is represented as
/// `Ok(None)` from [`crate::revision::RevisionProvider::commit_date`], since it
/// is an expected outcome during commit-policy resolution, not a failure.
#[derive(Error, Debug)]
pub enum ExpirerError {
    #[error("failed to compile glob pattern `{pattern}` in configuration policy {policy_id}")]
    InvalidPattern { pattern: String, policy_id: i64 },

    #[error("revision provider unavailable: {0}")]
    RevisionUnavailable(#[source] anyhow::Error),

    #[error("retention store unavailable: {0}")]
    StorageUnavailable(#[source] anyhow::Error),

    #[error("pass cancelled")]
    Cancelled,

    #[error("failed to read configuration file")]
    Io(#[source] std::io::Error),

    #[error("failed to parse configuration")]
    TomlDe(#[source] toml::de::Error),
}

impl ExpirerError {
    pub fn revision_unavailable<E: Into<anyhow::Error>>(err: E) -> Self {
        ExpirerError::RevisionUnavailable(err.into())
    }

    pub fn storage_unavailable<E: Into<anyhow::Error>>(err: E) -> Self {
        ExpirerError::StorageUnavailable(err.into())
    }
}
