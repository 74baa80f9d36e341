use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Identifies a repository in the external revision service and retention store.
pub type RepositoryId = i64;

/// A commit, branch tip, or tag target, addressed by its commit identifier (sha).
pub type CommitId = String;

/// What kind of git object a [`ConfigurationPolicy`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GitObjectType {
    Commit,
    Branch,
    Tag,
}

/// Whether a policy applies to every repository or one in particular.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyScope {
    Global,
    /// Repository-scoped; the bound repository id.
    Repository(RepositoryId),
}

/// A declarative retention (or indexing) rule, bound to commits/branches/tags
/// matching a glob pattern.
///
/// Invariant: callers must ignore policies with `retention_enabled = false`
/// and must never compile a glob for `object_type = GitObjectType::Commit`
/// (the pattern is an exact commit identifier in that case).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationPolicy {
    pub id: i64,
    pub scope: PolicyScope,
    pub object_type: GitObjectType,
    /// Glob expression, or an exact commit id when `object_type = Commit`.
    pub pattern: String,
    pub retention_enabled: bool,
    /// `None` means indefinite retention.
    pub retention_duration: Option<Duration>,
    /// Only meaningful when `object_type = Branch`.
    pub retain_intermediate_commits: bool,
    /// Indexing-mode counterpart of `retention_duration`, read by the
    /// indexing [`crate::policies::Extractor`].
    pub index_commit_max_age: Option<Duration>,
    /// Indexing-mode counterpart of `retain_intermediate_commits`.
    pub index_intermediate_commits: bool,
}

impl ConfigurationPolicy {
    /// Builds a minimal retention-mode policy; indexing fields default to
    /// "disabled". Convenience for tests and for callers that only ever
    /// drive the retention extractor.
    pub fn retention(
        id: i64,
        scope: PolicyScope,
        object_type: GitObjectType,
        pattern: impl Into<String>,
        retention_duration: Option<Duration>,
        retain_intermediate_commits: bool,
    ) -> Self {
        Self {
            id,
            scope,
            object_type,
            pattern: pattern.into(),
            retention_enabled: true,
            retention_duration,
            retain_intermediate_commits,
            index_commit_max_age: None,
            index_intermediate_commits: false,
        }
    }
}
