//! The external revision service: commit dates, ref descriptions, and
//! branch-membership resolution. This is an adapter boundary — the engine
//! never caches these calls across repositories.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{CommitId, RefDescription, RepositoryId, Result};

/// Capabilities the matcher and driver rely on from the underlying git
/// hosting / revision service.
#[async_trait]
pub trait RevisionProvider: Send + Sync {
    /// All branches and tags at once, keyed by the commit they point to.
    async fn ref_descriptions(
        &self,
        repo_id: RepositoryId,
    ) -> Result<HashMap<CommitId, Vec<RefDescription>>>;

    /// `Ok(None)` is the well-defined "commit does not exist" outcome; it is
    /// not an error and must not be mistaken for one.
    async fn commit_date(&self, repo_id: RepositoryId, commit: &str) -> Result<Option<DateTime<Utc>>>;

    /// Commits reachable from `branch` that do not appear on any other
    /// branch, optionally filtered to those created at or after `min_date`.
    async fn commits_unique_to_branch(
        &self,
        repo_id: RepositoryId,
        branch: &str,
        is_default_branch: bool,
        min_date: Option<DateTime<Utc>>,
    ) -> Result<HashMap<CommitId, DateTime<Utc>>>;
}

pub type SharedRevisionProvider = Arc<dyn RevisionProvider>;

/// An in-memory [`RevisionProvider`] double for tests, following the
/// `InMemory*` test-double convention used throughout this codebase's
/// storage adapters.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRevisionProvider {
    refs_by_repo: HashMap<RepositoryId, HashMap<CommitId, Vec<RefDescription>>>,
    commit_dates: HashMap<(RepositoryId, String), DateTime<Utc>>,
    /// branch -> (commit -> created date), keyed by (repo, branch)
    branch_membership: HashMap<(RepositoryId, String), HashMap<CommitId, DateTime<Utc>>>,
    /// Repositories whose `commits_unique_to_branch` call should fail,
    /// simulating a transient revision-service outage (§8 scenario 4).
    failing_repos: std::collections::HashSet<RepositoryId>,
}

impl InMemoryRevisionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_ref(&mut self, repo_id: RepositoryId, commit: impl Into<CommitId>, desc: RefDescription) {
        self.refs_by_repo
            .entry(repo_id)
            .or_default()
            .entry(commit.into())
            .or_default()
            .push(desc);
    }

    pub fn set_commit_date(&mut self, repo_id: RepositoryId, commit: impl Into<String>, date: DateTime<Utc>) {
        self.commit_dates.insert((repo_id, commit.into()), date);
    }

    pub fn set_branch_membership(
        &mut self,
        repo_id: RepositoryId,
        branch: impl Into<String>,
        commits: HashMap<CommitId, DateTime<Utc>>,
    ) {
        self.branch_membership.insert((repo_id, branch.into()), commits);
    }

    pub fn fail_branch_membership_for(&mut self, repo_id: RepositoryId) {
        self.failing_repos.insert(repo_id);
    }
}

#[async_trait]
impl RevisionProvider for InMemoryRevisionProvider {
    async fn ref_descriptions(
        &self,
        repo_id: RepositoryId,
    ) -> Result<HashMap<CommitId, Vec<RefDescription>>> {
        Ok(self.refs_by_repo.get(&repo_id).cloned().unwrap_or_default())
    }

    async fn commit_date(&self, repo_id: RepositoryId, commit: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.commit_dates.get(&(repo_id, commit.to_string())).copied())
    }

    async fn commits_unique_to_branch(
        &self,
        repo_id: RepositoryId,
        branch: &str,
        _is_default_branch: bool,
        min_date: Option<DateTime<Utc>>,
    ) -> Result<HashMap<CommitId, DateTime<Utc>>> {
        if self.failing_repos.contains(&repo_id) {
            return Err(crate::domain::ExpirerError::revision_unavailable(anyhow::anyhow!(
                "commits_unique_to_branch unavailable for repo {repo_id}"
            )));
        }

        let commits = self
            .branch_membership
            .get(&(repo_id, branch.to_string()))
            .cloned()
            .unwrap_or_default();

        Ok(match min_date {
            Some(min_date) => commits.into_iter().filter(|(_, date)| *date >= min_date).collect(),
            None => commits,
        })
    }
}
