//! The external retention store: lists repositories, policies, and uploads,
//! and persists per-upload protected/expired decisions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::{ConfigurationPolicy, Cursor, RepositoryId, Result, Upload, UploadId, UploadState};

#[async_trait]
pub trait RetentionStore: Send + Sync {
    /// Repositories not processed within `process_delay` of `now`, capped at
    /// `batch_size`.
    async fn select_repositories_for_retention(
        &self,
        now: DateTime<Utc>,
        batch_size: usize,
        process_delay: Duration,
    ) -> Result<Vec<RepositoryId>>;

    /// `(global, scoped)` configuration policies. The caller concatenates
    /// global before scoped, preserving each list's input order.
    async fn policies_for(
        &self,
        repo_id: RepositoryId,
    ) -> Result<(Vec<ConfigurationPolicy>, Vec<ConfigurationPolicy>)>;

    /// Completed uploads in `repo_id` not processed within `process_delay`
    /// of `now`, capped at `batch_size`.
    async fn uploads_in_repository(
        &self,
        repo_id: RepositoryId,
        now: DateTime<Utc>,
        batch_size: usize,
        process_delay: Duration,
    ) -> Result<Vec<Upload>>;

    /// Paginated set of commits from which `upload_id`'s symbols are
    /// reachable via git history.
    async fn commits_visible_to_upload(
        &self,
        upload_id: UploadId,
        page_size: usize,
        cursor: Option<Cursor>,
    ) -> Result<(Vec<String>, Option<Cursor>)>;

    /// Atomic decision write for one batch.
    async fn update_upload_retention(&self, protected_ids: &[UploadId], expired_ids: &[UploadId]) -> Result<()>;

    /// Bookkeeping for `process_delay`.
    async fn mark_repository_processed(&self, repo_id: RepositoryId, now: DateTime<Utc>) -> Result<()>;
}

pub type SharedRetentionStore = Arc<dyn RetentionStore>;

/// A single recorded call to [`RetentionStore::update_upload_retention`],
/// kept around so tests can assert writes never interleave uploads across
/// batches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionWrite {
    pub protected_ids: Vec<UploadId>,
    pub expired_ids: Vec<UploadId>,
}

/// An in-memory [`RetentionStore`] double, following this codebase's
/// `InMemory*Store` test-double convention.
#[derive(Debug, Default)]
pub struct InMemoryRetentionStore {
    inner: tokio::sync::Mutex<InMemoryRetentionStoreState>,
}

#[derive(Debug, Default)]
struct InMemoryRetentionStoreState {
    global_policies: Vec<ConfigurationPolicy>,
    policies_by_repository: HashMap<RepositoryId, Vec<ConfigurationPolicy>>,
    uploads_by_repository: HashMap<RepositoryId, Vec<Upload>>,
    /// upload id -> full (unpaginated) set of visible commits
    visible_commits: HashMap<UploadId, Vec<String>>,
    processed_repositories: Vec<RepositoryId>,
    writes: Vec<RetentionWrite>,
    /// Uploads already covered by an `update_upload_retention` write this
    /// pass. A real store would exclude these via its `process_delay`
    /// bookkeeping stamped as part of the same write; this double tracks it
    /// directly so `uploads_in_repository` pagination terminates.
    written_upload_ids: std::collections::HashSet<UploadId>,
}

impl InMemoryRetentionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_global_policies(&self, policies: Vec<ConfigurationPolicy>) {
        self.inner.lock().await.global_policies = policies;
    }

    pub async fn set_repository_policies(&self, repo_id: RepositoryId, policies: Vec<ConfigurationPolicy>) {
        self.inner.lock().await.policies_by_repository.insert(repo_id, policies);
    }

    pub async fn add_upload(&self, upload: Upload, visible_commits: Vec<String>) {
        let mut state = self.inner.lock().await;
        state.visible_commits.insert(upload.id, visible_commits);
        state.uploads_by_repository.entry(upload.repository_id).or_default().push(upload);
    }

    pub async fn writes(&self) -> Vec<RetentionWrite> {
        self.inner.lock().await.writes.clone()
    }

    pub async fn protected_ids(&self) -> Vec<UploadId> {
        let mut ids: Vec<_> = self
            .inner
            .lock()
            .await
            .writes
            .iter()
            .flat_map(|w| w.protected_ids.iter().copied())
            .collect();
        ids.sort_unstable();
        ids
    }

    pub async fn expired_ids(&self) -> Vec<UploadId> {
        let mut ids: Vec<_> = self
            .inner
            .lock()
            .await
            .writes
            .iter()
            .flat_map(|w| w.expired_ids.iter().copied())
            .collect();
        ids.sort_unstable();
        ids
    }

    pub async fn processed_repositories(&self) -> Vec<RepositoryId> {
        self.inner.lock().await.processed_repositories.clone()
    }
}

#[async_trait]
impl RetentionStore for InMemoryRetentionStore {
    async fn select_repositories_for_retention(
        &self,
        _now: DateTime<Utc>,
        batch_size: usize,
        _process_delay: Duration,
    ) -> Result<Vec<RepositoryId>> {
        let state = self.inner.lock().await;
        let mut repos: Vec<_> = state
            .policies_by_repository
            .keys()
            .copied()
            .chain(state.uploads_by_repository.keys().copied())
            .collect();
        repos.sort_unstable();
        repos.dedup();
        repos.truncate(batch_size);
        Ok(repos)
    }

    async fn policies_for(
        &self,
        repo_id: RepositoryId,
    ) -> Result<(Vec<ConfigurationPolicy>, Vec<ConfigurationPolicy>)> {
        let state = self.inner.lock().await;
        let scoped = state.policies_by_repository.get(&repo_id).cloned().unwrap_or_default();
        Ok((state.global_policies.clone(), scoped))
    }

    async fn uploads_in_repository(
        &self,
        repo_id: RepositoryId,
        _now: DateTime<Utc>,
        batch_size: usize,
        _process_delay: Duration,
    ) -> Result<Vec<Upload>> {
        let state = self.inner.lock().await;
        let mut uploads = state
            .uploads_by_repository
            .get(&repo_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|u| u.state == UploadState::Completed && !state.written_upload_ids.contains(&u.id))
            .collect::<Vec<_>>();
        uploads.truncate(batch_size);
        Ok(uploads)
    }

    async fn commits_visible_to_upload(
        &self,
        upload_id: UploadId,
        page_size: usize,
        cursor: Option<Cursor>,
    ) -> Result<(Vec<String>, Option<Cursor>)> {
        let state = self.inner.lock().await;
        let all = state.visible_commits.get(&upload_id).cloned().unwrap_or_default();

        let offset = match &cursor {
            Some(Cursor(raw)) => raw.parse::<usize>().unwrap_or(0),
            None => 0,
        };

        let page: Vec<_> = all.iter().skip(offset).take(page_size).cloned().collect();
        let next_offset = offset + page.len();
        let next_cursor = if next_offset < all.len() {
            Some(Cursor(next_offset.to_string()))
        } else {
            None
        };

        Ok((page, next_cursor))
    }

    async fn update_upload_retention(&self, protected_ids: &[UploadId], expired_ids: &[UploadId]) -> Result<()> {
        let mut state = self.inner.lock().await;
        state.written_upload_ids.extend(protected_ids.iter().copied());
        state.written_upload_ids.extend(expired_ids.iter().copied());
        state.writes.push(RetentionWrite {
            protected_ids: protected_ids.to_vec(),
            expired_ids: expired_ids.to_vec(),
        });
        Ok(())
    }

    async fn mark_repository_processed(&self, repo_id: RepositoryId, _now: DateTime<Utc>) -> Result<()> {
        self.inner.lock().await.processed_repositories.push(repo_id);
        Ok(())
    }
}
