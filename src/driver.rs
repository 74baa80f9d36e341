//! The outer loop of retention: the expiration driver iterates due
//! repositories and uploads in bounded batches, consults the policy
//! matcher, and persists per-upload protected/expired decisions.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{BranchVisibilityCache, CommitVerdict};
use crate::config::ExpirerConfig;
use crate::domain::{CommitId, ExpirerError, PolicyMatch, RepositoryId, Result, RetentionDecision, Upload};
use crate::observability::ObservationSink;
use crate::policies::{retention_extractor, PolicyMatcher};
use crate::revision::SharedRevisionProvider;
use crate::store::SharedRetentionStore;

/// Iterates repositories and uploads due for a retention pass, classifying
/// each upload as protected or expired and writing the decision back.
///
/// `Handle` (the [`ExpirationDriver::handle`] method) is the engine's sole
/// entry point; everything else in this crate exists to serve one call to
/// it.
pub struct ExpirationDriver {
    retention_store: SharedRetentionStore,
    revision_provider: SharedRevisionProvider,
    observation_sink: Arc<dyn ObservationSink>,
    config: ExpirerConfig,
}

impl ExpirationDriver {
    pub fn new(
        retention_store: SharedRetentionStore,
        revision_provider: SharedRevisionProvider,
        observation_sink: Arc<dyn ObservationSink>,
        config: ExpirerConfig,
    ) -> Self {
        Self {
            retention_store,
            revision_provider,
            observation_sink,
            config,
        }
    }

    /// Runs one retention pass over a single batch of due repositories
    /// (`ExpirerConfig::repository_batch_size` of them at most). Callers
    /// drive repeated passes on their own schedule; the driver itself keeps
    /// no state across calls beyond what `RetentionStore` persists.
    pub async fn handle(&self, now: DateTime<Utc>, cancellation: &CancellationToken) -> Result<()> {
        let repo_ids = self
            .retention_store
            .select_repositories_for_retention(
                now,
                self.config.repository_batch_size,
                self.config.repository_process_delay(),
            )
            .await?;

        info!(repository_count = repo_ids.len(), "selected repositories for retention pass");

        for repo_id in repo_ids {
            if cancellation.is_cancelled() {
                info!("retention pass cancelled between repositories");
                return Err(ExpirerError::Cancelled);
            }

            match self.process_repository(repo_id, now, cancellation).await {
                Ok(()) => {
                    self.observation_sink.record_repo_scanned();
                    self.retention_store.mark_repository_processed(repo_id, now).await?;
                }
                Err(ExpirerError::RevisionUnavailable(source)) => {
                    self.observation_sink.record_matcher_error();
                    warn!(repository_id = repo_id, error = %source, "revision provider unavailable, skipping repository this pass");
                }
                Err(ExpirerError::InvalidPattern { pattern, policy_id }) => {
                    self.observation_sink.record_matcher_error();
                    warn!(repository_id = repo_id, pattern, policy_id, "invalid configuration policy pattern, skipping repository this pass");
                }
                Err(other) => return Err(other),
            }
        }

        Ok(())
    }

    async fn process_repository(&self, repo_id: RepositoryId, now: DateTime<Utc>, cancellation: &CancellationToken) -> Result<()> {
        let (global, scoped) = self.retention_store.policies_for(repo_id).await?;
        let mut policies = global;
        policies.extend(scoped);

        let matcher = PolicyMatcher::new(self.revision_provider.clone(), retention_extractor, true, false);
        let matches = matcher.commits_described_by_policy(repo_id, &policies, now).await?;

        let verdicts = self.build_verdict_table(&matches, now);
        debug!(repository_id = repo_id, commits_matched = verdicts.len(), "built retention verdict table");

        loop {
            let uploads = self
                .retention_store
                .uploads_in_repository(
                    repo_id,
                    now,
                    self.config.upload_batch_size,
                    self.config.upload_process_delay(),
                )
                .await?;

            if uploads.is_empty() {
                break;
            }

            let mut protected_ids = Vec::new();
            let mut expired_ids = Vec::new();

            for upload in &uploads {
                match self.classify_upload(upload, &verdicts).await? {
                    RetentionDecision::Protected => protected_ids.push(upload.id),
                    RetentionDecision::Expired => expired_ids.push(upload.id),
                }
            }

            self.retention_store.update_upload_retention(&protected_ids, &expired_ids).await?;

            self.observation_sink.record_uploads_scanned(uploads.len() as u64);
            self.observation_sink.record_uploads_protected(protected_ids.len() as u64);
            self.observation_sink.record_uploads_expired(expired_ids.len() as u64);

            if cancellation.is_cancelled() {
                info!(repository_id = repo_id, "retention pass cancelled between upload batches");
                return Err(ExpirerError::Cancelled);
            }
        }

        Ok(())
    }

    /// Collapses the matcher's commit→matches mapping into one verdict per
    /// commit, writing through to a size-bounded [`BranchVisibilityCache`]
    /// alongside the unbounded table that actually backs classification
    /// (§4.F: the cache's eviction is not load-bearing for correctness).
    fn build_verdict_table(&self, matches: &HashMap<CommitId, Vec<PolicyMatch>>, now: DateTime<Utc>) -> HashMap<CommitId, CommitVerdict> {
        let mut cache = BranchVisibilityCache::new(self.config.branches_cache_max_keys);
        let mut verdicts = HashMap::with_capacity(matches.len());

        for (commit, policy_matches) in matches {
            let verdict = verdict_for_matches(policy_matches, now);
            cache.insert(commit.clone(), verdict);
            verdicts.insert(commit.clone(), verdict);
        }

        verdicts
    }

    /// Pages through `upload`'s visible commits, stopping as soon as one is
    /// found whose verdict still protects it.
    async fn classify_upload(&self, upload: &Upload, verdicts: &HashMap<CommitId, CommitVerdict>) -> Result<RetentionDecision> {
        let mut cursor = None;

        loop {
            let (commits, next_cursor) = self
                .retention_store
                .commits_visible_to_upload(upload.id, self.config.commit_batch_size, cursor)
                .await?;

            for commit in &commits {
                if let Some(verdict) = verdicts.get(commit) {
                    if commit_protects_upload(*verdict, upload) {
                        return Ok(RetentionDecision::Protected);
                    }
                }
            }

            match next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(RetentionDecision::Expired),
            }
        }
    }
}

fn verdict_for_matches(matches: &[PolicyMatch], now: DateTime<Utc>) -> CommitVerdict {
    if matches.iter().any(|m| m.policy_duration.is_none()) {
        return CommitVerdict::ProtectForever;
    }

    match matches.iter().filter_map(|m| m.policy_duration).max() {
        Some(duration) => CommitVerdict::ProtectIfUploadedAtOrAfter(now - duration),
        None => CommitVerdict::NoMatch,
    }
}

fn commit_protects_upload(verdict: CommitVerdict, upload: &Upload) -> bool {
    match verdict {
        CommitVerdict::ProtectForever => true,
        CommitVerdict::ProtectIfUploadedAtOrAfter(cutoff) => upload.uploaded_at >= cutoff,
        CommitVerdict::NoMatch => false,
    }
}
