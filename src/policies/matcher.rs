//! Given a repository and an ordered policy set, resolves which commits are
//! described by which policies.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::domain::{CommitId, ConfigurationPolicy, GitObjectType, PolicyMatch, RefType, RepositoryId, Result};
use crate::patterns::PatternIndex;
use crate::revision::SharedRevisionProvider;

use super::Extractor;

/// Resolves the commit→matches mapping described in the data model for one
/// repository, given a policy set and a field [`Extractor`].
///
/// The same matcher serves two deployment modes: retention
/// (`include_tip_of_default_branch = true`, `filter_by_created_date =
/// false`) and indexing (`filter_by_created_date = true`); they differ only
/// in the extractor and these two flags, never in algorithm.
pub struct PolicyMatcher {
    revision_provider: SharedRevisionProvider,
    extractor: Extractor,
    include_tip_of_default_branch: bool,
    filter_by_created_date: bool,
}

/// Per-branch bookkeeping while walking refs, before the single
/// `commits_unique_to_branch` call per branch.
struct BranchRequest {
    is_default_branch: bool,
    /// policy id -> duration (`None` = indefinite) for every policy that
    /// asked for intermediate-commit expansion on this branch.
    requesting_policies: HashMap<i64, Option<Duration>>,
}

impl PolicyMatcher {
    pub fn new(
        revision_provider: SharedRevisionProvider,
        extractor: Extractor,
        include_tip_of_default_branch: bool,
        filter_by_created_date: bool,
    ) -> Self {
        Self {
            revision_provider,
            extractor,
            include_tip_of_default_branch,
            filter_by_created_date,
        }
    }

    pub async fn commits_described_by_policy(
        &self,
        repo_id: RepositoryId,
        policies: &[ConfigurationPolicy],
        now: DateTime<Utc>,
    ) -> Result<HashMap<CommitId, Vec<PolicyMatch>>> {
        let policies: Vec<&ConfigurationPolicy> = policies.iter().filter(|p| p.retention_enabled).collect();

        if policies.is_empty() && !self.include_tip_of_default_branch {
            return Ok(HashMap::new());
        }

        let owned_policies: Vec<ConfigurationPolicy> = policies.iter().map(|p| (*p).clone()).collect();
        let pattern_index = PatternIndex::compile(&owned_policies)?;

        let mut matches: HashMap<CommitId, Vec<PolicyMatch>> = HashMap::new();
        let mut branch_requests: HashMap<String, BranchRequest> = HashMap::new();

        let refs = self.revision_provider.ref_descriptions(repo_id).await?;

        for (commit, descriptions) in &refs {
            for desc in descriptions {
                match desc.ref_type {
                    RefType::Tag => {
                        for policy in policies.iter().copied() {
                            if policy.object_type != GitObjectType::Tag {
                                continue;
                            }
                            if !pattern_index.matches(&policy.pattern, &desc.name) {
                                continue;
                            }

                            let (duration, _) = (self.extractor)(policy);
                            if self.filter_by_created_date && exceeds_max_age(now, desc.created_date, duration) {
                                continue;
                            }

                            push_match(&mut matches, commit, PolicyMatch::new(desc.name.clone(), Some(policy.id), duration));
                        }
                    }
                    RefType::Branch => {
                        if self.include_tip_of_default_branch && desc.is_default_branch {
                            push_match(&mut matches, commit, PolicyMatch::new(desc.name.clone(), None, None));
                        }

                        for policy in policies.iter().copied() {
                            if policy.object_type != GitObjectType::Branch {
                                continue;
                            }
                            if !pattern_index.matches(&policy.pattern, &desc.name) {
                                continue;
                            }

                            let (duration, include_intermediate) = (self.extractor)(policy);
                            if self.filter_by_created_date && exceeds_max_age(now, desc.created_date, duration) {
                                continue;
                            }

                            push_match(&mut matches, commit, PolicyMatch::new(desc.name.clone(), Some(policy.id), duration));

                            if include_intermediate {
                                let request = branch_requests.entry(desc.name.clone()).or_insert_with(|| BranchRequest {
                                    is_default_branch: desc.is_default_branch,
                                    requesting_policies: HashMap::new(),
                                });
                                request.is_default_branch |= desc.is_default_branch;
                                request.requesting_policies.insert(policy.id, duration);
                            }
                        }
                    }
                }
            }
        }

        for (branch_name, request) in &branch_requests {
            let widest_duration = if request.requesting_policies.values().any(|d| d.is_none()) {
                None
            } else if !self.filter_by_created_date {
                None
            } else {
                request.requesting_policies.values().filter_map(|d| *d).max()
            };

            let min_date = widest_duration.map(|age| now - age);

            let members = self
                .revision_provider
                .commits_unique_to_branch(repo_id, branch_name, request.is_default_branch, min_date)
                .await?;

            for (commit, created_date) in members {
                for (&policy_id, &duration) in &request.requesting_policies {
                    let already_matched = matches
                        .get(&commit)
                        .is_some_and(|ms| ms.iter().any(|m| m.policy_id == Some(policy_id)));
                    if already_matched {
                        continue;
                    }

                    if self.filter_by_created_date && exceeds_max_age(now, created_date, duration) {
                        continue;
                    }

                    push_match(&mut matches, &commit, PolicyMatch::new(branch_name.clone(), Some(policy_id), duration));
                }
            }
        }

        for policy in policies.iter().copied().filter(|p| p.object_type == GitObjectType::Commit) {
            let Some(commit_date) = self.revision_provider.commit_date(repo_id, &policy.pattern).await? else {
                continue;
            };

            let (duration, _) = (self.extractor)(policy);
            if self.filter_by_created_date && exceeds_max_age(now, commit_date, duration) {
                continue;
            }

            push_match(
                &mut matches,
                &policy.pattern,
                PolicyMatch::new(policy.pattern.clone(), Some(policy.id), duration),
            );
        }

        Ok(matches)
    }
}

fn exceeds_max_age(now: DateTime<Utc>, created_date: DateTime<Utc>, max_age: Option<Duration>) -> bool {
    match max_age {
        Some(max_age) => now - created_date > max_age,
        None => false,
    }
}

fn push_match(matches: &mut HashMap<CommitId, Vec<PolicyMatch>>, commit: &str, m: PolicyMatch) {
    matches.entry(commit.to_string()).or_default().push(m);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PolicyScope, RefDescription};
    use crate::policies::{indexing_extractor, retention_extractor};
    use crate::revision::InMemoryRevisionProvider;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn tag_policy(id: i64, pattern: &str, duration: Option<Duration>) -> ConfigurationPolicy {
        ConfigurationPolicy::retention(id, PolicyScope::Global, GitObjectType::Tag, pattern, duration, false)
    }

    fn branch_policy(id: i64, pattern: &str, duration: Option<Duration>, retain_intermediate: bool) -> ConfigurationPolicy {
        ConfigurationPolicy::retention(id, PolicyScope::Global, GitObjectType::Branch, pattern, duration, retain_intermediate)
    }

    #[tokio::test]
    async fn empty_policies_without_default_branch_inclusion_returns_empty() {
        let provider = Arc::new(InMemoryRevisionProvider::new());
        let matcher = PolicyMatcher::new(provider, retention_extractor, false, false);
        let result = matcher.commits_described_by_policy(50, &[], now()).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn empty_policies_with_default_branch_inclusion_yields_only_implicit_tip_match() {
        let mut provider = InMemoryRevisionProvider::new();
        provider.add_ref(50, "deadbeef11", RefDescription::branch("main", true, now()));
        let provider = Arc::new(provider);

        let matcher = PolicyMatcher::new(provider, retention_extractor, true, false);
        let result = matcher.commits_described_by_policy(50, &[], now()).await.unwrap();

        let matches = result.get("deadbeef11").expect("tip commit present");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0], PolicyMatch::new("main", None, None));
    }

    #[tokio::test]
    async fn tag_policy_matches_pattern_and_emits_duration() {
        let mut provider = InMemoryRevisionProvider::new();
        provider.add_ref(50, "deadbeef04", RefDescription::tag("v1.2.3", now()));
        let provider = Arc::new(provider);

        let policies = vec![tag_policy(1, "v1.*", Some(Duration::days(180)))];
        let matcher = PolicyMatcher::new(provider, retention_extractor, false, false);
        let result = matcher.commits_described_by_policy(50, &policies, now()).await.unwrap();

        let matches = result.get("deadbeef04").unwrap();
        assert_eq!(matches, &vec![PolicyMatch::new("v1.2.3", Some(1), Some(Duration::days(180)))]);
    }

    #[tokio::test]
    async fn retention_mode_yields_tip_match_for_aged_out_ref() {
        let old_date = now() - Duration::days(9 * 30);
        let mut provider = InMemoryRevisionProvider::new();
        provider.add_ref(50, "deadbeef05", RefDescription::tag("v1.2.2", old_date));
        let provider = Arc::new(provider);

        let policies = vec![tag_policy(1, "v1.*", Some(Duration::days(180)))];
        let matcher = PolicyMatcher::new(provider, retention_extractor, false, false);
        let result = matcher.commits_described_by_policy(50, &policies, now()).await.unwrap();

        assert!(result.contains_key("deadbeef05"));
    }

    #[tokio::test]
    async fn indexing_mode_drops_aged_out_ref_that_retention_mode_would_keep() {
        let old_date = now() - Duration::days(9 * 30);
        let mut provider = InMemoryRevisionProvider::new();
        provider.add_ref(50, "deadbeef05", RefDescription::tag("v1.2.2", old_date));
        let provider = Arc::new(provider);

        let mut policy = tag_policy(1, "v1.*", None);
        policy.index_commit_max_age = Some(Duration::hours(10));
        let policies = vec![policy];

        let matcher = PolicyMatcher::new(provider, indexing_extractor, false, true);
        let result = matcher.commits_described_by_policy(50, &policies, now()).await.unwrap();
        assert!(!result.contains_key("deadbeef05"));
    }

    #[tokio::test]
    async fn branch_tip_and_intermediate_commits_are_both_matched_without_duplication() {
        let mut provider = InMemoryRevisionProvider::new();
        provider.add_ref(50, "deadbeef07", RefDescription::branch("ef/feature-x", false, now()));
        provider.set_branch_membership(
            50,
            "ef/feature-x",
            HashMap::from([("deadbeef07".to_string(), now()), ("deadbeef08".to_string(), now())]),
        );
        let provider = Arc::new(provider);

        let policies = vec![branch_policy(1, "ef/*", Some(Duration::days(365 * 2)), true)];
        let matcher = PolicyMatcher::new(provider, retention_extractor, false, false);
        let result = matcher.commits_described_by_policy(50, &policies, now()).await.unwrap();

        assert_eq!(result.get("deadbeef07").unwrap().len(), 1, "tip must not be duplicated by membership resolution");
        assert_eq!(result.get("deadbeef08").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn disabling_intermediate_commits_drops_non_tip_matches() {
        let mut provider = InMemoryRevisionProvider::new();
        provider.add_ref(50, "deadbeef07", RefDescription::branch("ef/feature-x", false, now()));
        let provider = Arc::new(provider);

        let policies = vec![branch_policy(1, "ef/*", Some(Duration::days(365 * 2)), false)];
        let matcher = PolicyMatcher::new(provider, retention_extractor, false, false);
        let result = matcher.commits_described_by_policy(50, &policies, now()).await.unwrap();

        assert!(result.contains_key("deadbeef07"));
        assert!(!result.contains_key("deadbeef08"));
    }

    #[tokio::test]
    async fn commit_policy_for_nonexistent_commit_is_silently_omitted() {
        let provider = Arc::new(InMemoryRevisionProvider::new());
        let policies = vec![ConfigurationPolicy::retention(
            1,
            PolicyScope::Repository(53),
            GitObjectType::Commit,
            "deadbeef13",
            Some(Duration::days(1)),
            false,
        )];
        let matcher = PolicyMatcher::new(provider, retention_extractor, false, false);
        let result = matcher.commits_described_by_policy(53, &policies, now()).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn commit_policy_matches_existing_commit() {
        let mut provider = InMemoryRevisionProvider::new();
        provider.set_commit_date(53, "deadbeef13", now());
        let provider = Arc::new(provider);

        let policies = vec![ConfigurationPolicy::retention(
            1,
            PolicyScope::Repository(53),
            GitObjectType::Commit,
            "deadbeef13",
            Some(Duration::days(1)),
            false,
        )];
        let matcher = PolicyMatcher::new(provider, retention_extractor, false, false);
        let result = matcher.commits_described_by_policy(53, &policies, now()).await.unwrap();

        assert_eq!(result.get("deadbeef13").unwrap(), &vec![PolicyMatch::new("deadbeef13", Some(1), Some(Duration::days(1)))]);
    }

    #[tokio::test]
    async fn branch_membership_failure_propagates_as_revision_unavailable() {
        let mut provider = InMemoryRevisionProvider::new();
        provider.add_ref(50, "deadbeef07", RefDescription::branch("ef/feature-x", false, now()));
        provider.fail_branch_membership_for(50);
        let provider = Arc::new(provider);

        let policies = vec![branch_policy(1, "ef/*", None, true)];
        let matcher = PolicyMatcher::new(provider, retention_extractor, false, false);
        let err = matcher.commits_described_by_policy(50, &policies, now()).await.unwrap_err();

        assert!(matches!(err, crate::domain::ExpirerError::RevisionUnavailable(_)));
    }
}
