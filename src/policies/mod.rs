//! Policy matching: selecting which commits, branches, and tags a
//! configuration policy set covers.

mod matcher;

pub use matcher::PolicyMatcher;

use chrono::Duration;

use crate::domain::ConfigurationPolicy;

/// A pure field selector over a [`ConfigurationPolicy`], returning
/// `(max_age, include_intermediate_commits)`.
///
/// The matcher is reused for two deployment modes that differ only in which
/// pair of fields they read; both are plain `fn` items convertible to this
/// function-pointer type, so no trait object is needed.
pub type Extractor = fn(&ConfigurationPolicy) -> (Option<Duration>, bool);

/// Reads `retention_duration` / `retain_intermediate_commits`.
pub fn retention_extractor(policy: &ConfigurationPolicy) -> (Option<Duration>, bool) {
    (policy.retention_duration, policy.retain_intermediate_commits)
}

/// Reads `index_commit_max_age` / `index_intermediate_commits`.
pub fn indexing_extractor(policy: &ConfigurationPolicy) -> (Option<Duration>, bool) {
    (policy.index_commit_max_age, policy.index_intermediate_commits)
}
