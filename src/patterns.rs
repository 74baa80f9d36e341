//! Precompiled glob patterns for matching branch and tag names against
//! [`ConfigurationPolicy`] patterns.

use std::collections::HashMap;

use glob::Pattern;

use crate::domain::{ConfigurationPolicy, ExpirerError, GitObjectType, Result};

/// A compiled index from pattern string to matcher, built once per policy
/// set and shared by every ref the [`crate::policies::PolicyMatcher`]
/// processes.
///
/// Patterns for `GitObjectType::Commit` policies are never compiled: a
/// commit policy's pattern is an exact commit id, matched by direct
/// comparison elsewhere.
pub struct PatternIndex {
    compiled: HashMap<String, Pattern>,
}

impl PatternIndex {
    /// Compiles every distinct non-commit pattern in `policies`. Patterns
    /// that already appear in the index (by string equality) are compiled
    /// only once; first occurrence wins.
    pub fn compile(policies: &[ConfigurationPolicy]) -> Result<Self> {
        let mut compiled = HashMap::with_capacity(policies.len());

        for policy in policies {
            if policy.object_type == GitObjectType::Commit {
                continue;
            }
            if compiled.contains_key(&policy.pattern) {
                continue;
            }

            let pattern = Pattern::new(&policy.pattern).map_err(|_| ExpirerError::InvalidPattern {
                pattern: policy.pattern.clone(),
                policy_id: policy.id,
            })?;
            compiled.insert(policy.pattern.clone(), pattern);
        }

        Ok(Self { compiled })
    }

    /// Returns whether `name` matches the compiled `pattern`.
    ///
    /// Precondition: `pattern` was present in the policy set this index was
    /// built from. Calling this with a pattern the index never saw is a
    /// caller bug, not a matchable-data condition — it panics rather than
    /// silently treating the pattern as match-all.
    pub fn matches(&self, pattern: &str, name: &str) -> bool {
        self.compiled
            .get(pattern)
            .unwrap_or_else(|| panic!("pattern `{pattern}` was never compiled into this index"))
            .matches(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PolicyScope;

    fn policy(id: i64, object_type: GitObjectType, pattern: &str) -> ConfigurationPolicy {
        ConfigurationPolicy::retention(id, PolicyScope::Global, object_type, pattern, None, false)
    }

    #[test]
    fn compiles_branch_and_tag_patterns() {
        let policies = vec![
            policy(1, GitObjectType::Branch, "ef/*"),
            policy(2, GitObjectType::Tag, "v1.*"),
        ];
        let index = PatternIndex::compile(&policies).unwrap();

        assert!(index.matches("ef/*", "ef/feature-x"));
        assert!(!index.matches("ef/*", "develop"));
        assert!(index.matches("v1.*", "v1.2.3"));
    }

    #[test]
    fn skips_commit_type_policies() {
        let policies = vec![policy(1, GitObjectType::Commit, "deadbeef13")];
        let index = PatternIndex::compile(&policies).unwrap();
        assert!(index.compiled.is_empty());
    }

    #[test]
    fn deduplicates_identical_patterns_first_occurrence_wins() {
        let policies = vec![
            policy(1, GitObjectType::Branch, "*"),
            policy(2, GitObjectType::Branch, "*"),
        ];
        let index = PatternIndex::compile(&policies).unwrap();
        assert_eq!(index.compiled.len(), 1);
    }

    #[test]
    fn invalid_pattern_names_pattern_and_policy_id() {
        let policies = vec![policy(7, GitObjectType::Branch, "[unterminated")];
        let err = PatternIndex::compile(&policies).unwrap_err();
        match err {
            ExpirerError::InvalidPattern { pattern, policy_id } => {
                assert_eq!(pattern, "[unterminated");
                assert_eq!(policy_id, 7);
            }
            other => panic!("expected InvalidPattern, got {other:?}"),
        }
    }

    #[test]
    #[should_panic(expected = "was never compiled")]
    fn matches_panics_on_unknown_pattern() {
        let index = PatternIndex::compile(&[]).unwrap();
        index.matches("*", "main");
    }
}
