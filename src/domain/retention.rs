use chrono::Duration;
use serde::{Deserialize, Serialize};

/// One policy's verdict on a single commit, keyed into the matcher's
/// `commit -> matches` mapping.
///
/// `policy_id` is `None` only for the implicit "tip of default branch" rule;
/// every other match names the policy that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyMatch {
    pub name: String,
    pub policy_id: Option<i64>,
    pub policy_duration: Option<Duration>,
}

impl PolicyMatch {
    pub fn new(name: impl Into<String>, policy_id: Option<i64>, policy_duration: Option<Duration>) -> Self {
        Self {
            name: name.into(),
            policy_id,
            policy_duration,
        }
    }
}

/// The driver's verdict for one upload after examining every commit visible
/// to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionDecision {
    Protected,
    Expired,
}

/// Opaque pagination cursor for [`crate::store::RetentionStore::commits_visible_to_upload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor(pub String);
