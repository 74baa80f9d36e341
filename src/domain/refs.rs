use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefType {
    Branch,
    Tag,
}

/// A branch or tag at some commit, as reported by the revision service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefDescription {
    pub name: String,
    pub ref_type: RefType,
    /// Only meaningful for branches.
    pub is_default_branch: bool,
    pub created_date: DateTime<Utc>,
}

impl RefDescription {
    pub fn branch(name: impl Into<String>, is_default_branch: bool, created_date: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            ref_type: RefType::Branch,
            is_default_branch,
            created_date,
        }
    }

    pub fn tag(name: impl Into<String>, created_date: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            ref_type: RefType::Tag,
            is_default_branch: false,
            created_date,
        }
    }
}
