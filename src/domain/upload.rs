use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::policy::{CommitId, RepositoryId};

pub type UploadId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadState {
    Completed,
}

/// A previously ingested code-intelligence artifact keyed by repository and
/// commit. Only `Completed` uploads are considered by the expirer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    pub id: UploadId,
    pub repository_id: RepositoryId,
    pub commit: CommitId,
    pub state: UploadState,
    pub uploaded_at: DateTime<Utc>,
}
