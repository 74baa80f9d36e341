//! Code-intelligence upload retention engine.
//!
//! Matches declarative configuration policies against a repository's
//! commits, branches, and tags, then walks previously ingested uploads in
//! bounded batches to decide whether each remains protected or should be
//! marked expired.

pub mod cache;
pub mod config;
pub mod domain;
pub mod driver;
pub mod observability;
pub mod patterns;
pub mod policies;
pub mod revision;
pub mod store;

pub use cache::{BranchVisibilityCache, CommitVerdict};
pub use config::ExpirerConfig;
pub use domain::{
    CommitId, ConfigurationPolicy, Cursor, ExpirerError, GitObjectType, PolicyMatch, PolicyScope, RefDescription,
    RefType, RepositoryId, Result, RetentionDecision, Upload, UploadId, UploadState,
};
pub use driver::ExpirationDriver;
pub use observability::{init_tracing, NoopObservationSink, ObservationSink, PrometheusObservationSink};
pub use patterns::PatternIndex;
pub use policies::{indexing_extractor, retention_extractor, Extractor, PolicyMatcher};
pub use revision::{InMemoryRevisionProvider, RevisionProvider, SharedRevisionProvider};
pub use store::{InMemoryRetentionStore, RetentionStore, SharedRetentionStore};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Installs the crate's tracing subscriber. Embedders that already run
/// their own `tracing_subscriber` setup should skip this and construct
/// [`ExpirationDriver`] directly.
pub fn init() -> Result<()> {
    observability::init_tracing();
    Ok(())
}
