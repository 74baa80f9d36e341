//! The five counters this engine exposes, wired the same way
//! `observability::metrics::MetricsRegistry` registers and increments its
//! counters, just scoped to retention-pass bookkeeping instead of the
//! lineage's full HTTP/auth/cache metrics surface.

use prometheus::{IntCounter, Registry};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),
}

/// Sink for the counters the expiration driver emits. Kept as a trait (over
/// a concrete `MetricsRegistry` field) so tests can substitute
/// [`NoopObservationSink`] without standing up a `prometheus::Registry`.
pub trait ObservationSink: Send + Sync {
    fn record_repo_scanned(&self);
    fn record_uploads_scanned(&self, count: u64);
    fn record_uploads_protected(&self, count: u64);
    fn record_uploads_expired(&self, count: u64);
    fn record_matcher_error(&self);
}

/// A `prometheus`-backed [`ObservationSink`].
pub struct PrometheusObservationSink {
    repos_scanned: IntCounter,
    uploads_scanned: IntCounter,
    uploads_protected: IntCounter,
    uploads_expired: IntCounter,
    matcher_errors: IntCounter,
}

impl PrometheusObservationSink {
    pub fn new(registry: &Registry) -> Result<Self, MetricsError> {
        let repos_scanned = IntCounter::new("expirer_repos_scanned_total", "Repositories examined in a retention pass")?;
        let uploads_scanned = IntCounter::new("expirer_uploads_scanned_total", "Uploads examined in a retention pass")?;
        let uploads_protected = IntCounter::new("expirer_uploads_protected_total", "Uploads classified protected")?;
        let uploads_expired = IntCounter::new("expirer_uploads_expired_total", "Uploads classified expired")?;
        let matcher_errors = IntCounter::new("expirer_matcher_errors_total", "Policy matcher failures, per repository")?;

        registry.register(Box::new(repos_scanned.clone()))?;
        registry.register(Box::new(uploads_scanned.clone()))?;
        registry.register(Box::new(uploads_protected.clone()))?;
        registry.register(Box::new(uploads_expired.clone()))?;
        registry.register(Box::new(matcher_errors.clone()))?;

        Ok(Self {
            repos_scanned,
            uploads_scanned,
            uploads_protected,
            uploads_expired,
            matcher_errors,
        })
    }
}

impl ObservationSink for PrometheusObservationSink {
    fn record_repo_scanned(&self) {
        self.repos_scanned.inc();
    }

    fn record_uploads_scanned(&self, count: u64) {
        self.uploads_scanned.inc_by(count);
    }

    fn record_uploads_protected(&self, count: u64) {
        self.uploads_protected.inc_by(count);
    }

    fn record_uploads_expired(&self, count: u64) {
        self.uploads_expired.inc_by(count);
    }

    fn record_matcher_error(&self) {
        self.matcher_errors.inc();
    }
}

/// An [`ObservationSink`] that discards everything, for tests and for
/// embedders that don't want a `prometheus::Registry` of their own.
#[derive(Debug, Default)]
pub struct NoopObservationSink;

impl ObservationSink for NoopObservationSink {
    fn record_repo_scanned(&self) {}
    fn record_uploads_scanned(&self, _count: u64) {}
    fn record_uploads_protected(&self, _count: u64) {}
    fn record_uploads_expired(&self, _count: u64) {}
    fn record_matcher_error(&self) {}
}
