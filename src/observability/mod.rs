//! Logging and metrics, trimmed down from the lineage's full HTTP/auth/cache
//! observability surface to what a background retention pass needs: a
//! `tracing` subscriber and five counters.

mod metrics;

pub use metrics::{NoopObservationSink, ObservationSink, PrometheusObservationSink};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a global `tracing` subscriber reading `RUST_LOG`, defaulting to
/// `info` when unset. Mirrors `observability::tracing::init_tracing` in the
/// lineage this crate is drawn from, minus the correlation-id span layer
/// (there is no inbound HTTP request to correlate here).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry().with(filter).with(fmt::layer()).try_init();
}
