use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so stdout stays reserved for command output.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Registers descriptions for every metric the cache emits. Idempotent.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "campus_cache_hit_total",
            Unit::Count,
            "Reads served from a fresh or stale cached value without starting a request."
        );
        describe_counter!(
            "campus_cache_miss_total",
            Unit::Count,
            "Reads that started a new request."
        );
        describe_counter!(
            "campus_cache_join_total",
            Unit::Count,
            "Reads that joined a request already in flight."
        );
        describe_counter!(
            "campus_cache_evict_total",
            Unit::Count,
            "Entries dropped for idleness or capacity."
        );
        describe_counter!(
            "campus_cache_discarded_total",
            Unit::Count,
            "Request results discarded because their entry was invalidated or removed."
        );
        describe_gauge!(
            "campus_cache_entries",
            Unit::Count,
            "Current number of cache entries."
        );
        describe_histogram!(
            "campus_fetch_ms",
            Unit::Milliseconds,
            "Producer latency in milliseconds."
        );
    });
}
