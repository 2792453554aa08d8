use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
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
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "bacheca_query_hit_total",
            Unit::Count,
            "Total number of fetches served from a fresh cache entry."
        );
        describe_counter!(
            "bacheca_query_fetch_total",
            Unit::Count,
            "Total number of fetches that went to the network."
        );
        describe_counter!(
            "bacheca_query_join_total",
            Unit::Count,
            "Total number of fetches that joined an in-flight request."
        );
        describe_counter!(
            "bacheca_query_invalidate_total",
            Unit::Count,
            "Total number of cache invalidation calls."
        );
        describe_counter!(
            "bacheca_query_discard_total",
            Unit::Count,
            "Total number of fetch results discarded as no longer relevant."
        );
        describe_histogram!(
            "bacheca_api_request_ms",
            Unit::Milliseconds,
            "API request latency in milliseconds."
        );
    });
}
