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
            "brusio_feed_page_hit_total",
            Unit::Count,
            "Total number of feed page cache hits."
        );
        describe_counter!(
            "brusio_feed_page_miss_total",
            Unit::Count,
            "Total number of feed page cache misses."
        );
        describe_counter!(
            "brusio_like_overlay_hit_total",
            Unit::Count,
            "Total number of post ids resolved as liked from the overlay."
        );
        describe_counter!(
            "brusio_like_overlay_miss_total",
            Unit::Count,
            "Total number of post ids the overlay could not resolve."
        );
        describe_counter!(
            "brusio_like_batch_published_total",
            Unit::Count,
            "Total number of like event batches published to the queue."
        );
        describe_counter!(
            "brusio_like_batch_dropped_total",
            Unit::Count,
            "Total number of like event batches dropped before publishing."
        );
        describe_gauge!(
            "brusio_like_buffer_len",
            Unit::Count,
            "Current number of like events buffered in the batcher."
        );
        describe_histogram!(
            "brusio_like_batch_flush_ms",
            Unit::Milliseconds,
            "Like batch publish latency in milliseconds."
        );
        describe_counter!(
            "brusio_like_events_applied_total",
            Unit::Count,
            "Total number of like events applied durably."
        );
        describe_counter!(
            "brusio_like_events_discarded_total",
            Unit::Count,
            "Total number of like events discarded as stale, duplicate, or failed."
        );
    });
}
