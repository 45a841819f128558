// Metric sources and sinks used by the collection loop
pub mod sample;

pub use sample::{gauge_path, metric_path, sanitize_component, MetricSample};

use crate::error::{SinkError, SourceError};
use async_trait::async_trait;

/// An upstream system that produces metric samples once per cycle.
///
/// Sources live for the whole process and are reused every cycle. Any
/// listing they cache while sampling must be dropped by `reset`, which the
/// collection cycle calls right before `sample`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricSource: Send {
    /// Short identifier used in logs and failure reports
    fn name(&self) -> &'static str;

    /// Clear per-cycle cached state. Must be idempotent.
    fn reset(&mut self);

    /// Collect this cycle's samples
    async fn sample(&mut self) -> Result<Vec<MetricSample>, SourceError>;
}

/// Destination for an aggregated batch of samples
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricSink: Send {
    /// Deliver `samples` within `timeout_seconds`.
    ///
    /// The timeout may be zero or negative when collection overran the
    /// cycle deadline; implementations treat that as "best effort, do not
    /// wait". Samples without their own timestamp are stamped with
    /// `cycle_timestamp`.
    async fn send(
        &mut self,
        samples: &[MetricSample],
        timeout_seconds: f64,
        cycle_timestamp: f64,
    ) -> Result<(), SinkError>;
}
