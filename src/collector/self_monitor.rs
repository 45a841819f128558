use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::cycle::{CycleReport, Dispatch};
use crate::error::SourceError;
use crate::metrics::{MetricSample, MetricSource};

/// Timings of the most recently finished cycle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleTimings {
    pub cycle_time: Duration,
    pub collection_time: Duration,
    pub send_time: Duration,
    pub source_failures: usize,
}

impl CycleTimings {
    pub fn from_report(report: &CycleReport) -> Self {
        let send_time = match &report.dispatch {
            Dispatch::Sent { elapsed, .. } => *elapsed,
            Dispatch::Skipped | Dispatch::Failed { .. } => Duration::ZERO,
        };
        Self {
            cycle_time: report.cycle_time,
            collection_time: report.collection_time,
            send_time,
            source_failures: report.source_failures.len(),
        }
    }
}

/// Handle shared between the supervisor (writer) and the self-metrics source
#[derive(Debug, Clone, Default)]
pub struct SharedTimings(Arc<Mutex<Option<CycleTimings>>>);

impl SharedTimings {
    pub fn record(&self, timings: CycleTimings) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(timings);
    }

    pub fn latest(&self) -> Option<CycleTimings> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reports how long the previous cycle took
pub struct SelfMetricsSource {
    timings: SharedTimings,
}

impl SelfMetricsSource {
    pub fn new(timings: SharedTimings) -> Self {
        Self { timings }
    }
}

#[async_trait]
impl MetricSource for SelfMetricsSource {
    fn name(&self) -> &'static str {
        "self"
    }

    // The record belongs to the supervisor and survives across cycles
    fn reset(&mut self) {}

    async fn sample(&mut self) -> Result<Vec<MetricSample>, SourceError> {
        let Some(last) = self.timings.latest() else {
            return Ok(Vec::new());
        };
        Ok(vec![
            MetricSample::new("mesos_stats.cycle_time", last.cycle_time.as_secs_f64()),
            MetricSample::new("mesos_stats.collection_time", last.collection_time.as_secs_f64()),
            MetricSample::new("mesos_stats.send_time", last.send_time.as_secs_f64()),
            MetricSample::new("mesos_stats.source_failures", last.source_failures as f64),
        ])
    }
}
