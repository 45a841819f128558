use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::clock::{delay_to_next_minute, epoch_seconds, Clock};
use crate::error::{panic_message, SinkError, SourceError};
use crate::logging::Timer;
use crate::metrics::{MetricSample, MetricSink, MetricSource};

/// Seconds of each 60 second slot available to collect and send
pub const SOFT_WINDOW_SECS: i64 = 59;

/// One iteration of the loop, started on a minute boundary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cycle {
    pub start: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

impl Cycle {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            deadline: start + ChronoDuration::seconds(SOFT_WINDOW_SECS),
        }
    }

    /// Cycle start as epoch seconds, used to stamp unstamped samples
    pub fn timestamp(&self) -> f64 {
        epoch_seconds(self.start)
    }

    /// Seconds left until the soft deadline; negative once it has passed
    pub fn remaining_at(&self, now: DateTime<Utc>) -> f64 {
        epoch_seconds(self.deadline) - epoch_seconds(now)
    }
}

/// A source that could not contribute to this cycle
#[derive(Debug)]
pub struct SourceFailure {
    pub source: String,
    pub error: SourceError,
}

/// Samples and failures gathered from all sources in one cycle
#[derive(Debug, Default)]
pub struct CollectionResult {
    pub samples: Vec<MetricSample>,
    pub errors: Vec<SourceFailure>,
}

impl CollectionResult {
    fn record(&mut self, source: &str, result: Result<Vec<MetricSample>, SourceError>) {
        match result {
            Ok(samples) => {
                debug!("Source {} produced {} samples", source, samples.len());
                self.samples.extend(samples);
            }
            Err(error) => {
                warn!("Source {} failed: {}", source, error);
                self.errors.push(SourceFailure {
                    source: source.to_string(),
                    error,
                });
            }
        }
    }
}

/// What happened to the batch at the end of a cycle
#[derive(Debug)]
pub enum Dispatch {
    /// Nothing was collected, the sink was not called
    Skipped,
    Sent { timeout_seconds: f64, elapsed: Duration },
    Failed { timeout_seconds: f64, error: SinkError },
}

/// Everything the supervisor needs to log about a finished cycle
#[derive(Debug)]
pub struct CycleReport {
    pub cycle: Cycle,
    pub collected: usize,
    pub source_failures: Vec<SourceFailure>,
    pub collection_time: Duration,
    /// Time from the minute boundary to the end of dispatch
    pub cycle_time: Duration,
    pub dispatch: Dispatch,
}

impl CycleReport {
    fn has_unexpected_failure(&self) -> bool {
        let source_panicked = self.source_failures.iter().any(|f| f.error.is_unexpected());
        let sink_panicked = matches!(&self.dispatch, Dispatch::Failed { error, .. } if error.is_unexpected());
        source_panicked || sink_panicked
    }
}

/// Result of `run_once`, matched on by the supervisor
#[derive(Debug)]
pub enum CycleOutcome {
    /// Every source succeeded and the batch (if any) was delivered
    Success(CycleReport),
    /// At least one source failed; the rest were still dispatched
    SourceFailures(CycleReport),
    /// The sink rejected or timed out on the batch
    SinkFailure(CycleReport),
    /// A source or the sink panicked
    UnexpectedFailure(CycleReport),
    /// Cancellation was requested before the cycle completed
    Interrupted,
}

impl CycleOutcome {
    fn classify(report: CycleReport) -> Self {
        if report.has_unexpected_failure() {
            CycleOutcome::UnexpectedFailure(report)
        } else if matches!(report.dispatch, Dispatch::Failed { .. }) {
            CycleOutcome::SinkFailure(report)
        } else if !report.source_failures.is_empty() {
            CycleOutcome::SourceFailures(report)
        } else {
            CycleOutcome::Success(report)
        }
    }

    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            CycleOutcome::Success(report)
            | CycleOutcome::SourceFailures(report)
            | CycleOutcome::SinkFailure(report)
            | CycleOutcome::UnexpectedFailure(report) => Some(report),
            CycleOutcome::Interrupted => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, CycleOutcome::Interrupted)
    }
}

/// Run one aligned collect-and-send pass.
///
/// Waits for the next minute boundary, resets and samples every source in
/// order (a failing source never stops the others), then hands the
/// concatenated batch to the sink with whatever remains of the 59 second
/// window. An empty batch is never sent.
pub async fn run_once(
    sources: &mut [Box<dyn MetricSource>],
    sink: &mut dyn MetricSink,
    clock: &dyn Clock,
    cancel: &CancellationToken,
) -> CycleOutcome {
    let delay = delay_to_next_minute(clock.now());
    info!("Sleeping for {:.3}s", delay.as_secs_f64());
    tokio::select! {
        biased;
        _ = cancel.cancelled() => return CycleOutcome::Interrupted,
        _ = clock.sleep(delay) => {}
    }

    let cycle_timer = Timer::start("Entire collect and send cycle");
    let cycle = Cycle::starting_at(clock.now());
    info!("Timestamp: {} ({:.3})", cycle.start, cycle.timestamp());

    let collection_timer = Timer::start("Metrics collection");
    let mut collected = CollectionResult::default();
    for source in sources.iter_mut() {
        let name = source.name();

        if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(|| source.reset())) {
            let reason = panic_message(payload);
            error!("Source {} panicked during reset: {}", name, reason);
            collected.record(name, Err(SourceError::Panicked(reason)));
            continue;
        }

        let sampled = tokio::select! {
            biased;
            _ = cancel.cancelled() => return CycleOutcome::Interrupted,
            result = AssertUnwindSafe(source.sample()).catch_unwind() => result,
        };
        let result = sampled.unwrap_or_else(|payload| {
            let reason = panic_message(payload);
            error!("Source {} panicked: {}", name, reason);
            Err(SourceError::Panicked(reason))
        });
        collected.record(name, result);
    }
    let collection_time = collection_timer.elapsed();
    drop(collection_timer);

    let CollectionResult { samples, errors } = collected;
    let mut report = CycleReport {
        cycle,
        collected: samples.len(),
        source_failures: errors,
        collection_time,
        cycle_time: collection_time,
        dispatch: Dispatch::Skipped,
    };

    if samples.is_empty() {
        info!("No stats this time; sleeping");
        report.cycle_time = cycle_timer.elapsed();
        return CycleOutcome::classify(report);
    }

    let timeout_seconds = cycle.remaining_at(clock.now());
    info!("Sending {} stats (timeout {:.3}s)", samples.len(), timeout_seconds);

    let send_timer = Timer::start("Sending stats");
    let sent = tokio::select! {
        biased;
        _ = cancel.cancelled() => return CycleOutcome::Interrupted,
        result = AssertUnwindSafe(sink.send(&samples, timeout_seconds, cycle.timestamp())).catch_unwind() => result,
    };
    let result = sent.unwrap_or_else(|payload| Err(SinkError::Panicked(panic_message(payload))));

    report.dispatch = match result {
        Ok(()) => Dispatch::Sent {
            timeout_seconds,
            elapsed: send_timer.elapsed(),
        },
        Err(error) => Dispatch::Failed {
            timeout_seconds,
            error,
        },
    };
    report.cycle_time = cycle_timer.elapsed();

    CycleOutcome::classify(report)
}
