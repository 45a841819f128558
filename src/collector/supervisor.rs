use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::clock::Clock;
use super::cycle::{run_once, CycleOutcome, CycleReport, Dispatch};
use super::self_monitor::{CycleTimings, SelfMetricsSource, SharedTimings};
use crate::metrics::{MetricSink, MetricSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Running,
    Stopping,
}

/// Runs collection cycles until cancelled.
///
/// No cycle outcome other than cancellation ends the loop: failures are
/// logged and the next cycle waits for the next minute boundary.
pub struct Supervisor {
    sources: Vec<Box<dyn MetricSource>>,
    sink: Box<dyn MetricSink>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    state: SupervisorState,
    cycles: u64,
    timings: Option<SharedTimings>,
}

impl Supervisor {
    pub fn new(
        sources: Vec<Box<dyn MetricSource>>,
        sink: Box<dyn MetricSink>,
        clock: Arc<dyn Clock>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            sources,
            sink,
            clock,
            cancel,
            state: SupervisorState::Running,
            cycles: 0,
            timings: None,
        }
    }

    /// Also report the previous cycle's own timings as metrics
    pub fn with_self_metrics(mut self) -> Self {
        let timings = SharedTimings::default();
        self.sources
            .push(Box::new(SelfMetricsSource::new(timings.clone())));
        self.timings = Some(timings);
        self
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Number of cycles that ran to completion
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run a single cycle and return the state it leaves the loop in
    pub async fn step(&mut self) -> SupervisorState {
        if self.state == SupervisorState::Stopping || self.cancel.is_cancelled() {
            self.state = SupervisorState::Stopping;
            return self.state;
        }

        let outcome = run_once(
            &mut self.sources,
            self.sink.as_mut(),
            self.clock.as_ref(),
            &self.cancel,
        )
        .await;

        if let (Some(timings), Some(report)) = (&self.timings, outcome.report()) {
            timings.record(CycleTimings::from_report(report));
        }

        match outcome {
            CycleOutcome::Interrupted => {
                info!("Interrupted, not starting another cycle");
                self.state = SupervisorState::Stopping;
                return self.state;
            }
            CycleOutcome::Success(report) => log_success(&report),
            CycleOutcome::SourceFailures(report) => {
                for failure in &report.source_failures {
                    warn!("Skipped source {} this cycle: {}", failure.source, failure.error);
                }
                log_success(&report);
            }
            CycleOutcome::SinkFailure(report) => {
                if let Dispatch::Failed { error, timeout_seconds } = &report.dispatch {
                    error!(
                        "Dropped {} stats, send failed (timeout {:.3}s): {}",
                        report.collected, timeout_seconds, error
                    );
                }
            }
            CycleOutcome::UnexpectedFailure(report) => {
                error!("Unhandled failure during cycle: {:#?}", report);
            }
        }

        self.cycles += 1;
        self.state
    }

    /// Loop until an interrupt arrives
    pub async fn run(&mut self) {
        info!("Starting collection loop with {} sources", self.sources.len());
        while self.step().await == SupervisorState::Running {}
        info!("Collection loop stopped after {} cycles", self.cycles);
    }
}

fn log_success(report: &CycleReport) {
    match &report.dispatch {
        Dispatch::Sent { .. } => info!("Metrics sent successfully."),
        Dispatch::Skipped => info!("No stats collected at {}", report.cycle.start),
        // classified as SinkFailure before reaching here
        Dispatch::Failed { .. } => {}
    }
}
