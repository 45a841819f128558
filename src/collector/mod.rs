// Aligned collect-and-dispatch loop
pub mod clock;
pub mod cycle;
pub mod self_monitor;
pub mod supervisor;

pub use clock::{delay_to_next_minute, epoch_seconds, Clock, SystemClock};
pub use cycle::{
    run_once, CollectionResult, Cycle, CycleOutcome, CycleReport, Dispatch, SourceFailure,
    SOFT_WINDOW_SECS,
};
pub use self_monitor::{CycleTimings, SelfMetricsSource, SharedTimings};
pub use supervisor::{Supervisor, SupervisorState};
