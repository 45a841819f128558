use std::time::{Duration, Instant};
use tracing::info;

/// Logs how long a scope took when dropped
pub struct Timer {
    label: &'static str,
    started: Instant,
}

impl Timer {
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!("{} took {:.3}s", self.label, self.elapsed().as_secs_f64());
    }
}
