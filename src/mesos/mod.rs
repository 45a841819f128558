// Mesos master and slave metric sources
pub mod client;
pub mod cluster;
pub mod slaves;
pub mod tasks;

pub use client::{MasterState, MesosClient, MetricsSnapshot, SlaveInfo};
pub use cluster::ClusterSource;
pub use slaves::SlaveSource;
pub use tasks::SlaveTaskSource;

use std::sync::Arc;

use crate::error::SourceError;
use crate::metrics::MetricSource;

/// The Mesos sources in the order they must be sampled
pub fn sources(client: Arc<MesosClient>) -> Vec<Box<dyn MetricSource>> {
    vec![
        Box::new(SlaveSource::new(client.clone())),
        Box::new(SlaveTaskSource::new(client.clone())),
        Box::new(ClusterSource::new(client)),
    ]
}

/// Per-slave sources tolerate unreachable slaves unless every one failed
fn require_reachable(attempted: usize, failed: usize) -> Result<(), SourceError> {
    if attempted > 0 && failed == attempted {
        Err(SourceError::NoReachableSlaves { attempted })
    } else {
        Ok(())
    }
}
