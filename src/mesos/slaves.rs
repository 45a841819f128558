use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use super::client::{numeric_values, MesosClient, MetricsSnapshot};
use super::require_reachable;
use crate::error::SourceError;
use crate::metrics::{gauge_path, sanitize_component, MetricSample, MetricSource};

/// Per-slave gauges from each slave's `/metrics/snapshot`.
///
/// This source owns the per-cycle reset of the shared master state, so it
/// must be sampled before the other Mesos sources.
pub struct SlaveSource {
    client: Arc<MesosClient>,
}

impl SlaveSource {
    pub fn new(client: Arc<MesosClient>) -> Self {
        Self { client }
    }
}

/// `slave.<hostname>.<gauge>` for every numeric gauge, with the snapshot's own
/// `slave/` namespace dropped
pub fn slave_samples(hostname: &str, snapshot: &MetricsSnapshot) -> Vec<MetricSample> {
    let host = sanitize_component(hostname);
    numeric_values(snapshot)
        .map(|(key, value)| {
            let gauge = key.strip_prefix("slave/").unwrap_or(key);
            MetricSample::new(format!("slave.{}.{}", host, gauge_path(gauge)), value)
        })
        .collect()
}

#[async_trait]
impl MetricSource for SlaveSource {
    fn name(&self) -> &'static str {
        "slaves"
    }

    fn reset(&mut self) {
        self.client.reset();
    }

    async fn sample(&mut self) -> Result<Vec<MetricSample>, SourceError> {
        let state = self.client.state().await?;
        let mut samples = Vec::new();
        let mut failed = 0;

        for slave in &state.slaves {
            let Some(address) = slave.address() else {
                warn!("Slave {} has unparseable pid {:?}", slave.hostname, slave.pid);
                failed += 1;
                continue;
            };
            match self.client.metrics_snapshot(address).await {
                Ok(snapshot) => samples.extend(slave_samples(&slave.hostname, &snapshot)),
                Err(e) => {
                    warn!("Skipping slave {}: {}", slave.hostname, e);
                    failed += 1;
                }
            }
        }

        require_reachable(state.slaves.len(), failed)?;
        Ok(samples)
    }
}
