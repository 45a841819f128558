use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use super::client::{numeric_values, ExecutorStatistics, MesosClient};
use super::require_reachable;
use crate::error::SourceError;
use crate::metrics::{sanitize_component, MetricSample, MetricSource};

/// Per-task resource usage from each slave's `/monitor/statistics`.
///
/// Relies on the master state cached by [`super::SlaveSource`] earlier in
/// the same cycle; it is fetched here only if that source failed.
pub struct SlaveTaskSource {
    client: Arc<MesosClient>,
    framework_names: BTreeMap<String, String>,
}

impl SlaveTaskSource {
    pub fn new(client: Arc<MesosClient>) -> Self {
        Self {
            client,
            framework_names: BTreeMap::new(),
        }
    }
}

/// `tasks.<framework>.<executor>.<statistic>`, stamped with the statistics time
pub fn task_samples(
    executors: &[ExecutorStatistics],
    framework_names: &BTreeMap<String, String>,
) -> Vec<MetricSample> {
    let mut samples = Vec::new();
    for executor in executors {
        let framework = framework_names
            .get(&executor.framework_id)
            .unwrap_or(&executor.framework_id);
        let prefix = format!(
            "tasks.{}.{}",
            sanitize_component(framework),
            sanitize_component(&executor.executor_id)
        );
        let timestamp = executor.statistics.timestamp as i64;

        samples.extend(
            numeric_values(&executor.statistics.values)
                .map(|(stat, value)| MetricSample::at(format!("{}.{}", prefix, sanitize_component(stat)), value, timestamp)),
        );
    }
    samples
}

#[async_trait]
impl MetricSource for SlaveTaskSource {
    fn name(&self) -> &'static str {
        "slave_tasks"
    }

    fn reset(&mut self) {
        self.framework_names.clear();
    }

    async fn sample(&mut self) -> Result<Vec<MetricSample>, SourceError> {
        let state = self.client.state().await?;
        if self.framework_names.is_empty() {
            self.framework_names = state.framework_names();
        }

        let mut samples = Vec::new();
        let mut failed = 0;
        for slave in &state.slaves {
            let Some(address) = slave.address() else {
                failed += 1;
                continue;
            };
            match self.client.executor_statistics(address).await {
                Ok(executors) => samples.extend(task_samples(&executors, &self.framework_names)),
                Err(e) => {
                    warn!("Skipping tasks on slave {}: {}", slave.hostname, e);
                    failed += 1;
                }
            }
        }

        require_reachable(state.slaves.len(), failed)?;
        Ok(samples)
    }
}
