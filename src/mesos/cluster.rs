use async_trait::async_trait;
use std::sync::Arc;

use super::client::{numeric_values, MesosClient, MetricsSnapshot};
use crate::error::SourceError;
use crate::metrics::{gauge_path, MetricSample, MetricSource};

/// Cluster-wide gauges from the master's `/metrics/snapshot`
pub struct ClusterSource {
    client: Arc<MesosClient>,
}

impl ClusterSource {
    pub fn new(client: Arc<MesosClient>) -> Self {
        Self { client }
    }
}

pub fn cluster_samples(snapshot: &MetricsSnapshot) -> Vec<MetricSample> {
    numeric_values(snapshot)
        .map(|(key, value)| MetricSample::new(format!("cluster.{}", gauge_path(key)), value))
        .collect()
}

#[async_trait]
impl MetricSource for ClusterSource {
    fn name(&self) -> &'static str {
        "cluster"
    }

    // The snapshot is fetched fresh every time, nothing to clear
    fn reset(&mut self) {}

    async fn sample(&mut self) -> Result<Vec<MetricSample>, SourceError> {
        let snapshot = self.client.master_snapshot().await?;
        Ok(cluster_samples(&snapshot))
    }
}
