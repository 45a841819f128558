use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::SourceError;
use crate::http::{base_url, build_client, fetch_json};

/// Flat `{"master/cpus_total": 8.0, ...}` map from `/metrics/snapshot`
pub type MetricsSnapshot = BTreeMap<String, Value>;

/// The parts of `/master/state` the sources need
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MasterState {
    #[serde(default)]
    pub slaves: Vec<SlaveInfo>,
    #[serde(default)]
    pub frameworks: Vec<FrameworkInfo>,
}

impl MasterState {
    pub fn framework_names(&self) -> BTreeMap<String, String> {
        self.frameworks
            .iter()
            .map(|f| (f.id.clone(), f.name.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlaveInfo {
    pub id: String,
    /// libprocess pid, e.g. `slave(1)@10.0.0.1:5051`
    pub pid: String,
    pub hostname: String,
}

impl SlaveInfo {
    /// `host:port` the slave's HTTP endpoints listen on
    pub fn address(&self) -> Option<&str> {
        parse_pid_address(&self.pid)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameworkInfo {
    pub id: String,
    pub name: String,
}

/// One entry of a slave's `/monitor/statistics`
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorStatistics {
    pub executor_id: String,
    #[serde(default)]
    pub executor_name: String,
    pub framework_id: String,
    pub statistics: ResourceStatistics,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceStatistics {
    /// Seconds since epoch when the statistics were taken
    pub timestamp: f64,
    #[serde(flatten)]
    pub values: BTreeMap<String, Value>,
}

/// Extract `host:port` from a libprocess pid such as `slave(1)@10.0.0.1:5051`
pub fn parse_pid_address(pid: &str) -> Option<&str> {
    let (_, address) = pid.rsplit_once('@')?;
    let (host, port) = address.rsplit_once(':')?;
    if host.is_empty() || port.parse::<u16>().is_err() {
        return None;
    }
    Some(address)
}

/// Numeric entries of a JSON object; booleans and strings are skipped
pub fn numeric_values(values: &BTreeMap<String, Value>) -> impl Iterator<Item = (&str, f64)> {
    values
        .iter()
        .filter_map(|(key, value)| value.as_f64().map(|v| (key.as_str(), v)))
}

/// HTTP access to a Mesos master and its slaves.
///
/// The master state is cached until `reset`, so every source sampled within
/// one cycle sees the same slave listing.
pub struct MesosClient {
    http: Client,
    master: String,
    state: Mutex<Option<Arc<MasterState>>>,
}

impl MesosClient {
    pub fn new(master_pid: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::with_http(build_client(timeout)?, master_pid))
    }

    pub fn with_http(http: Client, master_pid: &str) -> Self {
        info!("Using Mesos master at {}", master_pid);
        Self {
            http,
            master: master_pid.to_string(),
            state: Mutex::new(None),
        }
    }

    pub fn master(&self) -> &str {
        &self.master
    }

    /// Drop the cached master state
    pub fn reset(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Master state, fetched at most once between resets
    pub async fn state(&self) -> Result<Arc<MasterState>, SourceError> {
        if let Some(state) = self.cached_state() {
            return Ok(state);
        }

        let url = format!("{}/master/state", base_url(&self.master));
        let state: Arc<MasterState> = Arc::new(fetch_json(&self.http, &url).await?);
        debug!(
            "Master reports {} slaves and {} frameworks",
            state.slaves.len(),
            state.frameworks.len()
        );

        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Some(state.clone());
        Ok(state)
    }

    fn cached_state(&self) -> Option<Arc<MasterState>> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn master_snapshot(&self) -> Result<MetricsSnapshot, SourceError> {
        self.metrics_snapshot(&self.master).await
    }

    pub async fn metrics_snapshot(&self, address: &str) -> Result<MetricsSnapshot, SourceError> {
        let url = format!("{}/metrics/snapshot", base_url(address));
        fetch_json(&self.http, &url).await
    }

    pub async fn executor_statistics(
        &self,
        address: &str,
    ) -> Result<Vec<ExecutorStatistics>, SourceError> {
        let url = format!("{}/monitor/statistics", base_url(address));
        fetch_json(&self.http, &url).await
    }
}
