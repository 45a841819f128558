// Singularity scheduler metric source
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::SourceError;
use crate::http::{base_url, build_client, fetch_json};
use crate::mesos::client::numeric_values;
use crate::metrics::{sanitize_component, MetricSample, MetricSource};

/// Entry of `/singularity/api/requests`
#[derive(Debug, Clone, Deserialize)]
pub struct RequestParent {
    pub request: SingularityRequest,
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingularityRequest {
    pub id: String,
    pub request_type: String,
}

/// Scheduler-wide counters and per-type request counts from Singularity
pub struct SingularitySource {
    http: Client,
    base: String,
    state: Option<BTreeMap<String, Value>>,
    requests: Option<Vec<RequestParent>>,
}

impl SingularitySource {
    pub fn new(host: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::with_http(build_client(timeout)?, host))
    }

    pub fn with_http(http: Client, host: &str) -> Self {
        let base = base_url(host);
        info!("Using Singularity at {}", base);
        Self {
            http,
            base,
            state: None,
            requests: None,
        }
    }

    async fn state(&mut self) -> Result<&BTreeMap<String, Value>, SourceError> {
        if self.state.is_none() {
            let url = format!("{}/singularity/api/state", self.base);
            self.state = Some(fetch_json(&self.http, &url).await?);
        }
        Ok(self.state.get_or_insert_with(BTreeMap::new))
    }

    async fn requests(&mut self) -> Result<&[RequestParent], SourceError> {
        if self.requests.is_none() {
            let url = format!("{}/singularity/api/requests", self.base);
            self.requests = Some(fetch_json(&self.http, &url).await?);
        }
        Ok(self.requests.get_or_insert_with(Vec::new))
    }
}

/// `singularity.state.<field>` for every numeric field
pub fn state_samples(state: &BTreeMap<String, Value>) -> Vec<MetricSample> {
    numeric_values(state)
        .map(|(key, value)| {
            MetricSample::new(format!("singularity.state.{}", sanitize_component(key)), value)
        })
        .collect()
}

/// `singularity.requests.<type>.<state>` request counts
pub fn request_samples(requests: &[RequestParent]) -> Vec<MetricSample> {
    let mut counts: BTreeMap<(String, String), u64> = BTreeMap::new();
    for parent in requests {
        let key = (
            sanitize_component(&parent.request.request_type.to_lowercase()),
            sanitize_component(&parent.state.to_lowercase()),
        );
        *counts.entry(key).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|((kind, state), count)| {
            MetricSample::new(format!("singularity.requests.{}.{}", kind, state), count as f64)
        })
        .collect()
}

#[async_trait]
impl MetricSource for SingularitySource {
    fn name(&self) -> &'static str {
        "singularity"
    }

    fn reset(&mut self) {
        self.state = None;
        self.requests = None;
    }

    async fn sample(&mut self) -> Result<Vec<MetricSample>, SourceError> {
        let mut samples = state_samples(self.state().await?);
        samples.extend(request_samples(self.requests().await?));
        debug!("Singularity produced {} samples", samples.len());
        Ok(samples)
    }
}
