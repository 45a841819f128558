// Carbon (Graphite) plaintext protocol sink
use async_trait::async_trait;
use std::fmt::Write as _;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::SinkError;
use crate::metrics::{MetricSample, MetricSink};

/// Default Carbon plaintext listener port
pub const DEFAULT_CARBON_PORT: u16 = 2003;

/// Smallest budget a send gets, even when the cycle deadline already passed
pub const MIN_SEND_BUDGET: Duration = Duration::from_secs(1);

/// Sends batches to Carbon as `<prefix>.<path> <value> <timestamp>` lines
pub struct CarbonSink {
    address: String,
    prefix: String,
    dry_run: bool,
}

impl CarbonSink {
    pub fn new(address: impl Into<String>, prefix: &str, dry_run: bool) -> Self {
        Self {
            address: address.into(),
            prefix: prefix.trim_matches('.').to_string(),
            dry_run,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn transmit(&self, payload: &[u8]) -> Result<(), SinkError> {
        let mut stream = TcpStream::connect(&self.address)
            .await
            .map_err(|source| SinkError::Connect {
                addr: self.address.clone(),
                source,
            })?;
        let write_error = |source| SinkError::Write {
            addr: self.address.clone(),
            source,
        };
        stream.write_all(payload).await.map_err(write_error)?;
        stream.shutdown().await.map_err(write_error)?;
        Ok(())
    }
}

/// Clamp the advisory timeout to something a transport can use
pub fn send_budget(timeout_seconds: f64) -> Duration {
    if timeout_seconds.is_finite() && timeout_seconds > MIN_SEND_BUDGET.as_secs_f64() {
        Duration::from_secs_f64(timeout_seconds)
    } else {
        MIN_SEND_BUDGET
    }
}

/// Encode a batch in the plaintext protocol; non-finite values are dropped
pub fn encode_batch(prefix: &str, samples: &[MetricSample], cycle_timestamp: f64) -> String {
    let mut payload = String::with_capacity(samples.len() * 64);
    for sample in samples {
        if !sample.value.is_finite() {
            debug!("Dropping non-finite value for {}", sample.path);
            continue;
        }
        let timestamp = sample.timestamp_or(cycle_timestamp);
        // Writing into a String cannot fail
        let _ = if prefix.is_empty() {
            writeln!(payload, "{} {} {}", sample.path, sample.value, timestamp)
        } else {
            writeln!(payload, "{}.{} {} {}", prefix, sample.path, sample.value, timestamp)
        };
    }
    payload
}

#[async_trait]
impl MetricSink for CarbonSink {
    async fn send(
        &mut self,
        samples: &[MetricSample],
        timeout_seconds: f64,
        cycle_timestamp: f64,
    ) -> Result<(), SinkError> {
        let payload = encode_batch(&self.prefix, samples, cycle_timestamp);

        if self.dry_run {
            for line in payload.lines() {
                info!("[dry run] {}", line);
            }
            return Ok(());
        }

        let budget = send_budget(timeout_seconds);
        debug!("Sending {} bytes to {} within {:?}", payload.len(), self.address, budget);
        match tokio::time::timeout(budget, self.transmit(payload.as_bytes())).await {
            Ok(result) => result,
            Err(_) => Err(SinkError::TimedOut {
                addr: self.address.clone(),
                budget,
            }),
        }
    }
}
