//! Shared fakes for the integration tests: clocks, scripted sources, a
//! recording sink and a minimal HTTP server for the Mesos/Singularity APIs.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use mesos_stats::collector::Clock;
use mesos_stats::error::{SinkError, SourceError};
use mesos_stats::metrics::{MetricSample, MetricSink, MetricSource};

pub fn utc(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
}

/// Clock whose sleeps complete immediately by moving time forward
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn at(secs: i64) -> Self {
        Self {
            now: Arc::new(Mutex::new(utc(secs))),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + ChronoDuration::from_std(by).unwrap();
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Clock whose sleeps never finish, for interrupt tests
pub struct StuckClock;

#[async_trait]
impl Clock for StuckClock {
    fn now(&self) -> DateTime<Utc> {
        utc(1_700_000_000)
    }

    async fn sleep(&self, _duration: Duration) {
        std::future::pending::<()>().await;
    }
}

/// Ordered record of reset/sample calls across several sources
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub enum Step {
    Samples(Vec<MetricSample>),
    Fail,
    Panic,
    Hang,
}

/// Source that plays back one step per cycle and logs every call
pub struct ScriptedSource {
    name: &'static str,
    steps: VecDeque<Step>,
    log: CallLog,
    clock: Option<(ManualClock, Duration)>,
    panic_on_reset: bool,
}

impl ScriptedSource {
    pub fn new(name: &'static str, steps: Vec<Step>, log: &CallLog) -> Self {
        Self {
            name,
            steps: steps.into(),
            log: log.clone(),
            clock: None,
            panic_on_reset: false,
        }
    }

    /// Make every reset call panic
    pub fn panicking_on_reset(mut self) -> Self {
        self.panic_on_reset = true;
        self
    }

    /// Make each sample call take `by` of simulated time
    pub fn taking(mut self, clock: &ManualClock, by: Duration) -> Self {
        self.clock = Some((clock.clone(), by));
        self
    }

    pub fn boxed(self) -> Box<dyn MetricSource> {
        Box::new(self)
    }
}

#[async_trait]
impl MetricSource for ScriptedSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn reset(&mut self) {
        self.log.lock().unwrap().push(format!("reset:{}", self.name));
        if self.panic_on_reset {
            panic!("scripted reset panic in {}", self.name);
        }
    }

    async fn sample(&mut self) -> Result<Vec<MetricSample>, SourceError> {
        self.log.lock().unwrap().push(format!("sample:{}", self.name));
        if let Some((clock, by)) = &self.clock {
            clock.advance(*by);
        }
        match self.steps.pop_front() {
            Some(Step::Samples(samples)) => Ok(samples),
            Some(Step::Fail) | None => Err(SourceError::NoReachableSlaves { attempted: 1 }),
            Some(Step::Panic) => panic!("scripted panic in {}", self.name),
            Some(Step::Hang) => std::future::pending().await,
        }
    }
}

/// Batch as seen by the sink
#[derive(Debug, Clone)]
pub struct SentBatch {
    pub samples: Vec<MetricSample>,
    pub timeout_seconds: f64,
    pub cycle_timestamp: f64,
}

/// Sink that records batches and can be told to fail or panic
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub batches: Arc<Mutex<Vec<SentBatch>>>,
    pub fail: bool,
    pub panic: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panic: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentBatch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricSink for RecordingSink {
    async fn send(
        &mut self,
        samples: &[MetricSample],
        timeout_seconds: f64,
        cycle_timestamp: f64,
    ) -> Result<(), SinkError> {
        self.batches.lock().unwrap().push(SentBatch {
            samples: samples.to_vec(),
            timeout_seconds,
            cycle_timestamp,
        });
        if self.panic {
            panic!("sink boom");
        }
        if self.fail {
            return Err(SinkError::Connect {
                addr: "carbon:2003".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            });
        }
        Ok(())
    }
}

pub fn samples(prefix: &str, count: usize) -> Vec<MetricSample> {
    (0..count)
        .map(|i| MetricSample::new(format!("{}.m{}", prefix, i), i as f64))
        .collect()
}

/// Minimal HTTP/1.1 server answering GETs from a fixed route table
pub struct FakeHttp {
    pub addr: SocketAddr,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl FakeHttp {
    /// Start serving; `routes` receives the bound address so bodies can refer to it
    pub async fn start<F>(routes: F) -> Self
    where
        F: FnOnce(SocketAddr) -> HashMap<String, (u16, String)>,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes = Arc::new(routes(addr));
        let hits = Arc::new(Mutex::new(HashMap::new()));

        let server_hits = hits.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(handle(socket, routes.clone(), server_hits.clone()));
            }
        });

        Self { addr, hits }
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

async fn handle(
    mut socket: TcpStream,
    routes: Arc<HashMap<String, (u16, String)>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        request.extend_from_slice(&chunk[..n]);
        if request.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let head = String::from_utf8_lossy(&request);
    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    *hits.lock().unwrap().entry(path.clone()).or_default() += 1;

    let (status, body) = routes
        .get(&path)
        .cloned()
        .unwrap_or((404, "{}".to_string()));
    let response = format!(
        "HTTP/1.1 {} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Address of a port nothing listens on
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
