use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static UNSAFE_PATH_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\-]").expect("static regex is valid"));

/// A single metric value destined for the sink
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    /// Dot-delimited hierarchical name, without the sink's prefix
    pub path: String,
    pub value: f64,
    /// Seconds since epoch; `None` means "stamp with the cycle timestamp"
    pub timestamp: Option<i64>,
}

impl MetricSample {
    pub fn new(path: impl Into<String>, value: f64) -> Self {
        Self {
            path: path.into(),
            value,
            timestamp: None,
        }
    }

    /// Create a sample carrying its own measurement time
    pub fn at(path: impl Into<String>, value: f64, timestamp: i64) -> Self {
        Self {
            path: path.into(),
            value,
            timestamp: Some(timestamp),
        }
    }

    /// Timestamp to send, falling back to the cycle timestamp
    pub fn timestamp_or(&self, cycle_timestamp: f64) -> i64 {
        self.timestamp.unwrap_or(cycle_timestamp as i64)
    }
}

impl fmt::Display for MetricSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.timestamp {
            Some(ts) => write!(f, "{}={} @{}", self.path, self.value, ts),
            None => write!(f, "{}={}", self.path, self.value),
        }
    }
}

/// Make an upstream name safe to use as one path component.
///
/// Dots would otherwise add hierarchy levels, so hostnames like
/// `node-1.example.com` become `node-1_example_com`.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned = UNSAFE_PATH_CHARS.replace_all(raw.trim(), "_");
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned.into_owned()
    }
}

/// Join already sanitised components into a dotted path
pub fn metric_path(components: &[&str]) -> String {
    components
        .iter()
        .filter(|c| !c.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}

/// Turn a Mesos gauge key such as `master/cpus_total` into path components
pub fn gauge_path(key: &str) -> String {
    key.split('/')
        .map(sanitize_component)
        .collect::<Vec<_>>()
        .join(".")
}
