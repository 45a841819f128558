// Re-export modules so they can be used from tests
pub mod carbon;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod mesos;
pub mod metrics;
pub mod singularity;
