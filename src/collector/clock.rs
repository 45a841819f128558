use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use std::time::Duration;

const NANOS_PER_SECOND: u64 = 1_000_000_000;
const NANOS_PER_MINUTE: u64 = 60 * NANOS_PER_SECOND;

/// Wall-clock source for the collection loop
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

/// The real clock: `Utc::now` and tokio timers
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Time left until the next whole minute (second 0, sub-second 0).
///
/// Exactly on a boundary the delay is zero; otherwise it lies in (0, 60s).
pub fn delay_to_next_minute(now: DateTime<Utc>) -> Duration {
    // nanosecond() exceeds 1e9 during a leap second
    let sub_second = u64::from(now.nanosecond()).min(NANOS_PER_SECOND - 1);
    let into_minute = u64::from(now.second()) * NANOS_PER_SECOND + sub_second;
    Duration::from_nanos((NANOS_PER_MINUTE - into_minute) % NANOS_PER_MINUTE)
}

/// Seconds since epoch as a float, as sent to the sink
pub fn epoch_seconds(time: DateTime<Utc>) -> f64 {
    time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) / 1e9
}
