use std::time::Duration;

use chrono::{Local, NaiveDateTime, Timelike};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const BUCKET_KEY_FORMAT: &str = "%Y%m%d%H%M%S";

/// Source of local wall clock time. Bucket keys are derived from it, so tests substitute a clock
///  that follows tokio's (pausable) time.
pub trait WallClock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// formats a timestamp, truncated to the second, as `YYYYMMDDHHMMSS`
pub fn bucket_key(at: NaiveDateTime) -> String {
    at.format(BUCKET_KEY_FORMAT).to_string()
}

/// formats a bucket key as `YYYY-MM-DD-HH:MM:SS` for reports, falling back to the raw key if it
///  does not have the expected shape
pub fn display_bucket_key(key: &str) -> String {
    match NaiveDateTime::parse_from_str(key, BUCKET_KEY_FORMAT) {
        Ok(at) => at.format("%Y-%m-%d-%H:%M:%S").to_string(),
        Err(_) => key.to_string(),
    }
}

fn subsec(at: NaiveDateTime) -> Duration {
    Duration::from_nanos(u64::from(at.nanosecond()))
}

/// Waits until the wall clock's sub-second part is below `threshold`, so that a session starts
///  right after a second boundary. Returns `false` if cancelled while waiting.
pub async fn wait_for_second_boundary(
    clock: &dyn WallClock,
    threshold: Duration,
    poll_interval: Duration,
    cancel: &CancellationToken,
) -> bool {
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        if subsec(clock.now()) < threshold {
            debug!("aligned to second boundary");
            return true;
        }
        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
pub use test_clock::TokioClock;


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn at(h: u32, m: u32, s: u32, milli: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
            .and_hms_milli_opt(h, m, s, milli).unwrap()
    }

    #[rstest]
    #[case::midnight(at(0, 0, 0, 0), "20240229000000")]
    #[case::truncates_fraction(at(23, 59, 59, 999), "20240229235959")]
    #[case::afternoon(at(13, 7, 5, 500), "20240229130705")]
    fn test_bucket_key(#[case] at: NaiveDateTime, #[case] expected: &str) {
        assert_eq!(bucket_key(at), expected);
    }

    #[rstest]
    #[case::regular("20240229130705", "2024-02-29-13:07:05")]
    #[case::malformed("2024", "2024")]
    fn test_display_bucket_key(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(display_bucket_key(key), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_second_boundary() {
        let clock = TokioClock::starting_at(at(10, 0, 0, 300));
        let start = tokio::time::Instant::now();

        assert!(wait_for_second_boundary(&clock, Duration::from_millis(50), Duration::from_millis(5), &CancellationToken::new()).await);

        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(700));
        assert!(waited < Duration::from_millis(750));
        assert!(subsec(clock.now()) < Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_second_boundary_cancelled() {
        let clock = TokioClock::starting_at(at(10, 0, 0, 300));
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(!wait_for_second_boundary(&clock, Duration::from_millis(50), Duration::from_millis(5), &cancel).await);
    }
}
