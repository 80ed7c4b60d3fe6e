//! Wall-Clock Limits
//!
//! Every guarded command runs under a hard wall-clock budget. There is no
//! grace period: when the budget runs out the process is killed.

use std::future::Future;
use std::time::Duration;
use tokio::time;

/// Wall-clock budget for a single command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClockLimit {
    duration: Duration,
}

impl Default for WallClockLimit {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl WallClockLimit {
    /// Create a new limit
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use netprobe::tools::WallClockLimit;
    ///
    /// let limit = WallClockLimit::new(Duration::from_secs(30));
    /// assert_eq!(limit.duration(), Duration::from_secs(30));
    /// ```
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Drive `future` until it completes or the limit expires
    ///
    /// Returns `None` on expiry. The future is dropped at that point, so the
    /// caller is responsible for cleaning up whatever it was waiting on.
    pub async fn run<F>(&self, future: F) -> Option<F::Output>
    where
        F: Future,
    {
        time::timeout(self.duration, future).await.ok()
    }
}
