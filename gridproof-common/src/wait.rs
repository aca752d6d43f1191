//! Deadline-bounded polling.
//!
//! Every wait in gridproof (element discovery, post-conditions) goes through
//! [`poll_until`] so the timeout is explicit at the call site rather than
//! hidden inside a driver default.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Default upper bound for a single wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default pause between probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Timeout and probe cadence for a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WaitConfig {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Run `probe` until it yields `Some`, the deadline passes, or it errors.
///
/// The probe always runs at least once, even with a zero timeout. Returns
/// `Ok(None)` when the deadline elapses; probe errors are returned as-is.
///
/// ```
/// use gridproof_common::wait::{poll_until, WaitConfig};
/// use std::time::Duration;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let mut calls = 0;
/// let found: Result<Option<u32>, ()> = poll_until(
///     WaitConfig::new(Duration::from_secs(1), Duration::from_millis(1)),
///     || {
///         calls += 1;
///         let ready = calls >= 3;
///         async move { Ok(ready.then_some(7)) }
///     },
/// )
/// .await;
/// assert_eq!(found, Ok(Some(7)));
/// # });
/// ```
pub async fn poll_until<T, E, F, Fut>(config: WaitConfig, mut probe: F) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let deadline = Instant::now() + config.timeout;
    loop {
        if let Some(value) = probe().await? {
            return Ok(Some(value));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        sleep(config.interval.min(deadline - now)).await;
    }
}
