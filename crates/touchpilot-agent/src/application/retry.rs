//! Connection retry policy.
//!
//! Sinks make exactly one attempt per `connect` call.  This module decides how
//! often and for how long to repeat that attempt:
//!
//! - at startup the budget is long (default 60 s) and exhausting it is fatal;
//! - between cycles the budget is short (a few seconds), so a dropped device
//!   costs at most one abandoned cycle before the agent tries again.
//!
//! Time is measured with `tokio::time::Instant`, so tests can run the whole
//! policy on a paused clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::time::{self, Instant};
use tracing::{info, warn};

use crate::infrastructure::transport::{TransportError, TransportSink};

/// How persistently to poll a sink's `connect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Sleep between two failed attempts.
    pub interval: Duration,
    /// No new attempt starts once `elapsed + interval` would exceed this.
    pub timeout: Duration,
    /// Optional hard cap on the number of attempts.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(60),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once and gives up.
    pub fn once() -> Self {
        Self {
            interval: Duration::ZERO,
            timeout: Duration::ZERO,
            max_attempts: Some(1),
        }
    }
}

/// The retry budget ran out.
#[derive(Debug, Error)]
pub enum RetryError {
    #[error("gave up after {attempts} attempt(s) in {elapsed:?}: {last_error}")]
    Exhausted {
        attempts: u32,
        elapsed: Duration,
        #[source]
        last_error: TransportError,
    },

    /// The running flag was cleared before a connection was made.
    #[error("connect cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

/// Calls `sink.connect()` until it succeeds or `policy` is exhausted.
///
/// Returns the number of attempts made.
///
/// # Errors
///
/// Returns [`RetryError::Exhausted`] carrying the last connect error.
pub async fn connect_with_retry<S>(sink: &mut S, policy: &RetryPolicy) -> Result<u32, RetryError>
where
    S: TransportSink + ?Sized,
{
    connect_with_retry_while(sink, policy, &AtomicBool::new(true)).await
}

/// Like [`connect_with_retry`], but stops as soon as `running` is `false`.
///
/// The flag is checked before every attempt, so cancellation takes effect
/// within one `interval`.
///
/// # Errors
///
/// Returns [`RetryError::Cancelled`] when the flag is cleared and
/// [`RetryError::Exhausted`] when the budget runs out.
pub async fn connect_with_retry_while<S>(
    sink: &mut S,
    policy: &RetryPolicy,
    running: &AtomicBool,
) -> Result<u32, RetryError>
where
    S: TransportSink + ?Sized,
{
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        if !running.load(Ordering::Relaxed) {
            info!(attempts, "connect cancelled");
            return Err(RetryError::Cancelled { attempts });
        }
        attempts += 1;
        let last_error = match sink.connect().await {
            Ok(()) => {
                if attempts > 1 {
                    info!(attempts, family = %sink.family(), "transport connected after retries");
                }
                return Ok(attempts);
            }
            Err(e) => e,
        };

        let elapsed = started.elapsed();
        let capped = policy.max_attempts.is_some_and(|max| attempts >= max);
        if capped || elapsed + policy.interval > policy.timeout {
            return Err(RetryError::Exhausted {
                attempts,
                elapsed,
                last_error,
            });
        }

        warn!(
            attempt = attempts,
            "connect failed: {last_error}; retrying in {:?}", policy.interval
        );
        time::sleep(policy.interval).await;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use touchpilot_core::TransportFamily;

    use super::*;
    use crate::infrastructure::transport::mock::RecordingSink;
    use crate::infrastructure::transport::ConnectionState;

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(2));
        assert_eq!(policy.timeout, Duration::from_secs(60));
        assert_eq!(policy.max_attempts, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connects_after_transient_failures() {
        // Arrange
        let mut sink = RecordingSink::new(TransportFamily::Gadget).failing_connects(2);
        let started = Instant::now();

        // Act
        let attempts = connect_with_retry(&mut sink, &RetryPolicy::default()).await.unwrap();

        // Assert – two sleeps of the interval between three attempts
        assert_eq!(attempts, 3);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert_eq!(sink.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_bounds_the_number_of_attempts() {
        // Arrange – never connects; 5 s budget with 2 s interval
        let mut sink = RecordingSink::new(TransportFamily::Gatt).failing_connects(u32::MAX);
        let policy = RetryPolicy {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(5),
            max_attempts: None,
        };

        // Act
        let result = connect_with_retry(&mut sink, &policy).await;

        // Assert – attempts at t=0, 2, 4; a fourth would start after 6 s
        match result {
            Err(RetryError::Exhausted { attempts, elapsed, .. }) => {
                assert_eq!(attempts, 3);
                assert_eq!(elapsed, Duration::from_secs(4));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_attempts_caps_retries() {
        let mut sink = RecordingSink::new(TransportFamily::LineBridge).failing_connects(u32::MAX);
        let policy = RetryPolicy {
            max_attempts: Some(2),
            ..RetryPolicy::default()
        };

        let result = connect_with_retry(&mut sink, &policy).await;

        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 2, .. })));
        assert_eq!(sink.connect_attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleared_flag_stops_retrying_within_one_interval() {
        // Arrange – never connects; the flag drops 3 s into a 60 s budget
        let mut sink = RecordingSink::new(TransportFamily::Gatt).failing_connects(u32::MAX);
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(3)).await;
            flag.store(false, Ordering::Relaxed);
        });
        let started = Instant::now();

        // Act
        let result = connect_with_retry_while(&mut sink, &RetryPolicy::default(), &running).await;

        // Assert – attempts at t=0 and t=2; the check at t=4 sees the flag
        assert!(matches!(result, Err(RetryError::Cancelled { attempts: 2 })));
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert_eq!(sink.connect_attempts, 2);
    }

    #[tokio::test]
    async fn test_once_policy_makes_a_single_attempt() {
        let mut sink = RecordingSink::new(TransportFamily::Gadget).failing_connects(1);

        let result = connect_with_retry(&mut sink, &RetryPolicy::once()).await;

        assert!(result.is_err());
        assert_eq!(sink.connect_attempts, 1);
    }
}
