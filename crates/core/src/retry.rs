//! Bounded fixed-delay retry.
//!
//! Every pipeline stage that can hit a transient failure (storage listing,
//! queue polling, ledger RPC) runs under [`retry_fixed`]. The combinator
//! retries only errors the stage classifies as transient, sleeps a fixed
//! interval between attempts, and on exhaustion returns the *original*
//! cause unchanged so the caller sees what actually went wrong.

use std::fmt::Display;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::warn;

/// Distinguishes transient failures (worth retrying in place) from
/// permanent ones (propagate immediately).
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Attempt count and fixed sleep between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// A single attempt, no sleeping.
    pub const fn once() -> Self {
        Self {
            attempts: 1,
            interval: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

/// Run `op` against `state` up to `policy.attempts` times.
///
/// `state` is threaded through by mutable reference so a stage keeps its
/// progress across attempts: a restore that already pulled half the backup
/// bucket does not re-download those objects on retry.
pub async fn retry_fixed<S, T, E, F>(
    policy: RetryPolicy,
    stage: &str,
    state: &mut S,
    mut op: F,
) -> Result<T, E>
where
    E: Transient + Display,
    F: for<'a> FnMut(&'a mut S) -> BoxFuture<'a, Result<T, E>>,
{
    let mut attempt = 1u32;
    loop {
        match op(state).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.attempts => {
                warn!(stage, attempt, error = %e, "transient failure, retrying");
                attempt += 1;
                tokio::time::sleep(policy.interval).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    enum TestError {
        #[error("transient")]
        Transient,
        #[error("fatal")]
        Fatal,
    }

    impl Transient for TestError {
        fn is_transient(&self) -> bool {
            matches!(self, TestError::Transient)
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut calls = 0u32;
        let result: Result<u32, TestError> =
            retry_fixed(policy, "test", &mut calls, |calls| {
                Box::pin(async move {
                    *calls += 1;
                    if *calls < 3 {
                        Err(TestError::Transient)
                    } else {
                        Ok(*calls)
                    }
                })
            })
            .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_original_cause() {
        let policy = RetryPolicy::new(2, Duration::ZERO);
        let mut calls = 0u32;
        let result: Result<(), TestError> =
            retry_fixed(policy, "test", &mut calls, |calls| {
                Box::pin(async move {
                    *calls += 1;
                    Err(TestError::Transient)
                })
            })
            .await;
        assert!(matches!(result, Err(TestError::Transient)));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_fatal_not_retried() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let mut calls = 0u32;
        let result: Result<(), TestError> =
            retry_fixed(policy, "test", &mut calls, |calls| {
                Box::pin(async move {
                    *calls += 1;
                    Err(TestError::Fatal)
                })
            })
            .await;
        assert!(matches!(result, Err(TestError::Fatal)));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_state_survives_attempts() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut restored: Vec<u32> = Vec::new();
        let result: Result<usize, TestError> =
            retry_fixed(policy, "test", &mut restored, |restored| {
                Box::pin(async move {
                    // Each attempt resumes where the last one stopped.
                    let next = restored.len() as u32;
                    restored.push(next);
                    if restored.len() < 3 {
                        Err(TestError::Transient)
                    } else {
                        Ok(restored.len())
                    }
                })
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(restored, vec![0, 1, 2]);
    }
}
