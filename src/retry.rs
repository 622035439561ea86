//! Bounded retry for transient native I/O failures.
//!
//! Every component that performs native I/O funnels its calls through a
//! [`RetryExecutor`]. Canonicalization errors are deterministic and are never
//! retried; only the caller-selected [`ErrorKind`]s are. Retries block the
//! calling thread for the configured delay; there is no async variant.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ErrorKind, Result, WidePathError};

/// Observer for retry events. Injected rather than global so tests can
/// substitute a recorder.
pub trait RetrySink: Send + Sync {
    /// Called once per failed attempt that will be retried.
    fn on_retry(&self, attempt: u32, error: &WidePathError);
}

/// Default sink: forwards retry events to `tracing` at WARN level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl RetrySink for TracingSink {
    fn on_retry(&self, attempt: u32, error: &WidePathError) {
        tracing::warn!(attempt, error = %error, "transient filesystem failure, retrying");
    }
}

/// Attempt budget and inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Must be at least 1.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// One attempt, no delay: plain pass-through execution.
    pub const fn single() -> Self {
        RetryPolicy { max_attempts: 1, delay: Duration::ZERO }
    }
}

/// Runs fallible operations under a [`RetryPolicy`], retrying only errors
/// whose kind is in the configured retryable set. A success short-circuits
/// remaining attempts; on exhaustion the last error propagates unchanged.
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    retryable: Arc<[ErrorKind]>,
    sink: Arc<dyn RetrySink>,
}

impl fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .field("retryable", &self.retryable)
            .finish_non_exhaustive()
    }
}

impl RetryExecutor {
    /// Fails with [`WidePathError::InvalidArgument`] before any attempt when
    /// the policy allows zero attempts.
    pub fn new(
        policy: RetryPolicy,
        retryable: &[ErrorKind],
        sink: Arc<dyn RetrySink>,
    ) -> Result<Self> {
        if policy.max_attempts == 0 {
            return Err(WidePathError::InvalidArgument(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(RetryExecutor { policy, retryable: retryable.into(), sink })
    }

    /// Pass-through executor: one attempt, nothing retryable.
    pub fn direct() -> Self {
        RetryExecutor {
            policy: RetryPolicy::single(),
            retryable: Vec::new().into(),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn run<T, F>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut attempt = 1u32;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !self.retryable.contains(&err.kind()) || attempt >= self.policy.max_attempts
                    {
                        return Err(err);
                    }
                    self.sink.on_retry(attempt, &err);
                    if !self.policy.delay.is_zero() {
                        std::thread::sleep(self.policy.delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
