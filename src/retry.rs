//! Bounded retry for object creation

use std::fmt::Display;
use std::time::Duration;
use tracing::warn;

/// How many times creation is attempted, and the pause between failures
///
/// # Examples
///
/// ```
/// use fixedpool::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(3, Duration::ZERO);
/// let mut calls = 0;
/// let result: Result<u32, _> = policy.run(|| {
///     calls += 1;
///     if calls < 2 { Err("not yet") } else { Ok(7) }
/// });
///
/// assert_eq!(result.unwrap(), 7);
/// assert_eq!(calls, 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: usize,

    /// Pause after each failed attempt except the last
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// The last error of a retry run that never succeeded
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: usize,
    pub last: E,
}

impl RetryPolicy {
    pub fn new(attempts: usize, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// A single attempt, no pause
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Run `op` until it succeeds or the attempts are used up
    pub fn run<T, E, F>(&self, mut op: F) -> Result<T, Exhausted<E>>
    where
        F: FnMut() -> Result<T, E>,
        E: Display,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(attempt, attempts, error = %err, "creation attempt failed");
                    if attempt >= attempts {
                        return Err(Exhausted { attempts: attempt, last: err });
                    }
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Same as [`RetryPolicy::run`], pausing with the tokio timer so the
    /// caller can be cancelled between attempts
    pub async fn run_async<T, E, F>(&self, mut op: F) -> Result<T, Exhausted<E>>
    where
        F: FnMut() -> Result<T, E>,
        E: Display,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(attempt, attempts, error = %err, "creation attempt failed");
                    if attempt >= attempts {
                        return Err(Exhausted { attempts: attempt, last: err });
                    }
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}
