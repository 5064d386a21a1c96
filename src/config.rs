//! Pool configuration options

use crate::retry::RetryPolicy;
use std::time::Duration;

/// Default number of idle objects a pool keeps
pub const DEFAULT_CAPACITY: usize = 10;

/// Default idle time after which an object is revalidated
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for pool behavior
///
/// # Examples
///
/// ```
/// use fixedpool::{PoolConfiguration, RetryPolicy};
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_capacity(20)
///     .with_idle_timeout(Duration::from_secs(900))
///     .with_retry(RetryPolicy::new(5, Duration::from_millis(200)));
///
/// assert_eq!(config.capacity, 20);
/// assert_eq!(config.retry.attempts, 5);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolConfiguration {
    /// Maximum number of idle objects held by the pool
    pub capacity: usize,

    /// Objects idle longer than this are revalidated (or replaced) on borrow
    pub idle_timeout: Duration,

    /// How replacements are retried when the create callback fails
    pub retry: RetryPolicy,

    /// Upper bound for async borrows
    pub operation_timeout: Option<Duration>,

    /// Fill the pool to capacity during construction
    pub prefill: bool,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            retry: RetryPolicy::default(),
            operation_timeout: Some(Duration::from_secs(30)),
            prefill: false,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the idle capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use fixedpool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::new().with_capacity(0);
    /// assert_eq!(config.capacity, 0);
    /// ```
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the idle timeout
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the creation retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set async operation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Wait indefinitely in async borrows
    pub fn without_timeout(mut self) -> Self {
        self.operation_timeout = None;
        self
    }

    /// Prefill the pool when it is constructed
    pub fn with_prefill(mut self) -> Self {
        self.prefill = true;
        self
    }
}
