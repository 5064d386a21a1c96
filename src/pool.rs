//! Core pool implementation

use crate::config::PoolConfiguration;
use crate::element::{IdleQueue, PooledElement};
use crate::errors::{BoxError, PoolError, PoolResult};
use crate::health::HealthStatus;
use crate::metrics::{MetricsTracker, PoolMetrics};
use crate::retry::{Exhausted, RetryPolicy};

use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error};

type CreateFn<T> = Box<dyn Fn() -> Result<T, BoxError> + Send + Sync>;
type TestFn<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;
type DisposeFn<T> = Box<dyn Fn(T) + Send + Sync>;

/// A borrowed value that goes back to its pool when dropped
pub struct Pooled<T> {
    value: Option<T>,
    pool: Arc<Pool<T>>,
}

impl<T> Pooled<T> {
    fn new(value: T, pool: Arc<Pool<T>>) -> Self {
        Self {
            value: Some(value),
            pool,
        }
    }

    /// Take the value out without returning it to the pool
    pub fn detach(mut self) -> T {
        self.value.take().expect("Value already taken")
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value.as_ref().expect("Value already taken")
    }
}

impl<T> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value.as_mut().expect("Value already taken")
    }
}

impl<T> Drop for Pooled<T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.return_value(value);
        }
    }
}

enum SlotOutcome {
    Queued,
    CreateFailed,
    Full,
}

/// Thread-safe pool of interchangeable objects
///
/// The pool keeps at most `capacity` idle objects. Borrowing never waits: when
/// no idle object is available a new one is created on the spot, so the number
/// of objects out on loan is not bounded by the capacity. Objects that sat idle
/// for `idle_timeout` or longer are checked by the tester before reuse, or
/// replaced when no tester is configured.
///
/// Configuration methods take the pool by value, so they can only be chained
/// before the pool is shared between threads.
pub struct Pool<T> {
    idle: IdleQueue<T>,
    create: CreateFn<T>,
    tester: Option<TestFn<T>>,
    disposer: Option<DisposeFn<T>>,
    idle_timeout: Duration,
    retry: RetryPolicy,
    operation_timeout: Option<Duration>,
    metrics: MetricsTracker,
}

impl<T: 'static> Pool<T> {
    /// Create a pool holding up to `capacity` idle objects
    ///
    /// # Examples
    ///
    /// ```
    /// use fixedpool::Pool;
    /// use std::time::Duration;
    ///
    /// let pool = Pool::new(2, || Ok::<_, std::io::Error>(Vec::<u8>::with_capacity(1024)))
    ///     .with_tester(|buf| buf.capacity() >= 1024)
    ///     .with_disposer(drop)
    ///     .with_idle_timeout(Duration::from_secs(60));
    ///
    /// assert_eq!(pool.prefill(), 2);
    /// let buf = pool.borrow().unwrap();
    /// assert!(pool.return_value(buf));
    /// ```
    pub fn new<F, E>(capacity: usize, create: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        Self::with_config(PoolConfiguration::new().with_capacity(capacity), create)
    }

    /// Create a pool from a full configuration
    ///
    /// # Panics
    ///
    /// Panics if the retry policy allows zero attempts.
    pub fn with_config<F, E>(config: PoolConfiguration, create: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        assert!(
            config.retry.attempts > 0,
            "retry policy needs at least one creation attempt"
        );

        let pool = Self {
            idle: IdleQueue::new(config.capacity),
            create: Box::new(move || create().map_err(Into::into)),
            tester: None,
            disposer: None,
            idle_timeout: config.idle_timeout,
            retry: config.retry,
            operation_timeout: config.operation_timeout,
            metrics: MetricsTracker::new(),
        };

        if config.prefill {
            pool.prefill();
        }
        pool
    }
}

impl<T> Pool<T> {
    /// Check idle objects with `tester` once they exceed the idle timeout
    pub fn with_tester<F>(mut self, tester: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.tester = Some(Box::new(tester));
        self
    }

    /// Hand every object the pool discards to `disposer`
    pub fn with_disposer<F>(mut self, disposer: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.disposer = Some(Box::new(disposer));
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_idle_timeout_secs(self, seconds: u64) -> Self {
        self.with_idle_timeout(Duration::from_secs(seconds))
    }

    /// # Panics
    ///
    /// Panics if the policy allows zero attempts.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        assert!(
            retry.attempts > 0,
            "retry policy needs at least one creation attempt"
        );
        self.retry = retry;
        self
    }

    /// Fill the open slots of the pool, one creation attempt per slot
    ///
    /// Failed creations are skipped. Returns the number of objects queued.
    pub fn prefill(&self) -> usize {
        let mut queued = 0;
        for _ in 0..self.idle.vacancy() {
            match self.prefill_slot() {
                SlotOutcome::Queued => queued += 1,
                SlotOutcome::CreateFailed => {}
                SlotOutcome::Full => break,
            }
        }
        debug!(queued, idle = self.idle.len(), "prefilled pool");
        queued
    }

    /// Borrow an object, creating one if the pool is empty
    ///
    /// Stale objects are revalidated or replaced first. Creation is retried
    /// according to the retry policy; only the last failure is reported.
    pub fn borrow(&self) -> PoolResult<T> {
        let value = match self.take_idle() {
            Some(value) => value,
            None => self.create_with_retry()?,
        };
        MetricsTracker::increment(&self.metrics.borrowed);
        Ok(value)
    }

    /// Borrow without blocking the async runtime during retry pauses
    ///
    /// The whole call is bounded by the configured operation timeout. It can
    /// only be cut short while pausing between failed creations, when no
    /// object is held, so a timeout never loses an object.
    pub async fn borrow_async(&self) -> PoolResult<T> {
        let borrow = async {
            let value = match self.take_idle() {
                Some(value) => value,
                None => self.create_with_retry_async().await?,
            };
            MetricsTracker::increment(&self.metrics.borrowed);
            Ok::<_, PoolError>(value)
        };

        match self.operation_timeout {
            Some(timeout) => tokio::time::timeout(timeout, borrow)
                .await
                .map_err(|_| PoolError::Timeout(timeout))?,
            None => borrow.await,
        }
    }

    /// Borrow an object wrapped in a guard that returns it on drop
    pub fn lease(self: &Arc<Self>) -> PoolResult<Pooled<T>> {
        let value = self.borrow()?;
        Ok(Pooled::new(value, Arc::clone(self)))
    }

    /// Put an object (borrowed or not) into the pool
    ///
    /// Returns `false` when the pool is full; the object is disposed instead.
    pub fn return_value(&self, value: T) -> bool {
        match self.idle.push(PooledElement::new(value)) {
            Ok(()) => {
                MetricsTracker::increment(&self.metrics.returned);
                true
            }
            Err(rejected) => {
                self.dispose(rejected.value, "pool full on return");
                false
            }
        }
    }

    /// Dispose every idle object, returning how many were removed
    pub fn drain(&self) -> usize {
        let mut drained = 0;
        while let Some(element) = self.idle.pop() {
            self.dispose(element.value, "pool drained");
            drained += 1;
        }
        drained
    }

    pub fn created_count(&self) -> u64 {
        MetricsTracker::read(&self.metrics.created)
    }

    pub fn tested_count(&self) -> u64 {
        MetricsTracker::read(&self.metrics.tested)
    }

    pub fn destroyed_count(&self) -> u64 {
        MetricsTracker::read(&self.metrics.destroyed)
    }

    pub fn borrowed_count(&self) -> u64 {
        MetricsTracker::read(&self.metrics.borrowed)
    }

    pub fn returned_count(&self) -> u64 {
        MetricsTracker::read(&self.metrics.returned)
    }

    pub fn creation_failure_count(&self) -> u64 {
        MetricsTracker::read(&self.metrics.creation_failures)
    }

    /// Idle objects currently in the pool
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub fn capacity(&self) -> usize {
        self.idle.capacity()
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        self.metrics.get_metrics(self.idle.len(), self.idle.capacity())
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    #[cfg(feature = "prometheus")]
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> PoolResult<String> {
        crate::metrics::MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }

    /// Get health status
    pub fn get_health_status(&self) -> HealthStatus {
        HealthStatus::new(&self.get_metrics())
    }

    /// Pop one idle object that is fit for reuse
    ///
    /// A stale object that fails revalidation (or cannot be revalidated) is
    /// disposed and `None` is returned, same as for an empty queue.
    fn take_idle(&self) -> Option<T> {
        let element = self.idle.pop()?;
        if !element.is_stale(self.idle_timeout) {
            return Some(element.value);
        }

        match self.tester {
            Some(ref tester) => {
                MetricsTracker::increment(&self.metrics.tested);
                if tester(&element.value) {
                    Some(element.value)
                } else {
                    self.dispose(element.value, "failed revalidation");
                    None
                }
            }
            None => {
                self.dispose(element.value, "idle timeout exceeded");
                None
            }
        }
    }

    fn create_once(&self) -> Result<T, BoxError> {
        match (self.create)() {
            Ok(value) => {
                self.metrics.record_creation_success();
                Ok(value)
            }
            Err(err) => {
                self.metrics.record_creation_failure(err.to_string());
                Err(err)
            }
        }
    }

    fn create_with_retry(&self) -> PoolResult<T> {
        self.retry
            .run(|| self.create_once())
            .map_err(Self::creation_failed)
    }

    async fn create_with_retry_async(&self) -> PoolResult<T> {
        self.retry
            .run_async(|| self.create_once())
            .await
            .map_err(Self::creation_failed)
    }

    fn creation_failed(exhausted: Exhausted<BoxError>) -> PoolError {
        error!(
            attempts = exhausted.attempts,
            error = %exhausted.last,
            "giving up on object creation"
        );
        PoolError::CreationFailed {
            attempts: exhausted.attempts,
            source: exhausted.last,
        }
    }

    fn prefill_slot(&self) -> SlotOutcome {
        let Ok(value) = self.create_once() else {
            return SlotOutcome::CreateFailed;
        };
        match self.idle.push(PooledElement::new(value)) {
            Ok(()) => SlotOutcome::Queued,
            Err(rejected) => {
                self.dispose(rejected.value, "pool full during prefill");
                SlotOutcome::Full
            }
        }
    }

    fn dispose(&self, value: T, reason: &'static str) {
        MetricsTracker::increment(&self.metrics.destroyed);
        debug!(reason, "disposing pooled object");
        if let Some(ref disposer) = self.disposer {
            disposer(value);
        }
    }
}

impl<T: Send + 'static> Pool<T> {
    /// Fill the open slots concurrently, one blocking creation task per slot
    pub async fn prefill_async(self: &Arc<Self>) -> PoolResult<usize> {
        let mut tasks = JoinSet::new();
        for _ in 0..self.idle.vacancy() {
            let pool = Arc::clone(self);
            tasks.spawn_blocking(move || pool.prefill_slot());
        }

        let mut queued = 0;
        while let Some(outcome) = tasks.join_next().await {
            match outcome.map_err(|_| PoolError::Cancelled)? {
                SlotOutcome::Queued => queued += 1,
                SlotOutcome::CreateFailed | SlotOutcome::Full => {}
            }
        }
        debug!(queued, idle = self.idle.len(), "prefilled pool concurrently");
        Ok(queued)
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("capacity", &self.idle.capacity())
            .field("idle", &self.idle.len())
            .field("idle_timeout", &self.idle_timeout)
            .field("retry", &self.retry)
            .field("has_tester", &self.tester.is_some())
            .field("has_disposer", &self.disposer.is_some())
            .finish_non_exhaustive()
    }
}
