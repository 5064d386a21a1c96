//! Counters, snapshots and export for pools

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of a pool's counters
///
/// Each counter is read independently; two counters from the same snapshot
/// are not guaranteed to be mutually consistent under concurrent use.
///
/// # Examples
///
/// ```
/// use fixedpool::Pool;
///
/// let pool = Pool::new(2, || Ok::<_, std::io::Error>(5));
/// let value = pool.borrow().unwrap();
/// pool.return_value(value);
///
/// let metrics = pool.get_metrics();
/// assert_eq!(metrics.created, 1);
/// assert_eq!(metrics.borrowed, 1);
/// assert_eq!(metrics.returned, 1);
/// assert_eq!(metrics.idle_objects, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PoolMetrics {
    /// Successful create invocations
    pub created: u64,

    /// Objects disposed by the pool
    pub destroyed: u64,

    /// Validation callback invocations
    pub tested: u64,

    /// Successful borrows
    pub borrowed: u64,

    /// Returns accepted into the queue
    pub returned: u64,

    /// Failed create invocations
    pub creation_failures: u64,

    /// Failed create invocations since the last successful one
    pub consecutive_creation_failures: u64,

    /// Message of the latest creation failure, cleared by the next success
    pub last_creation_error: Option<String>,

    /// Current idle objects
    pub idle_objects: usize,

    /// Idle capacity
    pub capacity: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("created".to_string(), self.created.to_string());
        metrics.insert("destroyed".to_string(), self.destroyed.to_string());
        metrics.insert("tested".to_string(), self.tested.to_string());
        metrics.insert("borrowed".to_string(), self.borrowed.to_string());
        metrics.insert("returned".to_string(), self.returned.to_string());
        metrics.insert(
            "creation_failures".to_string(),
            self.creation_failures.to_string(),
        );
        metrics.insert(
            "consecutive_creation_failures".to_string(),
            self.consecutive_creation_failures.to_string(),
        );
        metrics.insert("idle_objects".to_string(), self.idle_objects.to_string());
        metrics.insert("capacity".to_string(), self.capacity.to_string());
        if let Some(ref err) = self.last_creation_error {
            metrics.insert("last_creation_error".to_string(), err.clone());
        }
        metrics
    }

    /// Share of create invocations that failed (0.0 to 1.0)
    pub fn creation_failure_ratio(&self) -> f64 {
        let attempts = self.created + self.creation_failures;
        if attempts == 0 {
            0.0
        } else {
            self.creation_failures as f64 / attempts as f64
        }
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "prometheus")]
pub struct MetricsExporter;

#[cfg(feature = "prometheus")]
impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use fixedpool::Pool;
    /// use std::collections::HashMap;
    ///
    /// let pool = Pool::new(3, || Ok::<_, std::io::Error>(0u8));
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("my_pool", Some(&tags)).unwrap();
    /// assert!(output.contains("fixedpool_objects_idle"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> crate::PoolResult<String> {
        use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};

        let mut labels = HashMap::new();
        labels.insert("pool".to_string(), pool_name.to_string());
        if let Some(tags) = tags {
            for (key, value) in tags {
                labels.insert(key.clone(), value.clone());
            }
        }

        let registry = Registry::new_custom(Some("fixedpool".to_string()), Some(labels))
            .map_err(Self::to_pool_error)?;

        let gauges = [
            ("objects_idle", "Current idle objects", metrics.idle_objects),
            ("capacity", "Idle capacity", metrics.capacity),
        ];
        for (name, help, value) in gauges {
            let gauge = IntGauge::with_opts(Opts::new(name, help)).map_err(Self::to_pool_error)?;
            gauge.set(value as i64);
            registry
                .register(Box::new(gauge))
                .map_err(Self::to_pool_error)?;
        }

        let counters = [
            ("objects_created_total", "Objects created", metrics.created),
            ("objects_destroyed_total", "Objects disposed", metrics.destroyed),
            ("objects_tested_total", "Objects revalidated", metrics.tested),
            ("objects_borrowed_total", "Objects borrowed", metrics.borrowed),
            ("objects_returned_total", "Objects returned", metrics.returned),
            (
                "creation_failures_total",
                "Failed creation attempts",
                metrics.creation_failures,
            ),
        ];
        for (name, help, value) in counters {
            let counter =
                IntCounter::with_opts(Opts::new(name, help)).map_err(Self::to_pool_error)?;
            counter.inc_by(value);
            registry
                .register(Box::new(counter))
                .map_err(Self::to_pool_error)?;
        }

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .map_err(Self::to_pool_error)?;
        String::from_utf8(buffer).map_err(|e| crate::PoolError::MetricsExport(e.to_string()))
    }

    fn to_pool_error(err: prometheus::Error) -> crate::PoolError {
        crate::PoolError::MetricsExport(err.to_string())
    }
}

/// Internal metrics tracker
pub(crate) struct MetricsTracker {
    pub created: AtomicU64,
    pub destroyed: AtomicU64,
    pub tested: AtomicU64,
    pub borrowed: AtomicU64,
    pub returned: AtomicU64,
    pub creation_failures: AtomicU64,
    consecutive_failures: AtomicU64,
    last_creation_error: Mutex<Option<String>>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            created: AtomicU64::new(0),
            destroyed: AtomicU64::new(0),
            tested: AtomicU64::new(0),
            borrowed: AtomicU64::new(0),
            returned: AtomicU64::new(0),
            creation_failures: AtomicU64::new(0),
            consecutive_failures: AtomicU64::new(0),
            last_creation_error: Mutex::new(None),
        }
    }

    #[inline]
    pub fn increment(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn read(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    pub fn record_creation_success(&self) {
        Self::increment(&self.created);
        if self.consecutive_failures.swap(0, Ordering::Relaxed) > 0 {
            *self.last_creation_error.lock() = None;
        }
    }

    pub fn record_creation_failure(&self, message: String) {
        Self::increment(&self.creation_failures);
        *self.last_creation_error.lock() = Some(message);
        Self::increment(&self.consecutive_failures);
    }

    pub fn get_metrics(&self, idle: usize, capacity: usize) -> PoolMetrics {
        PoolMetrics {
            created: Self::read(&self.created),
            destroyed: Self::read(&self.destroyed),
            tested: Self::read(&self.tested),
            borrowed: Self::read(&self.borrowed),
            returned: Self::read(&self.returned),
            creation_failures: Self::read(&self.creation_failures),
            consecutive_creation_failures: Self::read(&self.consecutive_failures),
            last_creation_error: self.last_creation_error.lock().clone(),
            idle_objects: idle,
            capacity,
        }
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}
