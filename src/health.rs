//! Health reporting for pools

use crate::metrics::PoolMetrics;

/// Failed creations in a row after which a pool is reported unhealthy
pub const CONSECUTIVE_FAILURE_THRESHOLD: u64 = 3;

/// Health status of a pool
///
/// # Examples
///
/// ```
/// use fixedpool::Pool;
///
/// let pool = Pool::new(3, || Ok::<_, std::io::Error>(1));
/// pool.prefill();
///
/// let health = pool.get_health_status();
/// assert!(health.is_healthy());
/// assert_eq!(health.idle_objects, 3);
/// ```
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether the pool is healthy
    pub is_healthy: bool,

    /// Number of warnings detected
    pub warning_count: usize,

    /// Share of create invocations that failed over the pool's lifetime
    pub creation_failure_ratio: f64,

    /// Failed create invocations since the last successful one
    pub consecutive_creation_failures: u64,

    /// Idle objects count
    pub idle_objects: usize,

    /// Idle capacity
    pub capacity: usize,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    /// Derive a health status from a metrics snapshot
    pub fn new(metrics: &PoolMetrics) -> Self {
        let creation_failure_ratio = metrics.creation_failure_ratio();
        let mut warnings = Vec::new();
        let mut is_healthy = true;

        let streak = metrics.consecutive_creation_failures;
        if streak >= CONSECUTIVE_FAILURE_THRESHOLD {
            warnings.push(format!("Creation failing: {} attempts in a row", streak));
            is_healthy = false;
        }

        if let Some(ref err) = metrics.last_creation_error {
            warnings.push(format!("Last creation error: {}", err));
        }

        if metrics.idle_objects == 0 && metrics.capacity > 0 {
            warnings.push("Pool is empty".to_string());
        }

        Self {
            is_healthy,
            warning_count: warnings.len(),
            creation_failure_ratio,
            consecutive_creation_failures: streak,
            idle_objects: metrics.idle_objects,
            capacity: metrics.capacity,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}
