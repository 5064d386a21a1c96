//! # fixedpool
//!
//! Bounded, thread-safe object pool for expensive resources such as
//! connections, buffers or workers.
//!
//! ## Features
//!
//! - Lock-free bounded storage of idle objects
//! - Non-blocking borrow: an empty pool creates a fresh object instead of waiting
//! - Idle revalidation: objects idle past a timeout are tested or replaced
//! - Bounded creation retry with a pause between attempts
//! - Optional disposer for every object the pool discards
//! - Async borrow with timeout, concurrent prefill
//! - RAII leases that return objects on drop
//! - Counters, health status and Prometheus export
//!
//! The capacity bounds *idle* objects only. A burst of borrows against an
//! empty pool can create more live objects than the capacity; the surplus is
//! disposed when returned to a full pool.
//!
//! ## Quick Start
//!
//! ```rust
//! use fixedpool::Pool;
//!
//! let pool = Pool::new(2, || Ok::<_, std::io::Error>(String::from("resource")))
//!     .with_tester(|s| !s.is_empty())
//!     .with_idle_timeout_secs(60);
//! pool.prefill();
//!
//! let value = pool.borrow().unwrap();
//! println!("Got: {}", value);
//! assert!(pool.return_value(value));
//! assert_eq!(pool.borrowed_count(), 1);
//! ```

mod config;
mod element;
mod errors;
mod health;
mod metrics;
mod pool;
mod retry;

pub use config::{DEFAULT_CAPACITY, DEFAULT_IDLE_TIMEOUT, PoolConfiguration};
pub use errors::{BoxError, PoolError, PoolResult};
pub use health::HealthStatus;
#[cfg(feature = "prometheus")]
pub use metrics::MetricsExporter;
pub use metrics::PoolMetrics;
pub use pool::{Pool, Pooled};
pub use retry::{Exhausted, RetryPolicy};
