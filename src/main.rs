// fixedpool demo binary
// Borrows and returns simulated connections, then prints the pool counters.

use fixedpool::{Pool, PoolConfiguration, RetryPolicy};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

struct Connection {
    id: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let next_id = Arc::new(AtomicU32::new(1));
    let config = PoolConfiguration::new()
        .with_capacity(3)
        .with_idle_timeout(Duration::from_millis(200))
        .with_retry(RetryPolicy::new(3, Duration::from_millis(100)))
        .with_prefill();

    let pool = Arc::new(
        Pool::with_config(config, move || {
            let id = next_id.fetch_add(1, Ordering::Relaxed);
            if id % 5 == 0 {
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
            }
            Ok(Connection { id })
        })
        .with_tester(|conn| conn.id % 2 == 1)
        .with_disposer(|conn| info!(id = conn.id, "closing connection")),
    );

    for round in 1..=3 {
        {
            let conn = pool.lease()?;
            info!(round, id = conn.id, "using connection");
        }
        std::thread::sleep(Duration::from_millis(250));
    }

    info!(drained = pool.drain(), "shutting down");
    for (key, value) in pool.export_metrics() {
        println!("  {}: {}", key, value);
    }
    Ok(())
}
