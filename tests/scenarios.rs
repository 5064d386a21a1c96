//! End-to-end pool behavior through the public API

use fixedpool::{Pool, PoolConfiguration, PoolError, RetryPolicy};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::time::Duration;

fn counting_create(
    calls: &Arc<AtomicUsize>,
) -> impl Fn() -> io::Result<usize> + Send + Sync + 'static {
    let calls = Arc::clone(calls);
    move || Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
}

#[test]
fn prefilled_objects_are_handed_out_before_new_ones_are_created() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pool = Pool::new(2, counting_create(&calls)).with_idle_timeout_secs(60);

    assert_eq!(pool.prefill(), 2);
    assert_eq!(pool.created_count(), 2);

    let first = pool.borrow().unwrap();
    let second = pool.borrow().unwrap();
    assert_eq!(pool.borrowed_count(), 2);
    assert_eq!(pool.created_count(), 2);

    let third = pool.borrow().unwrap();
    assert_eq!(pool.created_count(), 3);

    let mut values = vec![first, second, third];
    values.sort();
    assert_eq!(values, vec![1, 2, 3]);
}

#[test]
fn always_stale_pool_replaces_and_accepts_the_replacement() {
    let calls = Arc::new(AtomicUsize::new(0));
    let disposals = Arc::new(AtomicUsize::new(0));
    let d = Arc::clone(&disposals);
    let pool = Pool::new(1, counting_create(&calls))
        .with_idle_timeout_secs(0)
        .with_tester(|_| false)
        .with_disposer(move |_| {
            d.fetch_add(1, Ordering::SeqCst);
        });

    pool.prefill();
    let created_before = pool.created_count();

    let replacement = pool.borrow().unwrap();
    assert_eq!(disposals.load(Ordering::SeqCst), 1);
    assert_eq!(pool.destroyed_count(), 1);
    assert_eq!(pool.created_count(), created_before + 1);

    assert!(pool.return_value(replacement));
    assert_eq!(pool.returned_count(), 1);
}

#[test]
fn returning_into_a_full_pool_disposes_the_extra_value() {
    let disposed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&disposed);
    let pool = Pool::new(1, || Ok::<_, io::Error>(7))
        .with_idle_timeout_secs(60)
        .with_disposer(move |v| sink.lock().unwrap().push(v));

    pool.prefill();
    assert!(!pool.return_value(8));

    assert_eq!(*disposed.lock().unwrap(), vec![8]);
    assert_eq!(pool.destroyed_count(), 1);
    assert_eq!(pool.idle_count(), 1);
    assert_eq!(pool.borrow().unwrap(), 7);
}

#[test]
fn stale_object_rejected_by_tester_never_comes_back() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pool = Pool::new(1, counting_create(&calls))
        .with_idle_timeout(Duration::from_millis(20))
        .with_tester(|v| *v != 1);

    pool.prefill();
    std::thread::sleep(Duration::from_millis(30));

    assert_eq!(pool.borrow().unwrap(), 2);
    assert_eq!(pool.destroyed_count(), 1);
    assert_eq!(pool.idle_count(), 0);
    assert_eq!(pool.borrow().unwrap(), 3);
}

#[test]
fn exhausted_retries_surface_the_last_error() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let a = Arc::clone(&attempts);
    let config = PoolConfiguration::new()
        .with_capacity(1)
        .with_retry(RetryPolicy::new(3, Duration::from_millis(10)));
    let pool: Pool<String> = Pool::with_config(config, move || {
        let n = a.fetch_add(1, Ordering::SeqCst) + 1;
        Err(io::Error::other(format!("refused #{}", n)))
    });

    match pool.borrow() {
        Err(PoolError::CreationFailed { attempts: 3, source }) => {
            assert_eq!(source.to_string(), "refused #3");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(pool.borrowed_count(), 0);

    let health = pool.get_health_status();
    assert!(!health.is_healthy());
}

#[test]
fn prefill_losing_the_race_for_the_last_slot_disposes_its_object() {
    let barrier = Arc::new(Barrier::new(2));
    let calls = Arc::new(AtomicUsize::new(0));
    let disposals = Arc::new(AtomicUsize::new(0));
    let (b, c, d) = (
        Arc::clone(&barrier),
        Arc::clone(&calls),
        Arc::clone(&disposals),
    );
    let pool = Arc::new(
        Pool::new(1, move || {
            // both fillers are past their vacancy check before either pushes
            b.wait();
            Ok::<_, io::Error>(c.fetch_add(1, Ordering::SeqCst))
        })
        .with_disposer(move |_| {
            d.fetch_add(1, Ordering::SeqCst);
        }),
    );

    let fillers: Vec<_> = (0..2)
        .map(|_| {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || pool.prefill())
        })
        .collect();
    let queued: usize = fillers.into_iter().map(|f| f.join().unwrap()).sum();

    assert_eq!(queued, 1);
    assert_eq!(pool.created_count(), 2);
    assert_eq!(pool.destroyed_count(), 1);
    assert_eq!(disposals.load(Ordering::SeqCst), 1);
    assert_eq!(pool.idle_count(), 1);
}

#[test]
fn health_recovers_once_creation_succeeds_again() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let config = PoolConfiguration::new()
        .with_capacity(1)
        .with_retry(RetryPolicy::new(3, Duration::ZERO));
    let pool = Pool::with_config(config, move || {
        if c.fetch_add(1, Ordering::SeqCst) < 3 {
            Err(io::Error::other("backend down"))
        } else {
            Ok(1)
        }
    });

    assert!(pool.borrow().is_err());
    let health = pool.get_health_status();
    assert!(!health.is_healthy());
    assert_eq!(health.consecutive_creation_failures, 3);
    assert!(health.warnings.iter().any(|w| w.contains("backend down")));

    assert_eq!(pool.borrow().unwrap(), 1);
    let health = pool.get_health_status();
    assert!(health.is_healthy());
    assert_eq!(health.consecutive_creation_failures, 0);
    assert_eq!(pool.get_metrics().last_creation_error, None);
    assert_eq!(pool.creation_failure_count(), 3);
}

#[test]
fn counters_never_decrease_under_concurrent_use() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pool = Arc::new(
        Pool::new(3, counting_create(&calls))
            .with_idle_timeout(Duration::from_millis(1))
            .with_tester(|v| v % 2 == 0),
    );
    pool.prefill();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let lease = pool.lease().unwrap();
                    drop(lease);
                }
            })
        })
        .collect();

    let mut last = pool.get_metrics();
    while workers.iter().any(|w| !w.is_finished()) {
        let now = pool.get_metrics();
        assert!(now.created >= last.created);
        assert!(now.destroyed >= last.destroyed);
        assert!(now.tested >= last.tested);
        assert!(now.borrowed >= last.borrowed);
        assert!(now.returned >= last.returned);
        last = now;
    }
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(pool.borrowed_count(), 400);
    assert!(pool.idle_count() <= 3);
    assert_eq!(pool.created_count() as usize, calls.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn async_borrowers_share_the_pool() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pool = Arc::new(Pool::new(4, counting_create(&calls)));
    assert_eq!(pool.prefill_async().await.unwrap(), 4);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..16 {
        let pool = Arc::clone(&pool);
        tasks.spawn(async move {
            let value = pool.borrow_async().await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
            pool.return_value(value);
        });
    }
    while let Some(done) = tasks.join_next().await {
        done.unwrap();
    }

    assert_eq!(pool.borrowed_count(), 16);
    assert_eq!(pool.returned_count() + pool.destroyed_count(), 16);
    assert_eq!(pool.idle_count(), 4);
}
