//! Idle storage: pooled elements and the bounded queue holding them

use crossbeam::queue::ArrayQueue;
use std::time::{Duration, Instant};

/// A pooled value plus the time it was last known to be good
///
/// `last_validated` is stamped when the element is created or returned and is
/// never touched while the value is out on loan.
#[derive(Debug)]
pub(crate) struct PooledElement<T> {
    pub value: T,
    pub last_validated: Instant,
}

impl<T> PooledElement<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            last_validated: Instant::now(),
        }
    }

    /// Idle for at least `idle_timeout`
    pub fn is_stale(&self, idle_timeout: Duration) -> bool {
        self.last_validated.elapsed() >= idle_timeout
    }
}

/// Bounded lock-free queue of idle elements
///
/// `ArrayQueue` cannot be built with zero capacity, so a zero-sized pool
/// has no queue at all and rejects every push.
pub(crate) struct IdleQueue<T> {
    queue: Option<ArrayQueue<PooledElement<T>>>,
}

impl<T> IdleQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: (capacity > 0).then(|| ArrayQueue::new(capacity)),
        }
    }

    pub fn push(&self, element: PooledElement<T>) -> Result<(), PooledElement<T>> {
        match &self.queue {
            Some(queue) => queue.push(element),
            None => Err(element),
        }
    }

    pub fn pop(&self) -> Option<PooledElement<T>> {
        self.queue.as_ref().and_then(ArrayQueue::pop)
    }

    pub fn len(&self) -> usize {
        self.queue.as_ref().map_or(0, ArrayQueue::len)
    }

    pub fn capacity(&self) -> usize {
        self.queue.as_ref().map_or(0, ArrayQueue::capacity)
    }

    /// Open slots at the time of the call
    pub fn vacancy(&self) -> usize {
        self.capacity().saturating_sub(self.len())
    }
}
