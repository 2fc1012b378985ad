// In: src/chunk_pipeline/channel.rs

//! A blocking multi-producer, multi-consumer FIFO with an optional capacity
//! bound and an explicit completion signal.
//!
//! Lifecycle: `Open -> Draining -> Exhausted`.
//!
//! - `Open`: `put` enqueues (blocking while full), `take` dequeues (blocking while empty).
//! - `Draining`: entered by `complete()`. `put` is refused; `take` keeps yielding
//!   the items already buffered.
//! - `Exhausted`: draining and empty. `take` returns `None`.
//!
//! `complete()` wakes every blocked producer and consumer, so a producer parked
//! on a full channel observes shutdown instead of waiting forever.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::config::Capacity;
use crate::error::Result;

/// Slots reserved up front; a larger bound grows the queue on demand.
const PREALLOCATED_SLOTS: usize = 64;

/// Observable lifecycle state of a `BoundedChannel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Draining,
    Exhausted,
}

struct Inner<T> {
    queue: VecDeque<T>,
    completed: bool,
}

pub struct BoundedChannel<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
}

impl<T> BoundedChannel<T> {
    /// Creates a channel. A `Bounded(0)` capacity is a configuration error.
    pub fn new(capacity: Capacity) -> Result<Self> {
        capacity.validate("channel capacity")?;
        let limit = capacity.limit();
        Ok(Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::with_capacity(limit.unwrap_or(0).min(PREALLOCATED_SLOTS)),
                completed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: limit,
        })
    }

    /// Enqueues `item`, blocking while the channel is open and full.
    ///
    /// Returns `false` if the channel has been completed; the item is dropped
    /// and the caller should treat this as shutdown, not as an error.
    pub fn put(&self, item: T) -> bool {
        let mut inner = self.inner.lock();
        loop {
            if inner.completed {
                return false;
            }
            match self.capacity {
                Some(limit) if inner.queue.len() >= limit => {
                    self.not_full.wait(&mut inner);
                }
                _ => break,
            }
        }
        inner.queue.push_back(item);
        self.not_empty.notify_one();
        true
    }

    /// Dequeues the oldest item, blocking while the channel is open and empty.
    ///
    /// Returns `None` once the channel is completed and drained.
    pub fn take(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.queue.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if inner.completed {
                return None;
            }
            self.not_empty.wait(&mut inner);
        }
    }

    /// Stops accepting items and wakes every waiter. Idempotent.
    pub fn complete(&self) {
        let mut inner = self.inner.lock();
        inner.completed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn state(&self) -> ChannelState {
        let inner = self.inner.lock();
        match (inner.completed, inner.queue.is_empty()) {
            (false, _) => ChannelState::Open,
            (true, false) => ChannelState::Draining,
            (true, true) => ChannelState::Exhausted,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.inner.lock().completed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }

    /// The bound, or `None` for an unbounded channel.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

/// Completes the wrapped channel when dropped, however the owning stage exits.
pub(crate) struct CompleteOnDrop<'a, T>(pub(crate) &'a BoundedChannel<T>);

impl<T> Drop for CompleteOnDrop<'_, T> {
    fn drop(&mut self) {
        self.0.complete();
    }
}
