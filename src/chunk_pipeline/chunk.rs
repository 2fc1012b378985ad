// In: src/chunk_pipeline/chunk.rs

//! The unit of work that moves through the pipeline, and the buffer pool that
//! backs it.
//!
//! A `Chunk` owns exactly one `PooledBuffer`. Moving the chunk between stages is
//! the ownership transfer; dropping it (or calling `dispose`) hands the buffer
//! back to the `BufferPool` it was rented from. Because disposal consumes the
//! chunk, a buffer can never be returned twice.
//!
//! The pool is explicitly constructed per run and shared through an `Arc`; there
//! is no process-wide singleton.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_queue::ArrayQueue;

use super::reorder::Indexed;

//==================================================================================
// 1. BufferPool
//==================================================================================

/// A bounded pool of reusable byte buffers, shared by the splitter, the workers
/// and chunk disposal.
pub struct BufferPool {
    free: ArrayQueue<Vec<u8>>,
    buffer_capacity: usize,
    allocated: AtomicUsize,
    returned: AtomicUsize,
}

impl BufferPool {
    /// Creates a pool whose fresh buffers reserve `buffer_capacity` bytes and
    /// which keeps at most `max_pooled` idle buffers around for reuse.
    pub fn new(buffer_capacity: usize, max_pooled: usize) -> Arc<Self> {
        Arc::new(Self {
            free: ArrayQueue::new(max_pooled.max(1)),
            buffer_capacity,
            allocated: AtomicUsize::new(0),
            returned: AtomicUsize::new(0),
        })
    }

    /// Rents an empty buffer, reusing an idle allocation when one is available.
    pub fn rent(self: &Arc<Self>) -> PooledBuffer {
        let buf = match self.free.pop() {
            Some(mut buf) => {
                buf.clear();
                buf
            }
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                Vec::with_capacity(self.buffer_capacity)
            }
        };
        PooledBuffer {
            buf,
            pool: Arc::clone(self),
        }
    }

    fn give_back(&self, buf: Vec<u8>) {
        self.returned.fetch_add(1, Ordering::Relaxed);
        // A full pool simply frees the surplus allocation.
        let _ = self.free.push(buf);
    }

    /// Number of idle buffers currently held by the pool.
    pub fn idle(&self) -> usize {
        self.free.len()
    }

    /// Number of fresh allocations the pool has made.
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Number of buffers that have been handed back.
    pub fn returned(&self) -> usize {
        self.returned.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("buffer_capacity", &self.buffer_capacity)
            .field("idle", &self.idle())
            .field("allocated", &self.allocated())
            .field("returned", &self.returned())
            .finish()
    }
}

/// A byte buffer on loan from a `BufferPool`. Returned to the pool on drop.
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        self.pool.give_back(buf);
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.buf.len())
            .field("capacity", &self.buf.capacity())
            .finish()
    }
}

//==================================================================================
// 2. Chunk
//==================================================================================

/// An indexed, owned run of bytes. The index is fixed at creation.
#[derive(Debug)]
pub struct Chunk {
    index: u64,
    payload: PooledBuffer,
}

impl Chunk {
    pub fn new(index: u64, payload: PooledBuffer) -> Self {
        Self { index, payload }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// The bytes actually produced for this chunk, not the backing capacity.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Releases the backing buffer to its pool.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Indexed for Chunk {
    fn index(&self) -> u64 {
        self.index
    }
}
