// In: src/chunk_pipeline/traits.rs

//! Defines the behavioral contract every per-direction codec fulfils.
//!
//! A codec owns the three direction-specific decisions of a run: how the
//! splitter carves the input into chunk payloads, how a worker transforms one
//! chunk, and what the writer emits in front of each transformed payload.
//! Everything else (threads, channels, ordering) belongs to the orchestrator.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::chunk_pipeline::chunk::{BufferPool, Chunk, PooledBuffer};
use crate::config::Direction;
use crate::error::Result;

pub trait Codec: Send + Sync {
    fn direction(&self) -> Direction;

    /// Reads the next chunk payload from `input`.
    ///
    /// Returns `Ok(None)` on a clean end of stream. The splitter assigns the index.
    fn try_read_next(
        &self,
        input: &mut dyn Read,
        pool: &Arc<BufferPool>,
    ) -> Result<Option<PooledBuffer>>;

    /// Produces a new chunk holding the codec-applied bytes, with the same index.
    /// The input chunk is left untouched; the caller disposes it.
    fn transform(&self, chunk: &Chunk, pool: &Arc<BufferPool>) -> Result<Chunk>;

    /// Writes whatever framing precedes `chunk`'s payload in the output.
    fn write_header(&self, chunk: &Chunk, output: &mut dyn Write) -> Result<()>;
}
