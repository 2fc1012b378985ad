// In: src/chunk_pipeline/orchestrator/stages.rs

//! The three stage loops. Each runs on its own thread and communicates only
//! through the two channels; none of them knows about the others.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::chunk_pipeline::channel::BoundedChannel;
use crate::chunk_pipeline::chunk::{BufferPool, Chunk};
use crate::chunk_pipeline::reorder::ReorderBuffer;
use crate::chunk_pipeline::traits::Codec;
use crate::error::{PzipError, Result};

/// What the splitter accomplished before it stopped.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SplitStats {
    pub chunks: u64,
    pub bytes: u64,
}

/// What the writer accomplished before it stopped.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct WriteStats {
    pub chunks: u64,
    /// Output bytes, frame headers included.
    pub bytes: u64,
}

//==================================================================================
// 1. Splitter
//==================================================================================

/// Reads chunks in order, stamps each with the next index and feeds channel A.
///
/// Stops at clean end of stream, on the first read error, or when channel A
/// refuses a chunk because the run is shutting down. Completing channel A is
/// the caller's job.
pub(crate) fn split_input<R: Read>(
    mut input: R,
    codec: &dyn Codec,
    pool: &Arc<BufferPool>,
    to_workers: &BoundedChannel<Chunk>,
) -> Result<SplitStats> {
    let mut stats = SplitStats::default();

    while let Some(payload) = codec.try_read_next(&mut input, pool)? {
        let chunk = Chunk::new(stats.chunks, payload);
        let len = chunk.len() as u64;
        log::trace!("splitter: read chunk {} ({} bytes)", chunk.index(), len);

        if !to_workers.put(chunk) {
            log::debug!("splitter: input channel closed, stopping early");
            break;
        }
        stats.chunks += 1;
        stats.bytes += len;
    }
    Ok(stats)
}

//==================================================================================
// 2. Worker
//==================================================================================

/// Transforms chunks from channel A into channel B until A is exhausted.
pub(crate) fn transform_chunks(
    worker_id: usize,
    codec: &dyn Codec,
    pool: &Arc<BufferPool>,
    from_splitter: &BoundedChannel<Chunk>,
    to_writer: &BoundedChannel<Chunk>,
) -> Result<u64> {
    let mut processed = 0u64;

    while let Some(chunk) = from_splitter.take() {
        let transformed = codec.transform(&chunk, pool)?;
        log::trace!(
            "worker {}: chunk {} {} -> {} bytes",
            worker_id,
            chunk.index(),
            chunk.len(),
            transformed.len()
        );
        chunk.dispose();

        if !to_writer.put(transformed) {
            log::debug!("worker {}: output channel closed, stopping early", worker_id);
            break;
        }
        processed += 1;
    }
    Ok(processed)
}

//==================================================================================
// 3. Writer
//==================================================================================

/// Emits chunks from channel B strictly in index order.
///
/// Chunks that arrive ahead of the cursor wait in a `ReorderBuffer`. The writer
/// never blocks on anything but `take`, so workers parked on a full channel B
/// are always eventually released.
pub(crate) fn write_ordered<W: Write>(
    output: W,
    codec: &dyn Codec,
    from_workers: &BoundedChannel<Chunk>,
) -> Result<WriteStats> {
    let mut output = CountingWriter::new(output);
    let mut stats = WriteStats::default();
    let mut next_index_to_write = 0u64;
    let mut early = ReorderBuffer::new();

    while let Some(chunk) = from_workers.take() {
        if chunk.index() != next_index_to_write {
            early.add(chunk);
            continue;
        }

        write_chunk(&mut output, codec, chunk, &mut stats)?;
        next_index_to_write += 1;

        while let Some(ready) = early.pop_if_index(next_index_to_write) {
            write_chunk(&mut output, codec, ready, &mut stats)?;
            next_index_to_write += 1;
        }
    }

    if !early.is_empty() {
        let smallest = early.peek_min().map(|c| c.index()).unwrap_or_default();
        return Err(PzipError::Internal(format!(
            "writer stopped with {} chunks buffered (smallest {}); chunk {} never arrived",
            early.len(),
            smallest,
            next_index_to_write
        )));
    }

    output.flush()?;
    stats.bytes = output.written;
    Ok(stats)
}

fn write_chunk<W: Write>(
    output: &mut W,
    codec: &dyn Codec,
    chunk: Chunk,
    stats: &mut WriteStats,
) -> Result<()> {
    codec.write_header(&chunk, output)?;
    output.write_all(chunk.payload())?;
    log::trace!("writer: wrote chunk {} ({} bytes)", chunk.index(), chunk.len());

    stats.chunks += 1;
    chunk.dispose();
    Ok(())
}

/// Counts every byte that reaches the underlying writer, headers included.
struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
