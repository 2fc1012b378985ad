// In: src/chunk_pipeline/codec.rs

//! The two `Codec` implementations: one per direction, no shared state.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::format::{read_frame_length, read_up_to, write_frame_length};
use crate::chunk_pipeline::chunk::{BufferPool, Chunk, PooledBuffer};
use crate::chunk_pipeline::traits::Codec;
use crate::config::{Direction, PipelineConfig, MAX_FRAME_PAYLOAD};
use crate::error::{PzipError, Result};
use crate::kernels;

/// Selects the codec for a run. Called once, before any stage starts.
pub fn codec_for(direction: Direction, config: &PipelineConfig) -> Box<dyn Codec> {
    match direction {
        Direction::Compress => Box::new(CompressCodec::new(
            config.chunk_size,
            config.zstd_level(),
        )),
        Direction::Decompress => Box::new(DecompressCodec::new()),
    }
}

//==================================================================================
// 1. Compress
//==================================================================================

/// Splits raw input into `chunk_size` pieces and zstd-compresses each one.
#[derive(Debug, Clone)]
pub struct CompressCodec {
    chunk_size: usize,
    level: i32,
}

impl CompressCodec {
    pub fn new(chunk_size: usize, level: i32) -> Self {
        Self { chunk_size, level }
    }
}

impl Codec for CompressCodec {
    fn direction(&self) -> Direction {
        Direction::Compress
    }

    fn try_read_next(
        &self,
        input: &mut dyn Read,
        pool: &Arc<BufferPool>,
    ) -> Result<Option<PooledBuffer>> {
        let mut buf = pool.rent();
        buf.resize(self.chunk_size, 0);
        let filled = read_up_to(input, &mut buf)?;
        buf.truncate(filled);

        if filled == 0 {
            return Ok(None);
        }
        Ok(Some(buf))
    }

    fn transform(&self, chunk: &Chunk, pool: &Arc<BufferPool>) -> Result<Chunk> {
        let mut out = pool.rent();
        kernels::zstd::compress_into(chunk.payload(), &mut out, self.level)?;
        if out.len() > MAX_FRAME_PAYLOAD {
            return Err(PzipError::Codec(format!(
                "chunk {} compressed to {} bytes, larger than a frame can hold",
                chunk.index(),
                out.len()
            )));
        }
        Ok(Chunk::new(chunk.index(), out))
    }

    fn write_header(&self, chunk: &Chunk, output: &mut dyn Write) -> Result<()> {
        write_frame_length(output, chunk.len())
    }
}

//==================================================================================
// 2. Decompress
//==================================================================================

/// Reads length-prefixed frames and zstd-decompresses each payload.
#[derive(Debug, Clone, Default)]
pub struct DecompressCodec;

impl DecompressCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for DecompressCodec {
    fn direction(&self) -> Direction {
        Direction::Decompress
    }

    fn try_read_next(
        &self,
        input: &mut dyn Read,
        pool: &Arc<BufferPool>,
    ) -> Result<Option<PooledBuffer>> {
        let declared = match read_frame_length(input)? {
            Some(declared) => declared,
            None => return Ok(None),
        };

        // `take` + `read_to_end` grows the buffer only as bytes actually arrive,
        // so a corrupted prefix cannot force a huge up-front allocation.
        let mut buf = pool.rent();
        let got = input.take(declared as u64).read_to_end(&mut buf)?;
        if got < declared {
            return Err(PzipError::Format(format!(
                "frame declares {} bytes but only {} are available",
                declared, got
            )));
        }
        Ok(Some(buf))
    }

    fn transform(&self, chunk: &Chunk, pool: &Arc<BufferPool>) -> Result<Chunk> {
        let mut out = pool.rent();
        kernels::zstd::decompress_into(chunk.payload(), &mut out)?;
        Ok(Chunk::new(chunk.index(), out))
    }

    fn write_header(&self, _chunk: &Chunk, _output: &mut dyn Write) -> Result<()> {
        Ok(())
    }
}
