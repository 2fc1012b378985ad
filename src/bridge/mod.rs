// In: src/bridge/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Bridge Layer
// ====================================================================================
//
// The `bridge` is the public-facing API of the pzip library. Callers hand it a
// reader, a writer and a `PipelineConfig`; it hands back a `PipelineReport` or a
// single `PzipError`. Threads, channels and codecs stay behind it in
// `chunk_pipeline`.
//
// Data Flow (Compression):
//
//   1. [Streaming API (compress)]            -> Receives `impl Read` + `impl Write`
//         |
//         `-> builds a `Pipeline` for `Direction::Compress` (validates config)
//         |
//   2. [Pipeline Engine (chunk_pipeline::orchestrator)] -> splitter, workers, writer
//         |
//         `-> frames written to the output in input order
//
// Data Flow (Decompression) is the same path with `Direction::Decompress`.
//
//   [Stateless API (compress_bytes / decompress_bytes)] wraps the streaming API
//   over in-memory buffers. [Format (crate::format::analyze_archive)] inspects an archive's
//   frames without decompressing them.
//
// ====================================================================================
pub mod stateless_api;

use std::io::{Read, Write};

use crate::chunk_pipeline::{Pipeline, PipelineReport};
use crate::config::{Direction, PipelineConfig};
use crate::error::Result;

// --- Low-Level Stateless API ---
pub use stateless_api::{compress_bytes, decompress_bytes};

// --- Format Constants and Structs ---
pub use crate::format::{analyze_archive, ArchiveStats, FRAME_HEADER_LEN};

/// Runs one pipeline in `direction` from `input` to `output`.
pub fn process<R, W>(
    direction: Direction,
    input: R,
    output: W,
    config: &PipelineConfig,
) -> Result<PipelineReport>
where
    R: Read + Send,
    W: Write + Send,
{
    let mut pipeline = Pipeline::new(direction, config.clone())?;
    pipeline.run(input, output)
}

/// Compresses everything `input` yields into a framed archive on `output`.
pub fn compress<R, W>(input: R, output: W, config: &PipelineConfig) -> Result<PipelineReport>
where
    R: Read + Send,
    W: Write + Send,
{
    process(Direction::Compress, input, output, config)
}

/// Restores the original bytes of the archive read from `input`.
pub fn decompress<R, W>(input: R, output: W, config: &PipelineConfig) -> Result<PipelineReport>
where
    R: Read + Send,
    W: Write + Send,
{
    process(Direction::Decompress, input, output, config)
}
