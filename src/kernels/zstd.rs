//! This module contains the pure, stateless kernels for performing Zstandard
//! compression and decompression of a single chunk.
//!
//! The kernels write into caller-supplied buffers so the pipeline can hand them
//! pooled allocations. This module is a safe, panic-free wrapper around the
//! `zstd` crate.

use std::io::Write;
use zstd::stream::{Decoder, Encoder};

use crate::error::PzipError;

//==================================================================================
// 1. Core Logic (The "Engine")
//==================================================================================

/// Compresses a byte slice using the Zstandard algorithm, appending to `output_buf`.
pub fn compress_into(
    input_bytes: &[u8],
    output_buf: &mut Vec<u8>,
    level: i32,
) -> Result<(), PzipError> {
    // The streaming Encoder writes directly into the output buffer.
    let mut encoder =
        Encoder::new(output_buf, level).map_err(|e| PzipError::Codec(e.to_string()))?;
    encoder
        .write_all(input_bytes)
        .map_err(|e| PzipError::Codec(e.to_string()))?;

    // `finish` is essential to finalize the Zstd frame.
    encoder
        .finish()
        .map_err(|e| PzipError::Codec(e.to_string()))?;
    Ok(())
}

/// Decompresses a Zstandard-compressed byte slice, appending to `output_buf`.
///
/// An empty input decodes to nothing.
pub fn decompress_into(input_bytes: &[u8], output_buf: &mut Vec<u8>) -> Result<(), PzipError> {
    if input_bytes.is_empty() {
        return Ok(());
    }
    let mut decoder = Decoder::new(input_bytes).map_err(|e| PzipError::Codec(e.to_string()))?;

    // `io::copy` grows the output buffer as needed; no pre-allocation is assumed.
    std::io::copy(&mut decoder, output_buf).map_err(|e| PzipError::Codec(e.to_string()))?;
    Ok(())
}

//==================================================================================
// 2. Public API (Allocating convenience wrappers)
//==================================================================================

pub fn encode(input_bytes: &[u8], level: i32) -> Result<Vec<u8>, PzipError> {
    let mut output_buf = Vec::with_capacity(input_bytes.len() / 2 + 64);
    compress_into(input_bytes, &mut output_buf, level)?;
    Ok(output_buf)
}

pub fn decode(input_bytes: &[u8]) -> Result<Vec<u8>, PzipError> {
    let mut output_buf = Vec::with_capacity(input_bytes.len() * 2);
    decompress_into(input_bytes, &mut output_buf)?;
    Ok(output_buf)
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
