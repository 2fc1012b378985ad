// In: src/bridge/stateless_api.rs

use std::io::Cursor;

use crate::bridge;
use crate::config::PipelineConfig;
use crate::error::PzipError;

/// Compresses an in-memory buffer into a complete archive.
pub fn compress_bytes(bytes: &[u8], config: &PipelineConfig) -> Result<Vec<u8>, PzipError> {
    let mut archive = Vec::new();
    bridge::compress(Cursor::new(bytes), &mut archive, config)?;
    Ok(archive)
}

/// Decompresses a complete in-memory archive.
pub fn decompress_bytes(archive: &[u8], config: &PipelineConfig) -> Result<Vec<u8>, PzipError> {
    let mut restored = Vec::new();
    bridge::decompress(Cursor::new(archive), &mut restored, config)?;
    Ok(restored)
}
