// In: src/format.rs

//! Defines all on-disk structures and constants for the pzip archive format.
//!
//! An archive is a flat concatenation of frames with no global header, footer,
//! checksum or sentinel:
//!
//! ```text
//! [4 bytes: payload length N, little-endian i32][N bytes: one compressed chunk]
//! ```
//!
//! The stream ends at end-of-file after the last frame. Frame boundaries come
//! only from the length prefix; the configured chunk size is never consulted.

use std::io::{self, ErrorKind, Read, Write};

use crate::error::{PzipError, Result};

//==================================================================================
// I. Frame Constants
//==================================================================================

/// Size of the length prefix in front of every frame.
pub const FRAME_HEADER_LEN: usize = 4;

//==================================================================================
// II. Frame Header Codec
//==================================================================================

/// Writes the length prefix for a payload of `payload_len` bytes.
pub fn write_frame_length(output: &mut dyn Write, payload_len: usize) -> Result<()> {
    let declared = i32::try_from(payload_len).map_err(|_| {
        PzipError::Codec(format!(
            "compressed chunk of {} bytes does not fit in a frame",
            payload_len
        ))
    })?;
    output.write_all(&declared.to_le_bytes())?;
    Ok(())
}

/// Reads the next length prefix.
///
/// Returns `Ok(None)` on a clean end of stream (zero prefix bytes available).
/// A partial prefix or a negative length is a format error.
pub fn read_frame_length(input: &mut dyn Read) -> Result<Option<usize>> {
    let mut prefix = [0u8; FRAME_HEADER_LEN];
    let filled = read_up_to(input, &mut prefix)?;
    if filled == 0 {
        return Ok(None);
    }
    if filled < FRAME_HEADER_LEN {
        return Err(PzipError::Format(format!(
            "length prefix truncated after {} of {} bytes",
            filled, FRAME_HEADER_LEN
        )));
    }
    let declared = i32::from_le_bytes(prefix);
    usize::try_from(declared)
        .map(Some)
        .map_err(|_| PzipError::Format(format!("negative frame length {}", declared)))
}

/// Fills as much of `buf` as the reader can supply, retrying on interruption.
/// Returns the number of bytes read; less than `buf.len()` only at end of stream.
pub(crate) fn read_up_to(input: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

//==================================================================================
// III. Archive Inspection
//==================================================================================

/// Summary of an archive's frame layout, produced without decompressing anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub frame_count: u64,
    /// Sum of all declared payload lengths.
    pub payload_bytes: u64,
    /// Payload bytes plus frame headers; the archive's size on disk.
    pub total_bytes: u64,
    pub largest_frame: u64,
}

/// Walks the frame headers of an archive, skipping over each payload.
pub fn analyze_archive<R: Read>(mut input: R) -> Result<ArchiveStats> {
    let mut stats = ArchiveStats::default();

    while let Some(declared) = read_frame_length(&mut input)? {
        let declared = declared as u64;
        let skipped = io::copy(&mut (&mut input).take(declared), &mut io::sink())?;
        if skipped < declared {
            return Err(PzipError::Format(format!(
                "frame {} declares {} bytes but only {} are available",
                stats.frame_count, declared, skipped
            )));
        }
        stats.frame_count += 1;
        stats.payload_bytes += declared;
        stats.total_bytes += declared + FRAME_HEADER_LEN as u64;
        stats.largest_frame = stats.largest_frame.max(declared);
    }

    log::debug!(
        "analyzed archive: {} frames, {} payload bytes",
        stats.frame_count,
        stats.payload_bytes
    );
    Ok(stats)
}
