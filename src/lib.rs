//! This file is the root of the `pzip` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of the library (`bridge`, `chunk_pipeline`,
//!     `kernels`, etc.) so the Rust compiler knows they exist.
//! 2.  Re-exporting the small surface most callers need, so the `pzip` binary and
//!     library users can stay on `pzip::compress` / `pzip::decompress`.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod bridge;
pub mod chunk_pipeline;
pub mod config;
pub mod error;
pub mod format;
pub mod kernels;
pub mod utils;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================
pub use bridge::{
    analyze_archive, compress, compress_bytes, decompress, decompress_bytes, process,
    ArchiveStats,
};
pub use chunk_pipeline::{
    BoundedChannel, BufferPool, Chunk, Codec, Pipeline, PipelineReport, PipelineState,
    ReorderBuffer,
};
pub use config::{Capacity, CompressionProfile, Direction, PipelineConfig};
pub use error::{PzipError, Result};
