//! This module is the parallel engine behind every compress and decompress run.
//!
//! It owns the moving parts of a run: the chunk and buffer types, the two
//! bounded channels between stages, the writer's reorder buffer, the
//! per-direction codecs and the orchestrator that wires them to threads.

//==================================================================================
// 1. Module Declarations
//==================================================================================

/// Pooled byte buffers and the indexed `Chunk` that carries them between stages.
pub mod chunk;

/// The blocking, completable queue between stages.
pub mod channel;

/// Min-ordered holding area the writer uses for early chunks.
pub mod reorder;

/// The per-direction contract and its two implementations.
pub mod codec;
pub mod traits;

/// Spawns the stages and supervises a run to a single outcome.
pub mod orchestrator;

#[cfg(test)]
mod orchestrator_tests;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================

pub use self::channel::{BoundedChannel, ChannelState};
pub use self::chunk::{BufferPool, Chunk, PooledBuffer};
pub use self::codec::{codec_for, CompressCodec, DecompressCodec};
pub use self::orchestrator::{Pipeline, PipelineReport, PipelineState};
pub use self::reorder::{Indexed, ReorderBuffer};
pub use self::traits::Codec;
