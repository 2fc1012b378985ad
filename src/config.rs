// In: src/config.rs

//! The single source of truth for all pzip pipeline configuration.
//!
//! `PipelineConfig` is created once at the application boundary (from CLI flags
//! or a JSON file), validated, and then handed read-only to the orchestrator.
//! It is immutable for the lifetime of a run and outlives it.

use serde::{Deserialize, Serialize};

use crate::error::{PzipError, Result};

/// Default read size for one chunk: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
/// Default bound for both pipeline channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 30;
/// Largest payload a frame can describe (the length prefix is a signed 32-bit integer).
pub const MAX_FRAME_PAYLOAD: usize = i32::MAX as usize;
/// Upper bound on `worker_count`; each worker is an OS thread.
pub const MAX_WORKER_COUNT: usize = 1024;

//==================================================================================
// I. Core Configuration Enums
//==================================================================================

/// Which way the bytes flow through the pipeline.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Compress,
    Decompress,
}

impl Direction {
    /// The verb used in `OperationFailed` messages and log lines.
    pub fn verb(&self) -> &'static str {
        match self {
            Direction::Compress => "compress",
            Direction::Decompress => "decompress",
        }
    }
}

/// Defines the trade-off between compression speed and final archive size.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompressionProfile {
    /// Prioritizes speed over size.
    Fast,

    /// A balance between speed and size. This is the recommended default.
    #[default]
    Balanced,

    /// Prioritizes the smallest possible archive at the cost of CPU time.
    HighCompression,
}

impl CompressionProfile {
    pub fn zstd_level(&self) -> i32 {
        match self {
            CompressionProfile::Fast => 1,
            CompressionProfile::Balanced => 3,
            CompressionProfile::HighCompression => 19,
        }
    }
}

/// Capacity of one pipeline channel.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", content = "limit", rename_all = "snake_case")]
pub enum Capacity {
    /// `put` blocks once this many items are buffered. Must be positive.
    Bounded(usize),
    /// `put` never blocks.
    Unbounded,
}

impl Capacity {
    pub fn limit(&self) -> Option<usize> {
        match self {
            Capacity::Bounded(n) => Some(*n),
            Capacity::Unbounded => None,
        }
    }

    pub(crate) fn validate(&self, name: &str) -> Result<()> {
        match self {
            Capacity::Bounded(0) => Err(PzipError::Configuration(format!(
                "{} must be positive when bounded",
                name
            ))),
            _ => Ok(()),
        }
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Capacity::Bounded(DEFAULT_CHANNEL_CAPACITY)
    }
}

//==================================================================================
// II. The Unified PipelineConfig
//==================================================================================

/// The configuration for one compress or decompress run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Bytes read per chunk when compressing. When decompressing it only sizes
    /// the initial read buffers; frame boundaries come from the length prefixes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Number of worker threads. `None` means the available hardware parallelism.
    #[serde(default)]
    pub worker_count: Option<usize>,

    /// Capacity of the splitter -> workers channel.
    #[serde(default)]
    pub input_capacity: Capacity,

    /// Capacity of the workers -> writer channel.
    #[serde(default)]
    pub output_capacity: Capacity,

    /// The profile guiding the zstd level.
    #[serde(default)]
    pub profile: CompressionProfile,

    /// Explicit zstd level; overrides `profile` when set.
    #[serde(default)]
    pub level: Option<i32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            worker_count: None,
            input_capacity: Capacity::default(),
            output_capacity: Capacity::default(),
            profile: CompressionProfile::default(),
            level: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = Some(workers);
        self
    }

    pub fn with_input_capacity(mut self, capacity: Capacity) -> Self {
        self.input_capacity = capacity;
        self
    }

    pub fn with_output_capacity(mut self, capacity: Capacity) -> Self {
        self.output_capacity = capacity;
        self
    }

    pub fn with_profile(mut self, profile: CompressionProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = Some(level);
        self
    }

    /// Checks every field. Called by the orchestrator before any thread is spawned.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(PzipError::Configuration(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.chunk_size > MAX_FRAME_PAYLOAD {
            return Err(PzipError::Configuration(format!(
                "chunk_size {} exceeds the frame limit of {} bytes",
                self.chunk_size, MAX_FRAME_PAYLOAD
            )));
        }
        match self.worker_count {
            Some(0) => {
                return Err(PzipError::Configuration(
                    "worker_count must be at least 1".to_string(),
                ));
            }
            Some(n) if n > MAX_WORKER_COUNT => {
                return Err(PzipError::Configuration(format!(
                    "worker_count {} exceeds the limit of {}",
                    n, MAX_WORKER_COUNT
                )));
            }
            _ => {}
        }
        self.input_capacity.validate("input_capacity")?;
        self.output_capacity.validate("output_capacity")?;

        if let Some(level) = self.level {
            let range = zstd::compression_level_range();
            if !range.contains(&level) {
                return Err(PzipError::Configuration(format!(
                    "zstd level {} is outside the supported range {:?}",
                    level, range
                )));
            }
        }
        Ok(())
    }

    pub fn resolved_worker_count(&self) -> usize {
        self.worker_count
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .min(MAX_WORKER_COUNT)
    }

    pub fn zstd_level(&self) -> i32 {
        self.level.unwrap_or_else(|| self.profile.zstd_level())
    }

    /// Parses and validates a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Helper for `serde` to provide a default for `chunk_size`.
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
