// In: src/error.rs

//! This module defines the single, unified error type for the entire pzip library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PzipError {
    // =========================================================================
    // === High-Level, Semantic Errors (Specific to our library's logic)
    // =========================================================================
    /// A `PipelineConfig` value is out of range. Raised before any thread starts.
    #[error("Invalid pipeline configuration: {0}")]
    Configuration(String),

    /// A frame in the archive is truncated or its length prefix is malformed.
    #[error("archive entry is corrupted: {0}")]
    Format(String),

    /// The underlying compress/decompress transform rejected a chunk.
    #[error("Codec operation failed: {0}")]
    Codec(String),

    #[error("Internal logic error (this is a bug): {0}")]
    Internal(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the input or output stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically while loading a config file.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    // =========================================================================
    // === Run-Level Wrapper
    // =========================================================================
    /// The single error reported for a failed pipeline run. `source` is the
    /// first stage error that was observed.
    #[error("Could not {operation}: {source}")]
    OperationFailed {
        operation: &'static str,
        #[source]
        source: Box<PzipError>,
    },
}

impl PzipError {
    pub(crate) fn operation_failed(operation: &'static str, cause: PzipError) -> Self {
        PzipError::OperationFailed {
            operation,
            source: Box::new(cause),
        }
    }

    /// Walks through any `OperationFailed` wrappers and returns the innermost cause.
    pub fn root_cause(&self) -> &PzipError {
        let mut current = self;
        while let PzipError::OperationFailed { source, .. } = current {
            current = source;
        }
        current
    }

    /// True when the innermost cause is a corrupted-archive error.
    pub fn is_format_error(&self) -> bool {
        matches!(self.root_cause(), PzipError::Format(_))
    }
}

pub type Result<T> = std::result::Result<T, PzipError>;
