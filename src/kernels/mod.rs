//! Byte-level transform kernels. Each kernel is stateless and works on a single
//! chunk; the pipeline decides which kernel runs on which thread.

pub mod zstd;
