use thiserror::Error;

/// Error reported by a GPU backend after a call.
///
/// Mirrors the error classes a GL-style driver raises. Backends queue these
/// and [`crate::gpu::GpuContext`] drains the queue after every checked call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpuError {
    #[error("invalid enum: {0}")]
    InvalidEnum(&'static str),
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),
    #[error("out of memory allocating {0}")]
    OutOfMemory(&'static str),
    #[error("shader program {program} failed to link: {log}")]
    Link { program: &'static str, log: String },
}
