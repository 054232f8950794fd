//! Error types for moe-dispatch

use thiserror::Error;

/// Result type alias using this crate's [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dispatch operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("CUDA error: {0}")]
    Cuda(String),

    #[error("kernel not found: {0}")]
    KernelNotFound(String),

    #[error("expert id {id} out of range for {num_experts} experts")]
    InvalidExpertId { id: i64, num_experts: usize },

    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error(
        "cumulative counts must be non-decreasing: cum_count[{index}] = {value} after {previous}"
    )]
    NonMonotonicCumCount {
        index: usize,
        value: i64,
        previous: i64,
    },

    #[error(
        "positions differ for expert {expert} in slots [{start}, {end}): \
         reference {reference:?}, actual {actual:?}"
    )]
    PositionMismatch {
        expert: usize,
        start: usize,
        end: usize,
        reference: Vec<i64>,
        actual: Vec<i64>,
    },
}

#[cfg(feature = "cuda")]
impl From<cudarc::driver::DriverError> for Error {
    fn from(e: cudarc::driver::DriverError) -> Self {
        Self::Cuda(e.to_string())
    }
}
