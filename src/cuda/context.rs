//! CUDA device handle for the dispatch operators

use std::sync::Arc;

use cudarc::driver::CudaDevice;

use crate::Result;

/// Clonable handle to a CUDA device.
///
/// The dispatch kernels need only the driver context: no cuBLAS handles,
/// no workspace buffers.
#[derive(Clone)]
pub struct CudaContext {
    device: Arc<CudaDevice>,
}

impl CudaContext {
    /// Create a new context for the specified device ordinal.
    ///
    /// # Errors
    /// Returns an error if CUDA device initialization fails.
    pub fn new(ordinal: usize) -> Result<Self> {
        let device = CudaDevice::new(ordinal)?;
        Ok(Self { device })
    }

    /// Number of CUDA devices visible to the driver, or 0 when the driver
    /// itself is unavailable. Tests use this to skip GPU-less environments.
    #[must_use]
    pub fn device_count() -> usize {
        CudaDevice::count().map_or(0, |n| n as usize)
    }

    /// Get a reference to the underlying CUDA device.
    #[must_use]
    pub fn device(&self) -> &Arc<CudaDevice> {
        &self.device
    }

    /// Wait for all queued device work to complete.
    ///
    /// # Errors
    /// Returns an error if synchronization fails.
    pub fn synchronize(&self) -> Result<()> {
        self.device.synchronize()?;
        Ok(())
    }
}
