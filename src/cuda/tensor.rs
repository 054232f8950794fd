//! Integer tensors on a CUDA device

use cudarc::driver::{CudaSlice, DeviceRepr, ValidAsZeroBits};

use crate::cuda::CudaContext;
use crate::dtype::{DType, DispatchDType};
use crate::{Error, Result};

/// An owning GPU buffer with a shape.
///
/// Shape is bookkeeping only: the dispatch operators flatten their inputs,
/// so a `[100, 2]` assignment tensor is consumed exactly like a `[200]` one.
pub struct CudaTensor<T: DispatchDType> {
    data: CudaSlice<T>,
    shape: Vec<usize>,
    ctx: CudaContext,
}

impl<T: DispatchDType + DeviceRepr> CudaTensor<T> {
    /// Create a tensor on the GPU from host data.
    ///
    /// # Errors
    /// Returns an error if `data` does not match `shape`, or if GPU
    /// allocation or the host-to-device copy fails.
    pub fn from_slice(ctx: &CudaContext, shape: &[usize], data: &[T]) -> Result<Self> {
        let numel: usize = shape.iter().product();
        if data.len() != numel {
            return Err(Error::LengthMismatch {
                expected: numel,
                got: data.len(),
            });
        }
        let data = ctx.device().htod_sync_copy(data)?;
        Ok(Self {
            data,
            shape: shape.to_vec(),
            ctx: ctx.clone(),
        })
    }

    /// Create a zero-filled tensor.
    ///
    /// # Errors
    /// Returns an error if GPU allocation fails.
    pub fn zeros(ctx: &CudaContext, shape: &[usize]) -> Result<Self>
    where
        T: ValidAsZeroBits,
    {
        let numel: usize = shape.iter().product();
        let data = ctx.device().alloc_zeros::<T>(numel)?;
        Ok(Self {
            data,
            shape: shape.to_vec(),
            ctx: ctx.clone(),
        })
    }

    /// Copy the tensor into a fresh allocation (device-to-device).
    ///
    /// # Errors
    /// Returns an error if GPU allocation or the copy fails.
    pub fn try_clone(&self) -> Result<Self> {
        let mut data = unsafe { self.ctx.device().alloc::<T>(self.numel())? };
        self.ctx.device().dtod_copy(&self.data, &mut data)?;
        Ok(Self {
            data,
            shape: self.shape.clone(),
            ctx: self.ctx.clone(),
        })
    }

    /// Copy tensor data back to the host.
    ///
    /// # Errors
    /// Returns an error if the device-to-host copy fails.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        Ok(self.ctx.device().dtoh_sync_copy(&self.data)?)
    }

    /// Shape of the tensor.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Total number of elements.
    #[must_use]
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Element type tag.
    #[must_use]
    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// The CUDA context this tensor belongs to.
    #[must_use]
    pub fn context(&self) -> &CudaContext {
        &self.ctx
    }

    /// The underlying CUDA slice.
    #[must_use]
    pub fn cuda_slice(&self) -> &CudaSlice<T> {
        &self.data
    }

    /// Mutable access to the underlying CUDA slice.
    pub fn cuda_slice_mut(&mut self) -> &mut CudaSlice<T> {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpu_context() -> Option<CudaContext> {
        if CudaContext::device_count() == 0 {
            eprintln!("Skipping GPU test: no CUDA device available");
            return None;
        }
        Some(CudaContext::new(0).expect("Failed to create CUDA context"))
    }

    #[test]
    fn test_tensor_roundtrip() {
        let Some(ctx) = gpu_context() else { return };

        let data: Vec<i64> = vec![1, 2, 3, 4, 5, 6];
        let tensor = CudaTensor::from_slice(&ctx, &[2, 3], &data).unwrap();

        assert_eq!(tensor.shape(), &[2, 3]);
        assert_eq!(tensor.numel(), 6);
        assert_eq!(tensor.dtype(), DType::I64);
        assert_eq!(tensor.to_vec().unwrap(), data);
    }

    #[test]
    fn test_tensor_shape_mismatch_rejected() {
        let Some(ctx) = gpu_context() else { return };

        let err = CudaTensor::from_slice(&ctx, &[2, 3], &[1_i64, 2]).unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                expected: 6,
                got: 2
            }
        ));
    }

    #[test]
    fn test_tensor_zeros() {
        let Some(ctx) = gpu_context() else { return };

        let tensor: CudaTensor<i32> = CudaTensor::zeros(&ctx, &[3, 4]).unwrap();
        assert_eq!(tensor.numel(), 12);
        assert!(tensor.to_vec().unwrap().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_try_clone_is_independent() {
        let Some(ctx) = gpu_context() else { return };

        let data: Vec<i64> = vec![7, 8, 9];
        let tensor = CudaTensor::from_slice(&ctx, &[3], &data).unwrap();
        let mut copy = tensor.try_clone().unwrap();

        let overwrite: Vec<i64> = vec![0, 0, 0];
        ctx.device()
            .htod_sync_copy_into(&overwrite, copy.cuda_slice_mut())
            .unwrap();

        assert_eq!(tensor.to_vec().unwrap(), data);
        assert_eq!(copy.to_vec().unwrap(), overwrite);
    }
}
