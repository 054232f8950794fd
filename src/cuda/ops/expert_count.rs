//! GPU per-expert histogram of token assignments

#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use cudarc::driver::{DeviceRepr, LaunchAsync, LaunchConfig, ValidAsZeroBits};

use crate::cuda::{CudaContext, CudaTensor};
use crate::dtype::DispatchDType;
use crate::{Error, Result};

const PTX: &str = include_str!(concat!(env!("OUT_DIR"), "/kernels/expert_count.ptx"));
const MODULE_NAME: &str = "expert_count";
const KERNEL_NAMES: &[&str] = &["expert_count_i32", "expert_count_i64"];

/// Count how many tokens are assigned to each expert and copy the
/// histogram back to the host.
///
/// Ids outside `[0, num_experts)` are skipped, matching the host
/// reference. The input shape is irrelevant; the kernel consumes the
/// flat elements.
///
/// # Errors
/// Returns an error if allocation, the kernel launch, or a transfer fails.
pub fn expert_count<T>(x: &CudaTensor<T>, num_experts: usize) -> Result<Vec<T>>
where
    T: DispatchDType + DeviceRepr + ValidAsZeroBits,
{
    if num_experts == 0 {
        return Ok(Vec::new());
    }
    if x.numel() == 0 {
        return Ok(vec![T::default(); num_experts]);
    }

    let ctx = x.context();
    let mut out = CudaTensor::<T>::zeros(ctx, &[num_experts])?;

    ensure_kernels_loaded(ctx)?;
    let kernel_name = format!("expert_count_{}", T::KERNEL_SUFFIX);
    let func = ctx
        .device()
        .get_func(MODULE_NAME, &kernel_name)
        .ok_or(Error::KernelNotFound(kernel_name))?;

    let numel = x.numel();
    let block_size = 256_u32;
    let cfg = LaunchConfig {
        grid_dim: ((numel as u32).div_ceil(block_size), 1, 1),
        block_dim: (block_size, 1, 1),
        shared_mem_bytes: 0,
    };

    unsafe {
        func.launch(
            cfg,
            (
                x.cuda_slice(),
                out.cuda_slice_mut(),
                numel as i32,
                num_experts as i32,
            ),
        )?;
    }

    out.to_vec()
}

/// Ensure the expert_count PTX module is loaded on the device.
fn ensure_kernels_loaded(ctx: &CudaContext) -> Result<()> {
    let device = ctx.device();
    if !device.has_func(MODULE_NAME, KERNEL_NAMES[0]) {
        device.load_ptx(cudarc::nvrtc::Ptx::from_src(PTX), MODULE_NAME, KERNEL_NAMES)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch;

    fn gpu_context() -> Option<CudaContext> {
        if CudaContext::device_count() == 0 {
            eprintln!("Skipping GPU test: no CUDA device available");
            return None;
        }
        Some(CudaContext::new(0).expect("Failed to create CUDA context"))
    }

    #[test]
    fn test_expert_count_basic() {
        let Some(ctx) = gpu_context() else { return };

        let x_host: Vec<i64> = vec![0, 1, 1, 0, 3];
        let x = CudaTensor::from_slice(&ctx, &[5], &x_host).unwrap();

        let counts = expert_count(&x, 4).unwrap();
        assert_eq!(counts, dispatch::expert_count(&x_host, 4));
        assert_eq!(counts, vec![2, 2, 0, 1]);
    }

    #[test]
    fn test_expert_count_skips_out_of_range() {
        let Some(ctx) = gpu_context() else { return };

        let x_host: Vec<i64> = vec![0, -1, 5, 2, 1, 99, -7];
        let x = CudaTensor::from_slice(&ctx, &[7], &x_host).unwrap();

        let counts = expert_count(&x, 3).unwrap();
        assert_eq!(counts, vec![1, 1, 1]);
    }

    #[test]
    fn test_expert_count_i32_kernel() {
        let Some(ctx) = gpu_context() else { return };

        let x_host: Vec<i32> = vec![2, 2, 2, 0];
        let x = CudaTensor::from_slice(&ctx, &[2, 2], &x_host).unwrap();

        let counts = expert_count(&x, 3).unwrap();
        assert_eq!(counts, vec![1, 0, 3]);
    }
}
