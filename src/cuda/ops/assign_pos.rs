//! GPU scatter of token positions into per-expert slot ranges

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

use cudarc::driver::{DeviceRepr, LaunchAsync, LaunchConfig, ValidAsZeroBits};

use crate::cuda::{CudaContext, CudaTensor};
use crate::dtype::DispatchDType;
use crate::{Error, Result};

const PTX: &str = include_str!(concat!(env!("OUT_DIR"), "/kernels/assign_pos.ptx"));
const MODULE_NAME: &str = "assign_pos";
const KERNEL_NAMES: &[&str] = &["assign_pos_i32", "assign_pos_i64"];

/// Assign each token a slot in its expert's contiguous output range and
/// copy the resulting positions back to the host.
///
/// `cum_count[e]` is the exclusive end of expert `e`'s slot range. The
/// kernel claims slots by atomically decrementing a scratch copy of the
/// boundaries, so the caller's tensor is never modified. Tokens with
/// negative ids are dropped. The order of positions *within* an expert's
/// range depends on thread scheduling and is nondeterministic; only the
/// set of positions per range is guaranteed. Validate against the host
/// reference with [`crate::compare::positions_match_per_expert`].
///
/// The input shape is irrelevant: a `[100, 2]` assignment tensor is
/// consumed as its flat 200 elements. The output has length
/// `cum_count.last()` and starts zero-filled.
///
/// # Errors
/// Returns an error if allocation, the kernel launch, or a transfer fails.
pub fn assign_pos<T>(x: &CudaTensor<T>, cum_count: &CudaTensor<T>) -> Result<Vec<T>>
where
    T: DispatchDType + DeviceRepr + ValidAsZeroBits,
{
    // The final boundary sizes the output; reading it back is a tiny DtoH.
    let bounds = cum_count.to_vec()?;
    let total = bounds
        .last()
        .map_or(0_i64, |&c| Into::<i64>::into(c).max(0)) as usize;
    if total == 0 {
        return Ok(Vec::new());
    }
    if x.numel() == 0 {
        // Nothing to scatter: every slot keeps its zero fill.
        return Ok(vec![T::default(); total]);
    }

    let out = assign_pos_gpu(x, cum_count, total)?;
    out.to_vec()
}

/// Launch the scatter kernel, leaving the positions on the GPU.
fn assign_pos_gpu<T>(
    x: &CudaTensor<T>,
    cum_count: &CudaTensor<T>,
    total: usize,
) -> Result<CudaTensor<T>>
where
    T: DispatchDType + DeviceRepr + ValidAsZeroBits,
{
    let ctx = x.context();

    // The kernel consumes the running counters in place; work on a copy.
    let mut running = cum_count.try_clone()?;
    let mut out = CudaTensor::<T>::zeros(ctx, &[total])?;

    ensure_kernels_loaded(ctx)?;
    let kernel_name = format!("assign_pos_{}", T::KERNEL_SUFFIX);
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
                running.cuda_slice_mut(),
                out.cuda_slice_mut(),
                numel as i32,
            ),
        )?;
    }

    Ok(out)
}

/// Ensure the assign_pos PTX module is loaded on the device.
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
    use crate::compare::positions_match_per_expert;
    use crate::dispatch;

    fn gpu_context() -> Option<CudaContext> {
        if CudaContext::device_count() == 0 {
            eprintln!("Skipping GPU test: no CUDA device available");
            return None;
        }
        Some(CudaContext::new(0).expect("Failed to create CUDA context"))
    }

    #[test]
    fn test_assign_pos_concrete_scenario() {
        let Some(ctx) = gpu_context() else { return };

        // Tokens 0 and 3 go to expert 0, tokens 1 and 2 to expert 1.
        let x_host: Vec<i64> = vec![0, 1, 1, 0];
        let cum_host: Vec<i64> = vec![2, 4];

        let x = CudaTensor::from_slice(&ctx, &[2, 2], &x_host).unwrap();
        let cum_count = CudaTensor::from_slice(&ctx, &[2], &cum_host).unwrap();

        let out = assign_pos(&x, &cum_count).unwrap();
        assert_eq!(out.len(), 4);

        let reference = dispatch::assign_pos(&x_host, &cum_host).unwrap();
        positions_match_per_expert(&reference, &out, &cum_host).unwrap();

        // Caller's boundaries survive the launch.
        assert_eq!(cum_count.to_vec().unwrap(), cum_host);
    }

    #[test]
    fn test_assign_pos_drops_negative_ids() {
        let Some(ctx) = gpu_context() else { return };

        let x_host: Vec<i64> = vec![-1, 0, -3, 1];
        let cum_host: Vec<i64> = vec![1, 2];

        let x = CudaTensor::from_slice(&ctx, &[4], &x_host).unwrap();
        let cum_count = CudaTensor::from_slice(&ctx, &[2], &cum_host).unwrap();

        let out = assign_pos(&x, &cum_count).unwrap();
        assert_eq!(out, vec![1, 3]);
    }

    #[test]
    fn test_assign_pos_i32_kernel() {
        let Some(ctx) = gpu_context() else { return };

        let x_host: Vec<i32> = vec![0, 1, 1, 0];
        let cum_host: Vec<i32> = vec![2, 4];

        let x = CudaTensor::from_slice(&ctx, &[4], &x_host).unwrap();
        let cum_count = CudaTensor::from_slice(&ctx, &[2], &cum_host).unwrap();

        let out = assign_pos(&x, &cum_count).unwrap();
        let out_i64: Vec<i64> = out.into_iter().map(i64::from).collect();

        let x_i64: Vec<i64> = x_host.into_iter().map(i64::from).collect();
        let cum_i64: Vec<i64> = cum_host.into_iter().map(i64::from).collect();
        let reference = dispatch::assign_pos(&x_i64, &cum_i64).unwrap();
        positions_match_per_expert(&reference, &out_i64, &cum_i64).unwrap();
    }

    #[test]
    fn test_assign_pos_empty_boundaries() {
        let Some(ctx) = gpu_context() else { return };

        let x = CudaTensor::from_slice(&ctx, &[2], &[0_i64, 0]).unwrap();
        let cum_count = CudaTensor::from_slice(&ctx, &[1], &[0_i64]).unwrap();

        assert_eq!(assign_pos(&x, &cum_count).unwrap(), Vec::<i64>::new());
    }
}
