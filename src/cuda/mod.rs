//! CUDA backend: device context, integer tensors, and the dispatch operators

mod context;
pub mod ops;
mod tensor;

pub use context::CudaContext;
pub use tensor::CudaTensor;
