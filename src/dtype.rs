//! Integer element types accepted by the dispatch operators

use std::fmt;

/// Supported element types for assignment and count tensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
}

impl DType {
    /// Size of the dtype in bytes
    #[must_use]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::I32 => 4,
            Self::I64 => 8,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32 => write!(f, "i32"),
            Self::I64 => write!(f, "i64"),
        }
    }
}

/// Trait tying each supported element type to its [`DType`] tag and the
/// kernel entry points compiled for it.
///
/// The native operator ships an int and an int64 variant; kernel names are
/// formed as `<op>_<KERNEL_SUFFIX>` (`assign_pos_i64`, `expert_count_i32`, ...).
pub trait DispatchDType: Copy + Default + Into<i64> + Send + Sync + 'static {
    /// The corresponding `DType` enum value
    const DTYPE: DType;
    /// Suffix selecting this type's kernel entry points
    const KERNEL_SUFFIX: &'static str;
}

impl DispatchDType for i32 {
    const DTYPE: DType = DType::I32;
    const KERNEL_SUFFIX: &'static str = "i32";
}

impl DispatchDType for i64 {
    const DTYPE: DType = DType::I64;
    const KERNEL_SUFFIX: &'static str = "i64";
}
