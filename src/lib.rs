//! Expert-dispatch position assignment for mixture-of-experts routing.
//!
//! When MoE routing scatters tokens to experts, each token needs a slot in
//! its expert's contiguous output range. This crate provides the host
//! reference implementations of the dispatch operators ([`dispatch`]), an
//! order-insensitive validator for the per-expert slot contract
//! ([`compare`]), and, behind the `cuda` feature, the cudarc-based GPU
//! operators those references are oracles for.

pub mod compare;
pub mod dispatch;
pub mod dtype;
pub mod error;

#[cfg(feature = "cuda")]
pub mod cuda;

pub use compare::positions_match_per_expert;
pub use dispatch::{assign_pos, cumsum, expert_count};
pub use dtype::{DType, DispatchDType};
pub use error::{Error, Result};
