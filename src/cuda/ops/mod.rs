//! GPU dispatch operators

mod assign_pos;
mod expert_count;

pub use assign_pos::assign_pos;
pub use expert_count::expert_count;
