//! Host reference implementations of the expert-dispatch operators.
//!
//! These are the oracles the GPU kernels are validated against. They run
//! sequentially, so unlike the kernels their intra-expert fill order is
//! deterministic: slots are claimed back-to-front, meaning the last token
//! routed to an expert lands in the expert's first slot.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

use crate::{Error, Result};

/// Count how many tokens are assigned to each expert.
///
/// Returns a histogram of length `num_experts`. Ids outside
/// `[0, num_experts)`, negative ones included, are silently skipped.
#[must_use]
pub fn expert_count(x: &[i64], num_experts: usize) -> Vec<i64> {
    let mut counts = vec![0_i64; num_experts];
    for &id in x {
        if let Ok(idx) = usize::try_from(id) {
            if idx < num_experts {
                counts[idx] += 1;
            }
        }
    }
    counts
}

/// Inclusive prefix sum of per-expert counts.
///
/// The last entry is the total routed-token count, which is also the
/// output length of [`assign_pos`].
#[must_use]
pub fn cumsum(counts: &[i64]) -> Vec<i64> {
    let mut acc = 0_i64;
    counts
        .iter()
        .map(|&c| {
            acc += c;
            acc
        })
        .collect()
}

/// Assign each token a slot in its expert's contiguous output range.
///
/// `cum_count[e]` is the exclusive end of expert `e`'s slot range; the
/// caller's array is never modified (the running counters are a copy).
/// For each token position `i`, in input order, the running counter of
/// expert `x[i]` is read and decremented, and `i` is written one slot
/// below the value read. Tokens with negative ids are dropped, matching
/// the GPU kernel's guard.
///
/// The output has length `cum_count.last()` and starts zero-filled, so
/// slots never claimed (possible only with an inconsistent `cum_count`)
/// stay zero.
///
/// # Errors
/// Returns [`Error::NonMonotonicCumCount`] if `cum_count` decreases, and
/// [`Error::InvalidExpertId`] if a non-negative id has no `cum_count` entry.
pub fn assign_pos(x: &[i64], cum_count: &[i64]) -> Result<Vec<i64>> {
    for (i, w) in cum_count.windows(2).enumerate() {
        if w[1] < w[0] {
            return Err(Error::NonMonotonicCumCount {
                index: i + 1,
                value: w[1],
                previous: w[0],
            });
        }
    }

    // Non-decreasing boundaries guarantee every claimed slot p - 1 < total.
    let total = usize::try_from(cum_count.last().copied().unwrap_or(0)).unwrap_or(0);
    let mut running = cum_count.to_vec();
    let mut res = vec![0_i64; total];

    for (i, &id) in x.iter().enumerate() {
        if id < 0 {
            continue;
        }
        let idx = id as usize;
        if idx >= running.len() {
            return Err(Error::InvalidExpertId {
                id,
                num_experts: running.len(),
            });
        }
        let p = running[idx];
        running[idx] -= 1;
        if p >= 1 {
            res[(p - 1) as usize] = i as i64;
        }
    }

    Ok(res)
}
