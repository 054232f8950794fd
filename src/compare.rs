//! Order-insensitive comparison of dispatch outputs.
//!
//! The GPU operator claims slots with atomics, so two tokens routed to the
//! same expert can land in either order within the expert's slot range. The
//! operator's contract is the *set* of positions per range, and that is what
//! gets compared here: each range is sorted on both sides before an exact
//! element-wise check. The fill order the host reference happens to produce
//! is deliberately not enforced.

#![allow(clippy::cast_possible_wrap)]

use crate::{Error, Result};

/// Check that `reference` and `actual` agree per expert slot range.
///
/// `cum_count[e]` is the exclusive end of expert `e`'s range. Zero-width
/// ranges are skipped. Comparison is exact: positions are integer indices,
/// so there is no tolerance to apply.
///
/// # Errors
/// Returns [`Error::LengthMismatch`] if the outputs differ in length or a
/// boundary exceeds them, [`Error::NonMonotonicCumCount`] if the boundaries
/// decrease, and [`Error::PositionMismatch`] naming the first expert whose
/// sorted ranges differ.
pub fn positions_match_per_expert(
    reference: &[i64],
    actual: &[i64],
    cum_count: &[i64],
) -> Result<()> {
    if reference.len() != actual.len() {
        return Err(Error::LengthMismatch {
            expected: reference.len(),
            got: actual.len(),
        });
    }

    let mut c0 = 0_usize;
    for (expert, &bound) in cum_count.iter().enumerate() {
        let c = usize::try_from(bound).map_err(|_| Error::NonMonotonicCumCount {
            index: expert,
            value: bound,
            previous: c0 as i64,
        })?;
        if c < c0 {
            return Err(Error::NonMonotonicCumCount {
                index: expert,
                value: bound,
                previous: c0 as i64,
            });
        }
        if c > reference.len() {
            return Err(Error::LengthMismatch {
                expected: reference.len(),
                got: c,
            });
        }
        if c == c0 {
            continue;
        }

        let mut lhs = reference[c0..c].to_vec();
        let mut rhs = actual[c0..c].to_vec();
        lhs.sort_unstable();
        rhs.sort_unstable();
        if lhs != rhs {
            return Err(Error::PositionMismatch {
                expert,
                start: c0,
                end: c,
                reference: lhs,
                actual: rhs,
            });
        }
        c0 = c;
    }

    Ok(())
}
