/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Fee constants and the minimum-fee formula for script invocations.
//!
//! All constants are denominated in the smallest base-asset unit. The invoke minimum fee is a
//! function of consumed complexity (in steps), the number of non-NFT assets issued by the
//! invocation, and the number of extra script runs the transaction triggered.

use crate::lang::StdLibVersion;
use crate::limits;

/// Base fee quantum. One `FEE_UNIT` is the smallest schedulable fee amount.
pub const FEE_UNIT: i64 = 100_000;

/// Invoke-script fee in `FEE_UNIT`s per complexity step.
pub const INVOKE_FEE_BASE: i64 = 5;

/// Fee in `FEE_UNIT`s per non-NFT asset issued by an invocation.
pub const ISSUE_FEE_BASE: i64 = 1000;

/// Fee in `FEE_UNIT`s per extra script invocation (verifier or asset script).
pub const SCRIPT_EXTRA_FEE: i64 = 4;

/// Complexity steps consumed by an invocation. Every started step counts; the cheapest
/// possible invocation still occupies one step.
pub fn invoke_steps(used_complexity: u64, version: StdLibVersion) -> u64 {
    let step_limit = limits::step_limit(version);
    used_complexity.div_ceil(step_limit).max(1)
}

/// Minimum fee of an invoke-script transaction, in base units.
pub fn min_invoke_fee(
    version: StdLibVersion,
    used_complexity: u64,
    non_nft_issues: u32,
    extra_script_invocations: u32,
) -> i64 {
    let steps = invoke_steps(used_complexity, version) as i64;
    FEE_UNIT.saturating_mul(
        INVOKE_FEE_BASE
            .saturating_mul(steps)
            .saturating_add(ISSUE_FEE_BASE.saturating_mul(non_nft_issues as i64))
            .saturating_add(SCRIPT_EXTRA_FEE.saturating_mul(extra_script_invocations as i64)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_step_minimum() {
        assert_eq!(invoke_steps(0, StdLibVersion::V5), 1);
        assert_eq!(invoke_steps(1, StdLibVersion::V5), 1);
        assert_eq!(invoke_steps(10_000, StdLibVersion::V5), 1);
        assert_eq!(invoke_steps(10_001, StdLibVersion::V5), 2);
    }

    #[test]
    fn min_fee_components() {
        // one step, nothing else: 5 * 100_000
        assert_eq!(min_invoke_fee(StdLibVersion::V5, 100, 0, 0), 500_000);
        // issued asset adds 1000 fee units
        assert_eq!(min_invoke_fee(StdLibVersion::V5, 100, 1, 0), 500_000 + 100_000_000);
        // each extra script run adds 4 fee units
        assert_eq!(min_invoke_fee(StdLibVersion::V5, 100, 0, 2), 500_000 + 800_000);
    }
}
