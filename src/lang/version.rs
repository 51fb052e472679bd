/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Standard-library versions and the semantic-fix switches that ride along with them.

use borsh::BorshSerialize;

/// Protocol-level identifier selecting function sets, limits and semantic fixes for one script.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize)]
pub enum StdLibVersion {
    V3,
    V4,
    V5,
}

impl StdLibVersion {
    /// Synchronous dApp calls exist only since V5.
    pub fn supports_sync_calls(&self) -> bool {
        *self >= StdLibVersion::V5
    }
}

/// Semantic switches that changed behaviour between versions. They are configuration, not
/// derived from the version, so a chain can activate a fix independently of scripts moving
/// to a new standard library.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LangConfig {
    /// Character-based instead of byte-based `take`/`drop`/`size`/`indexOf` on strings.
    pub fix_unicode_functions: bool,
    /// Checked instead of saturating integer exponentiation.
    pub use_new_pow_precision: bool,
    /// Forbid invoke payments where the dApp pays itself. Only effective for V4+ scripts.
    pub disallow_self_payment: bool,
}

impl LangConfig {
    /// The switch positions that shipped with each standard-library version.
    pub fn defaults_for(version: StdLibVersion) -> Self {
        let fixed = version >= StdLibVersion::V5;
        Self {
            fix_unicode_functions: fixed,
            use_new_pow_precision: fixed,
            disallow_self_payment: version >= StdLibVersion::V4,
        }
    }
}

impl Default for LangConfig {
    fn default() -> Self {
        Self::defaults_for(StdLibVersion::V5)
    }
}
