/*
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Sponsorship arithmetic: conversion between asset-denominated fees and base-unit fees at
//! the issuer-declared rate.
//!
//! A rate of `r` means the issuer declares `r` asset units equivalent to one [FEE_UNIT] of
//! base fee. The conversion is computed in `i128`, which is exact for every `i64 × FEE_UNIT`
//! product, and narrowed back with an overflow check. Division floors.

use crate::error::RejectError;
use crate::fees::FEE_UNIT;

/// Converts an asset-denominated fee into base units. A zero rate means the asset is not
/// sponsored; the conversion then returns `i64::MAX` as the "unusable" sentinel, which makes
/// every minimum-fee comparison fail downstream without a special case.
pub fn to_base(asset_fee: i64, rate: i64) -> Result<i64, RejectError> {
    if rate == 0 {
        return Ok(i64::MAX);
    }
    let wide = (asset_fee as i128)
        .checked_mul(FEE_UNIT as i128)
        .map(|product| product.div_euclid(rate as i128))
        .ok_or(RejectError::OverflowError)?;
    i64::try_from(wide).map_err(|_| RejectError::OverflowError)
}

/// Converts a base-unit fee into asset units. Callers must not pass a zero rate; the only
/// route to this function is through an asset already validated as sponsored.
pub fn from_base(base_fee: i64, rate: i64) -> Result<i64, RejectError> {
    let wide = (base_fee as i128)
        .checked_mul(rate as i128)
        .map(|product| product.div_euclid(FEE_UNIT as i128))
        .ok_or(RejectError::OverflowError)?;
    i64::try_from(wide).map_err(|_| RejectError::OverflowError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_is_unusable() {
        assert_eq!(to_base(1, 0).unwrap(), i64::MAX);
    }

    #[test]
    fn conversion_floors() {
        // 3 asset units at rate 2: 3 * 100_000 / 2
        assert_eq!(to_base(3, 2).unwrap(), 150_000);
        // 1 asset unit at rate 3: floor(100_000 / 3)
        assert_eq!(to_base(1, 3).unwrap(), 33_333);
        assert_eq!(from_base(33_333, 3).unwrap(), 0);
        assert_eq!(from_base(150_000, 2).unwrap(), 3);
    }

    #[test]
    fn wide_products_do_not_wrap() {
        // i64::MAX * FEE_UNIT exceeds i64 but fits i128; narrowing detects the excess.
        assert_eq!(to_base(i64::MAX, 1), Err(RejectError::OverflowError));
        // and a large rate brings it back into range
        assert!(to_base(i64::MAX, FEE_UNIT).is_ok());
    }
}
