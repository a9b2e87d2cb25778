//! Basis-point validation and integer-exact payment splitting.
//!
//! All splits are computed in 128-bit intermediates and truncate toward
//! zero. Amounts are u64 base units and basis points are at most 10000, so
//! every product stays below 2^64 * 2^14 = 2^78 and the quotient fits back
//! into u64; the checked paths exist to turn any domain violation into
//! [`ComposeError::AmountOverflow`] instead of a wrap or a panic.

use crate::error::ComposeError;

/// One whole, in basis points.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// The exact integer decomposition of a payment amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    /// Amount forwarded to the merchant payout wallet.
    pub payout: u64,
    /// Amount converted into the merchant's buyback token.
    pub buyback: u64,
    /// Amount collected by the protocol fee wallet.
    pub protocol_fee: u64,
}

/// Validates the merchant split configuration.
///
/// # Errors
///
/// Returns [`ComposeError::InvalidBasisPoints`] if `payout_bps +
/// buyback_bps` exceeds 10000.
pub fn ensure_split_bps(payout_bps: u16, buyback_bps: u16) -> Result<(), ComposeError> {
    let sum = u32::from(payout_bps) + u32::from(buyback_bps);
    if sum > BPS_DENOMINATOR as u32 {
        return Err(ComposeError::InvalidBasisPoints(format!(
            "payout {payout_bps} + buyback {buyback_bps} exceeds 10000"
        )));
    }
    Ok(())
}

/// Validates a standalone fraction (burn-of-buyback, slippage tolerance).
///
/// # Errors
///
/// Returns [`ComposeError::InvalidBasisPoints`] if `bps` exceeds 10000.
pub fn ensure_fraction_bps(label: &str, bps: u16) -> Result<(), ComposeError> {
    if u64::from(bps) > BPS_DENOMINATOR {
        return Err(ComposeError::InvalidBasisPoints(format!(
            "{label} {bps} exceeds 10000"
        )));
    }
    Ok(())
}

/// `floor(amount * bps / 10000)` with a 128-bit intermediate.
fn mul_bps(amount: u64, bps: u64) -> Result<u64, ComposeError> {
    let product = u128::from(amount)
        .checked_mul(u128::from(bps))
        .ok_or(ComposeError::AmountOverflow)?;
    u64::try_from(product / u128::from(BPS_DENOMINATOR)).map_err(|_| ComposeError::AmountOverflow)
}

/// Splits `amount` into payout, buyback, and protocol-fee components.
///
/// The buyback and protocol fee are floored shares of the full amount; the
/// payout is the checked remainder, so `payout + buyback + protocol_fee ==
/// amount` always holds and nothing is ever invented by rounding up.
///
/// # Errors
///
/// Returns [`ComposeError::InvalidBasisPoints`] for an invalid split, or
/// [`ComposeError::AmountOverflow`] if buyback plus fee exceed the amount
/// (possible when `buyback_bps + protocol_fee_bps > 10000`).
pub fn split(
    amount: u64,
    payout_bps: u16,
    buyback_bps: u16,
    protocol_fee_bps: u16,
) -> Result<FeeSplit, ComposeError> {
    ensure_split_bps(payout_bps, buyback_bps)?;
    let buyback = mul_bps(amount, u64::from(buyback_bps))?;
    let protocol_fee = mul_bps(amount, u64::from(protocol_fee_bps))?;
    let payout = amount
        .checked_sub(buyback)
        .and_then(|rest| rest.checked_sub(protocol_fee))
        .ok_or(ComposeError::AmountOverflow)?;
    Ok(FeeSplit {
        payout,
        buyback,
        protocol_fee,
    })
}

/// Computes the minimum acceptable output for a quoted amount:
/// `floor(amount * (10000 - slippage_bps) / 10000)`.
///
/// # Errors
///
/// Returns [`ComposeError::InvalidBasisPoints`] if the tolerance exceeds
/// 10000, or [`ComposeError::AmountOverflow`] on a domain violation.
pub fn apply_slippage(amount: u64, slippage_bps: u16) -> Result<u64, ComposeError> {
    ensure_fraction_bps("slippage", slippage_bps)?;
    mul_bps(amount, BPS_DENOMINATOR - u64::from(slippage_bps))
}

/// Computes the portion of an acquired buyback amount to burn.
///
/// # Errors
///
/// Returns [`ComposeError::InvalidBasisPoints`] if `burn_bps` exceeds
/// 10000, or [`ComposeError::AmountOverflow`] on a domain violation.
pub fn burn_portion(buyback_amount: u64, burn_bps: u16) -> Result<u64, ComposeError> {
    ensure_fraction_bps("burn", burn_bps)?;
    mul_bps(buyback_amount, u64::from(burn_bps))
}
