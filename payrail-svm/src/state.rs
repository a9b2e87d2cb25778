//! On-chain protocol and merchant records.
//!
//! Both records are owned by the settlement program and reach this crate as
//! raw account bytes: an 8-byte discriminator prefix followed by the borsh
//! struct. Every field is untrusted input until the decode succeeds against
//! the schema, and callers must re-fetch rather than trust a cached copy.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_pubkey::Pubkey;

/// Discriminator prefixes from the deployed program's interface definition.
pub const PROTOCOL_CONFIG_DISCRIMINATOR: [u8; 8] = [45, 207, 116, 6, 238, 123, 12, 93];
/// Discriminator for [`MerchantRegistry`] accounts.
pub const MERCHANT_REGISTRY_DISCRIMINATOR: [u8; 8] = [199, 62, 81, 203, 7, 90, 241, 39];

/// Failure to interpret fetched account bytes as a known record.
#[derive(Debug, thiserror::Error)]
pub enum AccountDecodeError {
    /// The account data is shorter than the discriminator prefix.
    #[error("Account data shorter than the discriminator prefix")]
    TooShort,
    /// The discriminator does not match the expected record type.
    #[error("Account discriminator does not match {0}")]
    DiscriminatorMismatch(&'static str),
    /// The struct body failed borsh decoding.
    #[error("Account layout decode failed for {0}: {1}")]
    Layout(&'static str, String),
}

/// Protocol-wide configuration singleton, read-only to this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ProtocolConfig {
    /// Protocol admin.
    pub authority: Pubkey,
    /// Protocol fee in basis points, enforced on chain and mirrored here
    /// for quote display.
    pub protocol_fee_bps: u16,
    /// Protocol fee recipient wallet.
    pub protocol_wallet: Pubkey,
    /// The only router program trusted for buyback swaps.
    pub jupiter_router: Pubkey,
    /// Emergency pause flag.
    pub paused: bool,
    /// PDA bump.
    pub bump: u8,
}

/// One merchant's on-chain registry entry, read-only to this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MerchantRegistry {
    /// Numeric merchant identifier, also the PDA seed.
    pub merchant_id: u64,
    /// Wallet allowed to update the entry.
    pub owner: Pubkey,
    /// Payout destination validated on chain against this field.
    pub payout_wallet: Pubkey,
    /// Buyback token mint validated on chain against this field.
    pub buyback_mint: Pubkey,
    /// Emergency freeze flag.
    pub frozen: bool,
    /// PDA bump.
    pub bump: u8,
}

fn decode_record<T: BorshDeserialize>(
    name: &'static str,
    discriminator: &[u8; 8],
    data: &[u8],
) -> Result<T, AccountDecodeError> {
    let (prefix, mut body) = data
        .split_at_checked(discriminator.len())
        .ok_or(AccountDecodeError::TooShort)?;
    if prefix != discriminator {
        return Err(AccountDecodeError::DiscriminatorMismatch(name));
    }
    // Trailing padding after the struct body is tolerated, matching how the
    // chain program sizes its accounts.
    T::deserialize(&mut body).map_err(|e| AccountDecodeError::Layout(name, e.to_string()))
}

impl ProtocolConfig {
    /// Decodes a fetched protocol config account.
    ///
    /// # Errors
    ///
    /// Returns [`AccountDecodeError`] if the bytes are not a protocol
    /// config record.
    pub fn decode(data: &[u8]) -> Result<Self, AccountDecodeError> {
        decode_record("ProtocolConfig", &PROTOCOL_CONFIG_DISCRIMINATOR, data)
    }

    /// Encodes the record with its discriminator prefix, for fixtures and
    /// local validators.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = PROTOCOL_CONFIG_DISCRIMINATOR.to_vec();
        borsh::to_writer(&mut out, self).expect("borsh encoding of a fixed-size record");
        out
    }
}

impl MerchantRegistry {
    /// Decodes a fetched merchant registry account.
    ///
    /// # Errors
    ///
    /// Returns [`AccountDecodeError`] if the bytes are not a merchant
    /// registry record.
    pub fn decode(data: &[u8]) -> Result<Self, AccountDecodeError> {
        decode_record("MerchantRegistry", &MERCHANT_REGISTRY_DISCRIMINATOR, data)
    }

    /// Encodes the record with its discriminator prefix, for fixtures and
    /// local validators.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = MERCHANT_REGISTRY_DISCRIMINATOR.to_vec();
        borsh::to_writer(&mut out, self).expect("borsh encoding of a fixed-size record");
        out
    }
}
