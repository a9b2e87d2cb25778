//! Program-derived addresses and well-known mint constants.
//!
//! Every derivation is pure: fixed seed literals plus identifiers hashed
//! off a program id. Seed strings must match the deployed settlement
//! program exactly; the merchant seed takes the id as 8 little-endian
//! bytes.

use payrail::error::ComposeError;
use solana_pubkey::{Pubkey, pubkey};

/// Default settlement program deployment (devnet).
pub const DEFAULT_SETTLEMENT_PROGRAM_ID: Pubkey =
    pubkey!("JCjXHcUy7LzJsLBoafjem9wRffRyuyGYsiTz35Yyr9AH");

/// System program, also used as the quote-time placeholder payer.
pub const SYSTEM_PROGRAM_ID: Pubkey = pubkey!("11111111111111111111111111111111");

/// Associated Token Account program.
pub const ATA_PROGRAM_ID: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// Wrapped SOL mint, the intermediate leg of multi-hop buyback routes.
pub const SOL_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");

/// USDC mint on mainnet.
pub const USDC_MINT_MAINNET: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

/// USDC mint on devnet.
pub const USDC_MINT_DEVNET: Pubkey = pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU");

const PROTOCOL_SEED: &[u8] = b"protocol";
const VAULT_SEED: &[u8] = b"vault";
const VAULT_SOL_SEED: &[u8] = b"sol";
const VAULT_USDC_SEED: &[u8] = b"vault_usdc";
const MERCHANT_SEED: &[u8] = b"merchant";

/// Canonical derivation off the settlement program.
///
/// The no-bump-found path is astronomically rare but must surface as a
/// typed error, never a silent retry with mutated seeds.
fn derive(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8), ComposeError> {
    Pubkey::try_find_program_address(seeds, program_id)
        .ok_or(ComposeError::AddressDerivationExhausted)
}

/// Derives the protocol config singleton.
///
/// # Errors
///
/// Returns [`ComposeError::AddressDerivationExhausted`] if no bump exists.
pub fn protocol_config(program_id: &Pubkey) -> Result<(Pubkey, u8), ComposeError> {
    derive(&[PROTOCOL_SEED], program_id)
}

/// Derives the native SOL vault.
///
/// # Errors
///
/// Returns [`ComposeError::AddressDerivationExhausted`] if no bump exists.
pub fn vault_sol(program_id: &Pubkey) -> Result<(Pubkey, u8), ComposeError> {
    derive(&[VAULT_SEED, VAULT_SOL_SEED], program_id)
}

/// Derives the USDC vault for the given mint.
///
/// # Errors
///
/// Returns [`ComposeError::AddressDerivationExhausted`] if no bump exists.
pub fn vault_usdc(usdc_mint: &Pubkey, program_id: &Pubkey) -> Result<(Pubkey, u8), ComposeError> {
    derive(&[VAULT_USDC_SEED, usdc_mint.as_ref()], program_id)
}

/// Derives a merchant's registry entry from its numeric id.
///
/// # Errors
///
/// Returns [`ComposeError::AddressDerivationExhausted`] if no bump exists.
pub fn merchant_registry(
    merchant_id: u64,
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), ComposeError> {
    derive(&[MERCHANT_SEED, &merchant_id.to_le_bytes()], program_id)
}

/// Derives the associated token account for `wallet` holding `mint`.
///
/// # Errors
///
/// Returns [`ComposeError::AddressDerivationExhausted`] if no bump exists.
pub fn associated_token_account(wallet: &Pubkey, mint: &Pubkey) -> Result<Pubkey, ComposeError> {
    let (ata, _) = derive(
        &[wallet.as_ref(), spl_token::ID.as_ref(), mint.as_ref()],
        &ATA_PROGRAM_ID,
    )?;
    Ok(ata)
}

/// Parses a base58 address from request or store input.
///
/// # Errors
///
/// Returns [`ComposeError::MalformedAddress`] if `input` is not a valid
/// base58 public key.
pub fn parse_address(input: &str) -> Result<Pubkey, ComposeError> {
    input
        .parse::<Pubkey>()
        .map_err(|_| ComposeError::MalformedAddress(input.to_owned()))
}
