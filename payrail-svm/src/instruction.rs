//! Settle instruction and unsigned transaction assembly.
//!
//! The settle instruction carries a fixed, schema-declared account list
//! followed by the merged swap route accounts. The chain program indexes
//! remaining accounts positionally starting at the end of the fixed list,
//! so the fixed order here must never change.

use payrail::asset::PayAsset;
use payrail::encoding;
use solana_compute_budget_interface::ID as COMPUTE_BUDGET_PROGRAM_ID;
use solana_hash::Hash;
use solana_instruction::{AccountMeta, Instruction};
use solana_message::{VersionedMessage, v0};
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;

use crate::extract::AccountRequirement;
use crate::pda::SYSTEM_PROGRAM_ID;

/// Method discriminator for the settle instruction, from the deployed
/// program's interface definition.
pub const SETTLE_DISCRIMINATOR: [u8; 8] = [130, 209, 91, 58, 200, 168, 29, 115];

/// The sixteen fixed-role accounts of a settle instruction, in canonical
/// order. The token and system program references are appended internally.
#[derive(Debug, Clone, Copy)]
pub struct SettleAccounts {
    /// Protocol config PDA.
    pub protocol_config: Pubkey,
    /// Merchant registry PDA.
    pub merchant_registry: Pubkey,
    /// Paying buyer; the transaction fee payer and only signer.
    pub payer: Pubkey,
    /// Native SOL vault PDA.
    pub vault_sol: Pubkey,
    /// USDC vault PDA.
    pub vault_usdc: Pubkey,
    /// USDC mint.
    pub usdc_mint: Pubkey,
    /// Token account receiving bought-back tokens.
    pub vault_buyback_token: Pubkey,
    /// Buyback token mint.
    pub buyback_mint: Pubkey,
    /// Protocol fee wallet.
    pub protocol_wallet: Pubkey,
    /// Protocol fee wallet's USDC account.
    pub protocol_wallet_usdc: Pubkey,
    /// Merchant payout wallet, validated on chain against the registry.
    pub merchant_payout_wallet: Pubkey,
    /// Merchant payout wallet's USDC account.
    pub merchant_payout_usdc: Pubkey,
    /// Buyer's USDC account; the payer wallet itself on SOL payments.
    pub payer_usdc_account: Pubkey,
    /// Trusted router program, validated on chain against the config.
    pub jupiter_router: Pubkey,
}

impl SettleAccounts {
    /// All fixed addresses, including the program references, in
    /// instruction order. This is the duplicate filter for extracted swap
    /// accounts.
    #[must_use]
    pub fn fixed_addresses(&self) -> Vec<Pubkey> {
        vec![
            self.protocol_config,
            self.merchant_registry,
            self.payer,
            self.vault_sol,
            self.vault_usdc,
            self.usdc_mint,
            self.vault_buyback_token,
            self.buyback_mint,
            self.protocol_wallet,
            self.protocol_wallet_usdc,
            self.merchant_payout_wallet,
            self.merchant_payout_usdc,
            self.payer_usdc_account,
            self.jupiter_router,
            spl_token::ID,
            SYSTEM_PROGRAM_ID,
        ]
    }

    fn metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new_readonly(self.protocol_config, false),
            AccountMeta::new_readonly(self.merchant_registry, false),
            AccountMeta::new(self.payer, true),
            AccountMeta::new(self.vault_sol, false),
            AccountMeta::new(self.vault_usdc, false),
            AccountMeta::new_readonly(self.usdc_mint, false),
            AccountMeta::new(self.vault_buyback_token, false),
            AccountMeta::new(self.buyback_mint, false),
            AccountMeta::new(self.protocol_wallet, false),
            AccountMeta::new(self.protocol_wallet_usdc, false),
            AccountMeta::new(self.merchant_payout_wallet, false),
            AccountMeta::new(self.merchant_payout_usdc, false),
            AccountMeta::new(self.payer_usdc_account, false),
            AccountMeta::new_readonly(self.jupiter_router, false),
            AccountMeta::new_readonly(spl_token::ID, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ]
    }
}

/// Numeric arguments of a settle instruction, encoded in declaration order.
#[derive(Debug, Clone, Copy)]
pub struct SettleArgs {
    /// Merchant identifier.
    pub merchant_id: u64,
    /// Payment amount in base units.
    pub amount: u64,
    /// The asset the buyer pays with.
    pub asset: PayAsset,
    /// Minimum acceptable buyback swap output.
    pub min_out: u64,
    /// Merchant payout share in basis points.
    pub payout_bps: u16,
    /// Buyback share in basis points.
    pub buyback_bps: u16,
    /// Burn fraction of the buyback in basis points.
    pub burn_bps: u16,
}

impl SettleArgs {
    /// Encodes the discriminator-prefixed little-endian argument block.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(39);
        data.extend_from_slice(&SETTLE_DISCRIMINATOR);
        data.extend_from_slice(&self.merchant_id.to_le_bytes());
        data.extend_from_slice(&self.amount.to_le_bytes());
        data.push(self.asset.instruction_tag());
        data.extend_from_slice(&self.min_out.to_le_bytes());
        data.extend_from_slice(&self.payout_bps.to_le_bytes());
        data.extend_from_slice(&self.buyback_bps.to_le_bytes());
        data.extend_from_slice(&self.burn_bps.to_le_bytes());
        data
    }
}

/// Builds the settle instruction with remaining accounts appended after
/// the fixed list.
#[must_use]
pub fn settle_instruction(
    program_id: &Pubkey,
    accounts: &SettleAccounts,
    args: &SettleArgs,
    remaining: &[AccountRequirement],
) -> Instruction {
    let mut metas = accounts.metas();
    metas.extend(remaining.iter().map(|requirement| AccountMeta {
        pubkey: requirement.address,
        is_signer: requirement.is_signer,
        is_writable: requirement.is_writable,
    }));
    Instruction {
        program_id: *program_id,
        accounts: metas,
        data: args.encode(),
    }
}

/// Builds a compute-unit-limit directive (`[0x02, u32 LE]`).
#[must_use]
pub fn compute_unit_limit_instruction(units: u32) -> Instruction {
    let mut data = Vec::with_capacity(5);
    data.push(2);
    data.extend_from_slice(&units.to_le_bytes());
    Instruction {
        program_id: COMPUTE_BUDGET_PROGRAM_ID,
        accounts: Vec::new(),
        data,
    }
}

/// Builds a compute-unit-price directive (`[0x03, u64 LE]`), the priority
/// fee in micro-lamports.
#[must_use]
pub fn compute_unit_price_instruction(micro_lamports: u64) -> Instruction {
    let mut data = Vec::with_capacity(9);
    data.push(3);
    data.extend_from_slice(&micro_lamports.to_le_bytes());
    Instruction {
        program_id: COMPUTE_BUDGET_PROGRAM_ID,
        accounts: Vec::new(),
        data,
    }
}

/// Error compiling or encoding the unsigned transaction.
#[derive(Debug, thiserror::Error)]
#[error("Can not assemble unsigned transaction: {0}")]
pub struct TransactionAssemblyError(pub String);

/// Compiles instructions into an unsigned v0 transaction with the fee
/// payer and blockhash stamped into the header. Signature slots are left
/// as defaults for the caller's wallet to fill.
///
/// # Errors
///
/// Returns [`TransactionAssemblyError`] if message compilation fails.
pub fn build_unsigned_transaction(
    payer: &Pubkey,
    instructions: &[Instruction],
    recent_blockhash: Hash,
) -> Result<VersionedTransaction, TransactionAssemblyError> {
    let message = v0::Message::try_compile(payer, instructions, &[], recent_blockhash)
        .map_err(|e| TransactionAssemblyError(e.to_string()))?;
    let num_signatures = message.header.num_required_signatures as usize;
    Ok(VersionedTransaction {
        signatures: vec![Signature::default(); num_signatures],
        message: VersionedMessage::V0(message),
    })
}

/// Serializes a transaction to standard base64.
///
/// # Errors
///
/// Returns [`TransactionAssemblyError`] if wire serialization fails.
pub fn encode_transaction_base64(
    transaction: &VersionedTransaction,
) -> Result<String, TransactionAssemblyError> {
    let bytes =
        bincode::serialize(transaction).map_err(|e| TransactionAssemblyError(e.to_string()))?;
    Ok(encoding::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts() -> SettleAccounts {
        SettleAccounts {
            protocol_config: Pubkey::new_unique(),
            merchant_registry: Pubkey::new_unique(),
            payer: Pubkey::new_unique(),
            vault_sol: Pubkey::new_unique(),
            vault_usdc: Pubkey::new_unique(),
            usdc_mint: Pubkey::new_unique(),
            vault_buyback_token: Pubkey::new_unique(),
            buyback_mint: Pubkey::new_unique(),
            protocol_wallet: Pubkey::new_unique(),
            protocol_wallet_usdc: Pubkey::new_unique(),
            merchant_payout_wallet: Pubkey::new_unique(),
            merchant_payout_usdc: Pubkey::new_unique(),
            payer_usdc_account: Pubkey::new_unique(),
            jupiter_router: Pubkey::new_unique(),
        }
    }

    fn args() -> SettleArgs {
        SettleArgs {
            merchant_id: 0x1122_3344_5566_7788,
            amount: 1_000_000,
            asset: PayAsset::Usdc,
            min_out: 995_000,
            payout_bps: 7000,
            buyback_bps: 3000,
            burn_bps: 5000,
        }
    }

    #[test]
    fn argument_block_layout_is_byte_exact() {
        let data = args().encode();
        assert_eq!(data.len(), 39);
        assert_eq!(&data[..8], &SETTLE_DISCRIMINATOR);
        assert_eq!(&data[8..16], &0x1122_3344_5566_7788u64.to_le_bytes());
        assert_eq!(&data[16..24], &1_000_000u64.to_le_bytes());
        assert_eq!(data[24], 1);
        assert_eq!(&data[25..33], &995_000u64.to_le_bytes());
        assert_eq!(&data[33..35], &7000u16.to_le_bytes());
        assert_eq!(&data[35..37], &3000u16.to_le_bytes());
        assert_eq!(&data[37..39], &5000u16.to_le_bytes());
    }

    #[test]
    fn remaining_accounts_follow_the_sixteen_fixed_roles() {
        let accounts = accounts();
        let remaining = [
            AccountRequirement {
                address: Pubkey::new_unique(),
                is_signer: false,
                is_writable: true,
            },
            AccountRequirement {
                address: Pubkey::new_unique(),
                is_signer: false,
                is_writable: false,
            },
        ];
        let program_id = Pubkey::new_unique();
        let instruction = settle_instruction(&program_id, &accounts, &args(), &remaining);

        assert_eq!(instruction.program_id, program_id);
        assert_eq!(instruction.accounts.len(), 18);
        let fixed = accounts.fixed_addresses();
        for (meta, expected) in instruction.accounts.iter().zip(&fixed) {
            assert_eq!(meta.pubkey, *expected);
        }
        assert_eq!(instruction.accounts[16].pubkey, remaining[0].address);
        assert!(instruction.accounts[16].is_writable);
        assert_eq!(instruction.accounts[17].pubkey, remaining[1].address);
        assert!(!instruction.accounts[17].is_writable);
    }

    #[test]
    fn only_the_payer_signs() {
        let accounts = accounts();
        let instruction = settle_instruction(&Pubkey::new_unique(), &accounts, &args(), &[]);
        for meta in &instruction.accounts {
            assert_eq!(meta.is_signer, meta.pubkey == accounts.payer);
        }
    }

    #[test]
    fn compute_budget_directives_match_the_wire_layout() {
        let limit = compute_unit_limit_instruction(600_000);
        assert_eq!(limit.program_id, COMPUTE_BUDGET_PROGRAM_ID);
        assert_eq!(limit.data.len(), 5);
        assert_eq!(limit.data[0], 2);
        assert_eq!(&limit.data[1..5], &600_000u32.to_le_bytes());

        let price = compute_unit_price_instruction(25_000);
        assert_eq!(price.data.len(), 9);
        assert_eq!(price.data[0], 3);
        assert_eq!(&price.data[1..9], &25_000u64.to_le_bytes());
    }

    #[test]
    fn unsigned_transaction_carries_payer_blockhash_and_empty_signatures() {
        let accounts = accounts();
        let instruction = settle_instruction(&Pubkey::new_unique(), &accounts, &args(), &[]);
        let blockhash = Hash::new_from_array([7; 32]);
        let transaction =
            build_unsigned_transaction(&accounts.payer, &[instruction], blockhash).unwrap();

        assert_eq!(transaction.message.recent_blockhash(), &blockhash);
        assert_eq!(transaction.message.static_account_keys()[0], accounts.payer);
        assert_eq!(transaction.signatures, vec![Signature::default()]);

        // The base64 artifact must decode back to the identical transaction.
        let encoded = encode_transaction_base64(&transaction).unwrap();
        let decoded: VersionedTransaction =
            bincode::deserialize(&payrail::encoding::decode(&encoded).unwrap()).unwrap();
        assert_eq!(decoded, transaction);
    }
}
