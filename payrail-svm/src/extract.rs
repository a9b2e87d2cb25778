//! Swap-route account extraction and permission merging.
//!
//! A buyback settlement embeds an aggregator-built swap inside the settle
//! instruction by passing the swap's accounts through as remaining
//! accounts. This module decodes the externally supplied transaction,
//! keeps only accounts referenced by instructions addressed to the trusted
//! router program, and merges duplicates by OR-ing their signer/writable
//! flags so an address never ends up under-permissioned.
//!
//! Order is load-bearing: the merged list preserves first-seen order, and
//! tests downstream assert exact account sequences, not set equality.

use std::collections::{HashMap, HashSet};

use payrail::encoding;
use payrail::error::ComposeError;
use solana_message::VersionedMessage;
use solana_pubkey::Pubkey;
use solana_transaction::versioned::VersionedTransaction;

/// One account an embedded swap needs, with its merged permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountRequirement {
    /// The account address.
    pub address: Pubkey,
    /// Whether any referencing instruction requires a signature.
    pub is_signer: bool,
    /// Whether any referencing instruction writes the account.
    pub is_writable: bool,
}

/// Ordered, deduplicated account collection.
///
/// Keyed by address; iteration order is first-seen insertion order, which
/// fixes the remaining-account layout of the final instruction.
#[derive(Debug, Default)]
pub struct AccountSet {
    entries: Vec<AccountRequirement>,
    index: HashMap<Pubkey, usize>,
}

impl AccountSet {
    /// Inserts a requirement, OR-merging flags on a duplicate address.
    pub fn merge(&mut self, requirement: AccountRequirement) {
        if let Some(&at) = self.index.get(&requirement.address) {
            let existing = &mut self.entries[at];
            existing.is_signer |= requirement.is_signer;
            existing.is_writable |= requirement.is_writable;
        } else {
            self.index.insert(requirement.address, self.entries.len());
            self.entries.push(requirement);
        }
    }

    /// Consumes the set, yielding requirements in first-seen order.
    #[must_use]
    pub fn into_requirements(self) -> Vec<AccountRequirement> {
        self.entries
    }

    /// Number of distinct addresses collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no addresses were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decodes a base64 swap transaction into a versioned transaction.
///
/// # Errors
///
/// Returns [`ComposeError::MalformedSwapTransaction`] on bad base64 or an
/// undecodable wire format. Decode failures are never downgraded to an
/// empty account list.
pub fn decode_swap_transaction(swap_tx_base64: &str) -> Result<VersionedTransaction, ComposeError> {
    let bytes = encoding::decode(swap_tx_base64)
        .map_err(|e| ComposeError::MalformedSwapTransaction(format!("base64: {e}")))?;
    bincode::deserialize::<VersionedTransaction>(&bytes)
        .map_err(|e| ComposeError::MalformedSwapTransaction(format!("wire format: {e}")))
}

/// Extracts the merged account list from one swap transaction.
///
/// Only instructions whose program id equals `router_program_id`
/// contribute accounts; wrap/unwrap helpers and any other program inside
/// the supplied transaction are ignored.
///
/// # Errors
///
/// Returns [`ComposeError::MalformedSwapTransaction`] if the transaction
/// cannot be decoded or indexes accounts this crate cannot resolve.
pub fn extract(
    swap_tx_base64: &str,
    router_program_id: &Pubkey,
) -> Result<Vec<AccountRequirement>, ComposeError> {
    let mut set = AccountSet::default();
    collect_router_accounts(&mut set, swap_tx_base64, router_program_id)?;
    Ok(set.into_requirements())
}

/// Extracts and merges accounts across several swap transactions.
///
/// Used for multi-hop routes where each hop arrives as its own
/// transaction; the merge rule is identical across all of them combined.
///
/// # Errors
///
/// Returns [`ComposeError::MalformedSwapTransaction`] if any transaction
/// fails to decode.
pub fn extract_multi_hop(
    swap_txs_base64: &[String],
    router_program_id: &Pubkey,
) -> Result<Vec<AccountRequirement>, ComposeError> {
    let mut set = AccountSet::default();
    for swap_tx in swap_txs_base64 {
        collect_router_accounts(&mut set, swap_tx, router_program_id)?;
    }
    Ok(set.into_requirements())
}

/// Drops candidates whose address already holds a fixed role in the settle
/// instruction; re-listing one as a remaining account would duplicate the
/// account reference inside a single instruction.
///
/// Idempotent: filtering an already-filtered list is a no-op.
#[must_use]
pub fn filter_against_fixed(
    candidates: Vec<AccountRequirement>,
    fixed_addresses: &[Pubkey],
) -> Vec<AccountRequirement> {
    let fixed: HashSet<&Pubkey> = fixed_addresses.iter().collect();
    candidates
        .into_iter()
        .filter(|candidate| !fixed.contains(&candidate.address))
        .collect()
}

fn collect_router_accounts(
    set: &mut AccountSet,
    swap_tx_base64: &str,
    router_program_id: &Pubkey,
) -> Result<(), ComposeError> {
    let transaction = decode_swap_transaction(swap_tx_base64)?;
    let message = &transaction.message;
    let keys = message.static_account_keys();
    let before = set.len();

    for instruction in message.instructions() {
        let program_id = keys
            .get(instruction.program_id_index as usize)
            .ok_or_else(|| {
                ComposeError::MalformedSwapTransaction(
                    "program id index beyond static account keys".to_owned(),
                )
            })?;
        if program_id != router_program_id {
            continue;
        }
        for &account_index in &instruction.accounts {
            let index = account_index as usize;
            // Accounts resolved through v0 address lookup tables are not
            // present in the static key list; such routes cannot be merged.
            let address = *keys.get(index).ok_or_else(|| {
                ComposeError::MalformedSwapTransaction(
                    "account index beyond static keys (lookup tables unsupported)".to_owned(),
                )
            })?;
            set.merge(AccountRequirement {
                address,
                is_signer: is_signer(message, index),
                is_writable: is_writable(message, keys.len(), index),
            });
        }
    }

    tracing::debug!(
        collected = set.len() - before,
        total = set.len(),
        "collected router swap accounts"
    );
    Ok(())
}

fn is_signer(message: &VersionedMessage, index: usize) -> bool {
    index < message.header().num_required_signatures as usize
}

fn is_writable(message: &VersionedMessage, total_keys: usize, index: usize) -> bool {
    let header = message.header();
    let required = header.num_required_signatures as usize;
    if index < required {
        index < required - header.num_readonly_signed_accounts as usize
    } else {
        index < total_keys - header.num_readonly_unsigned_accounts as usize
    }
}
