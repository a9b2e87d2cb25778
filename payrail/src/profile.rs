//! Off-chain merchant configuration and its persistence contract.
//!
//! The profile is mutable business configuration created at registration
//! and owned by an external persistence collaborator; this crate defines
//! only the value type and the store contract the composer reads through.
//! On-chain fields (payout wallet, buyback mint, frozen flag) must still be
//! re-validated against the merchant registry at compose time — the profile
//! is a convenience copy, never the authority.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::asset::PayAsset;

/// A merchant's business configuration.
///
/// Addresses are base58 strings; they are parsed and validated at the chain
/// boundary so a corrupt store entry surfaces as a malformed-address error
/// rather than a decode panic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantProfile {
    /// Stable numeric identifier; also the registry PDA seed.
    pub merchant_id: u64,
    /// Wallet allowed to update this profile.
    pub owner: String,
    /// Destination for the payout portion of each settlement.
    pub payout_wallet: String,
    /// Mint of the token bought back on each settlement.
    pub buyback_mint: String,
    /// Token account that receives bought-back tokens.
    pub buyback_vault: String,
    /// Default payout share in basis points.
    pub payout_bps: u16,
    /// Default buyback share in basis points.
    pub buyback_bps: u16,
    /// Default burn fraction of the buyback, in basis points.
    pub burn_bps: u16,
    /// Slippage tolerance for buyback quotes, in basis points.
    pub slippage_bps: u16,
    /// Whether native SOL payments are accepted.
    pub allow_sol: bool,
    /// Whether USDC payments are accepted.
    pub allow_usdc: bool,
    /// Optional settlement-notification endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

impl MerchantProfile {
    /// Whether the merchant accepts payment in `asset`.
    #[must_use]
    pub const fn accepts(&self, asset: PayAsset) -> bool {
        match asset {
            PayAsset::Sol => self.allow_sol,
            PayAsset::Usdc => self.allow_usdc,
        }
    }
}

/// Errors from the profile persistence collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ProfileStoreError {
    /// A profile already exists for the merchant id.
    #[error("Profile for merchant {0} already exists")]
    AlreadyExists(u64),
    /// No profile exists for the merchant id.
    #[error("Profile for merchant {0} not found")]
    NotFound(u64),
    /// The backing store failed.
    #[error("Profile store unavailable: {0}")]
    Unavailable(String),
}

/// Read/write contract the composer and registration flows depend on.
///
/// Implementations are owned by the persistence collaborator; the in-memory
/// [`MemoryProfileStore`] ships for tests and local development.
#[async_trait]
pub trait MerchantProfileStore: Send + Sync {
    /// Looks up a profile by merchant id.
    async fn by_merchant_id(&self, merchant_id: u64)
    -> Result<Option<MerchantProfile>, ProfileStoreError>;

    /// Looks up a profile by owner wallet.
    async fn by_owner(&self, owner: &str) -> Result<Option<MerchantProfile>, ProfileStoreError>;

    /// Creates a profile at registration time.
    async fn create(&self, profile: MerchantProfile) -> Result<(), ProfileStoreError>;

    /// Replaces an existing profile.
    async fn update(&self, profile: MerchantProfile) -> Result<(), ProfileStoreError>;
}

/// In-memory profile store keyed by merchant id.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<u64, MerchantProfile>>,
}

impl MemoryProfileStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MerchantProfileStore for MemoryProfileStore {
    async fn by_merchant_id(
        &self,
        merchant_id: u64,
    ) -> Result<Option<MerchantProfile>, ProfileStoreError> {
        Ok(self.profiles.read().await.get(&merchant_id).cloned())
    }

    async fn by_owner(&self, owner: &str) -> Result<Option<MerchantProfile>, ProfileStoreError> {
        Ok(self
            .profiles
            .read()
            .await
            .values()
            .find(|p| p.owner == owner)
            .cloned())
    }

    async fn create(&self, profile: MerchantProfile) -> Result<(), ProfileStoreError> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.merchant_id) {
            return Err(ProfileStoreError::AlreadyExists(profile.merchant_id));
        }
        profiles.insert(profile.merchant_id, profile);
        Ok(())
    }

    async fn update(&self, profile: MerchantProfile) -> Result<(), ProfileStoreError> {
        let mut profiles = self.profiles.write().await;
        if !profiles.contains_key(&profile.merchant_id) {
            return Err(ProfileStoreError::NotFound(profile.merchant_id));
        }
        profiles.insert(profile.merchant_id, profile);
        Ok(())
    }
}
