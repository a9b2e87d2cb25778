//! Chain-read collaborator boundary.
//!
//! The composer reads two accounts and one blockhash per request; both go
//! through this trait so tests can substitute a fake and so every external
//! call carries its own short timeout. Nothing is ever written or
//! submitted through this boundary.

use async_trait::async_trait;
use payrail::error::ComposeError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_commitment_config::CommitmentConfig;
use solana_hash::Hash;
use solana_pubkey::Pubkey;
use std::time::Duration;

/// Read-only chain access used by the composer.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Fetches raw account data, or `None` if the account does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::NetworkUnavailable`] on transport failure or
    /// timeout.
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, ComposeError>;

    /// Fetches a finalized recent blockhash for transaction stamping.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::NetworkUnavailable`] on transport failure or
    /// timeout. Safe to retry.
    async fn latest_blockhash(&self) -> Result<Hash, ComposeError>;
}

/// [`ChainReader`] over a Solana JSON-RPC endpoint.
///
/// Account reads use confirmed commitment; blockhashes use finalized
/// commitment so the stamped hash cannot be rolled back underneath a
/// signed transaction.
pub struct RpcChainReader {
    client: RpcClient,
}

impl std::fmt::Debug for RpcChainReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainReader").finish_non_exhaustive()
    }
}

impl RpcChainReader {
    /// Creates a reader with a per-request timeout.
    #[must_use]
    pub fn new(url: String, timeout: Duration) -> Self {
        Self {
            client: RpcClient::new_with_timeout(url, timeout),
        }
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, ComposeError> {
        let response = self
            .client
            .get_account_with_commitment(address, CommitmentConfig::confirmed())
            .await
            .map_err(|e| ComposeError::NetworkUnavailable(e.to_string()))?;
        Ok(response.value.map(|account| account.data))
    }

    async fn latest_blockhash(&self) -> Result<Hash, ComposeError> {
        let (blockhash, _last_valid_height) = self
            .client
            .get_latest_blockhash_with_commitment(CommitmentConfig::finalized())
            .await
            .map_err(|e| ComposeError::NetworkUnavailable(e.to_string()))?;
        Ok(blockhash)
    }
}
