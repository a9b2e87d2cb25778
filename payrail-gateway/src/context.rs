//! Once-initialized program context shared across requests.
//!
//! The context bundles the two things every compose needs and nothing may
//! mutate: the settlement program's interface (program id, singleton PDAs,
//! account schemas compiled into `payrail-svm`) and the external client
//! handles. It replaces the hidden process-wide cache of earlier designs:
//! constructed once, passed by reference, substitutable in tests.

use payrail::error::ComposeError;
use payrail_jupiter::{JupiterClient, RouteSource};
use payrail_svm::pda;
use payrail_svm::reader::{ChainReader, RpcChainReader};
use solana_pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Immutable per-deployment context: program interface plus client handles.
pub struct ProgramContext {
    /// Settlement program id.
    pub program_id: Pubkey,
    /// USDC mint for the configured cluster.
    pub usdc_mint: Pubkey,
    /// Protocol config singleton PDA.
    pub protocol_config_pda: Pubkey,
    /// Native SOL vault PDA.
    pub vault_sol_pda: Pubkey,
    /// USDC vault PDA.
    pub vault_usdc_pda: Pubkey,
    /// Seconds a composed transaction stays signable.
    pub expiry_window_secs: u64,
    /// Chain-read collaborator.
    pub reader: Arc<dyn ChainReader>,
    /// Route and swap-transaction source.
    pub routes: Arc<dyn RouteSource>,
}

impl std::fmt::Debug for ProgramContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramContext")
            .field("program_id", &self.program_id)
            .field("usdc_mint", &self.usdc_mint)
            .field("expiry_window_secs", &self.expiry_window_secs)
            .finish_non_exhaustive()
    }
}

impl ProgramContext {
    /// Builds a context from explicit parts, deriving the singleton PDAs
    /// once. This is the constructor tests use with fake collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::AddressDerivationExhausted`] if a singleton
    /// PDA cannot be derived for the program id.
    pub fn from_parts(
        program_id: Pubkey,
        usdc_mint: Pubkey,
        expiry_window_secs: u64,
        reader: Arc<dyn ChainReader>,
        routes: Arc<dyn RouteSource>,
    ) -> Result<Self, ComposeError> {
        let (protocol_config_pda, _) = pda::protocol_config(&program_id)?;
        let (vault_sol_pda, _) = pda::vault_sol(&program_id)?;
        let (vault_usdc_pda, _) = pda::vault_usdc(&usdc_mint, &program_id)?;
        Ok(Self {
            program_id,
            usdc_mint,
            protocol_config_pda,
            vault_sol_pda,
            vault_usdc_pda,
            expiry_window_secs,
            reader,
            routes,
        })
    }

    /// Builds the production context from configuration: an RPC reader and
    /// a Jupiter client, each with its own per-call timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError`] on an invalid program id or mint, or
    /// [`ComposeError::NetworkUnavailable`] if the HTTP client cannot be
    /// constructed.
    pub fn connect(config: &crate::config::GatewayConfig) -> Result<Self, ComposeError> {
        let reader = Arc::new(RpcChainReader::new(
            config.rpc_url.clone(),
            Duration::from_secs(config.rpc_timeout_secs),
        ));
        let routes = Arc::new(
            JupiterClient::new(
                config.aggregator_url.clone(),
                Duration::from_secs(config.aggregator_timeout_secs),
            )
            .map_err(|e| ComposeError::NetworkUnavailable(e.to_string()))?
            .with_retry_budget(config.quote_retry_budget),
        );
        Self::from_parts(
            config.program_id()?,
            config.usdc_mint()?,
            config.expiry_window_secs,
            reader,
            routes,
        )
    }
}

/// Single-flight holder for the shared [`ProgramContext`].
///
/// Concurrent first callers race into one initialization; every later
/// caller observes the cached value and never re-triggers the load.
#[derive(Debug, Default)]
pub struct ContextCell {
    cell: OnceCell<Arc<ProgramContext>>,
}

impl ContextCell {
    /// Creates an empty cell.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// Returns the shared context, connecting it on first use.
    ///
    /// # Errors
    ///
    /// Returns the initialization [`ComposeError`]; a failed load leaves
    /// the cell empty so a later call can retry.
    pub async fn get_or_connect(
        &self,
        config: &crate::config::GatewayConfig,
    ) -> Result<Arc<ProgramContext>, ComposeError> {
        self.cell
            .get_or_try_init(|| async { ProgramContext::connect(config).map(Arc::new) })
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn cell_initializes_once_and_shares_the_value() {
        let cell = ContextCell::new();
        let config = GatewayConfig::default();
        let first = cell.get_or_connect(&config).await.unwrap();
        let second = cell.get_or_connect(&config).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.program_id, config.program_id().unwrap());
    }

    #[tokio::test]
    async fn concurrent_first_callers_share_one_initialization() {
        static LOADS: AtomicUsize = AtomicUsize::new(0);
        let cell = Arc::new(ContextCell::new());
        let config = GatewayConfig::default();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let config = config.clone();
                tokio::spawn(async move {
                    let context = cell
                        .cell
                        .get_or_try_init(|| async {
                            LOADS.fetch_add(1, Ordering::SeqCst);
                            ProgramContext::connect(&config).map(Arc::new)
                        })
                        .await
                        .cloned()
                        .unwrap();
                    context.program_id
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(LOADS.load(Ordering::SeqCst), 1);
    }
}
