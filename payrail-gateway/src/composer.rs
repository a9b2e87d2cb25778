//! The settlement composer.
//!
//! Turns a validated payment request into an unsigned settle transaction
//! through a fixed pipeline of hard preconditions: state fetch, freeze and
//! pause gates, asset and basis-point validation, account resolution, fee
//! split, buyback quoting, swap-account merging, and final assembly with a
//! finalized blockhash and an expiry instant.
//!
//! Every step is request-scoped; the only shared state is the injected
//! [`ProgramContext`]. Nothing here signs or submits.

use std::sync::Arc;

use payrail::asset::PayAsset;
use payrail::bps;
use payrail::error::ComposeError;
use payrail::profile::{MerchantProfile, MerchantProfileStore};
use payrail::timestamp::UnixTimestamp;
use payrail_jupiter::{NotTradable, PLACEHOLDER_PAYER, Quote, SwapBuildOptions};
use payrail_svm::extract;
use payrail_svm::instruction::{
    self, SettleAccounts, SettleArgs, compute_unit_limit_instruction,
    compute_unit_price_instruction, settle_instruction,
};
use payrail_svm::pda;
use payrail_svm::state::{MerchantRegistry, ProtocolConfig};
use solana_instruction::Instruction;
use solana_pubkey::Pubkey;

use crate::context::ProgramContext;
use crate::types::{
    ComposeRequest, ComposedTransaction, PreviewRequest, SettlementPlan, SettlementPreview,
};

/// Composes unsigned settle transactions and quote-time previews.
pub struct SettlementComposer {
    context: Arc<ProgramContext>,
    profiles: Arc<dyn MerchantProfileStore>,
}

impl std::fmt::Debug for SettlementComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementComposer")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

struct MerchantState {
    registry_pda: Pubkey,
    registry: MerchantRegistry,
    config: ProtocolConfig,
}

impl SettlementComposer {
    /// Creates a composer over the shared context and profile store.
    #[must_use]
    pub fn new(context: Arc<ProgramContext>, profiles: Arc<dyn MerchantProfileStore>) -> Self {
        Self { context, profiles }
    }

    /// Composes an unsigned settle transaction for a payment request.
    ///
    /// # Errors
    ///
    /// Returns the specific [`ComposeError`] of the first failed
    /// precondition; only [`ComposeError::NetworkUnavailable`] and
    /// [`ComposeError::NotTradable`] are retryable.
    pub async fn compose(
        &self,
        request: &ComposeRequest,
    ) -> Result<ComposedTransaction, ComposeError> {
        // Explicit request overrides are rejected before any network
        // traffic; profile-sourced values are re-validated after the fetch.
        validate_overrides(request.payout_bps, request.buyback_bps, request.burn_bps)?;
        let payer = pda::parse_address(&request.payer)?;

        let profile = self.load_profile(request.merchant_id).await?;
        let state = self.fetch_state(request.merchant_id).await?;
        ensure_active(&state)?;
        if !profile.accepts(request.asset) {
            return Err(ComposeError::AssetNotAccepted(request.asset.to_string()));
        }

        let (payout_bps, buyback_bps, burn_bps) = effective_bps(
            &profile,
            request.payout_bps,
            request.buyback_bps,
            request.burn_bps,
        );
        bps::ensure_split_bps(payout_bps, buyback_bps)?;
        bps::ensure_fraction_bps("burn", burn_bps)?;
        bps::ensure_fraction_bps("slippage", profile.slippage_bps)?;

        let accounts = self.resolve_accounts(&profile, &state, payer, request.asset)?;
        let split = bps::split(
            request.amount,
            payout_bps,
            buyback_bps,
            state.config.protocol_fee_bps,
        )?;

        let (min_out, remaining) = if split.buyback == 0 {
            (0, Vec::new())
        } else {
            let (final_hop, estimated_out) = self
                .quote_buyback(
                    request.asset,
                    &state.registry.buyback_mint,
                    split.buyback,
                    profile.slippage_bps,
                )
                .await?;
            let min_out = bps::apply_slippage(estimated_out, profile.slippage_bps)?;

            let candidates = if request.swap_transactions.is_empty() {
                let route = self
                    .context
                    .routes
                    .build_swap_transaction(
                        &final_hop,
                        &payer.to_string(),
                        SwapBuildOptions::default(),
                    )
                    .await
                    .map_err(route_unavailable)?;
                extract::extract(&route.swap_transaction, &state.config.jupiter_router)?
            } else {
                extract::extract_multi_hop(
                    &request.swap_transactions,
                    &state.config.jupiter_router,
                )?
            };
            let remaining =
                extract::filter_against_fixed(candidates, &accounts.fixed_addresses());
            (min_out, remaining)
        };

        let plan = SettlementPlan {
            accounts,
            args: SettleArgs {
                merchant_id: request.merchant_id,
                amount: request.amount,
                asset: request.asset,
                min_out,
                payout_bps,
                buyback_bps,
                burn_bps,
            },
            remaining,
            compute_unit_limit: request.compute_unit_limit,
            priority_fee_micro_lamports: request.priority_fee_micro_lamports,
        };
        tracing::debug!(
            merchant_id = request.merchant_id,
            amount = request.amount,
            payout = split.payout,
            buyback = split.buyback,
            protocol_fee = split.protocol_fee,
            min_out,
            remaining = plan.remaining.len(),
            "planned settlement"
        );
        self.assemble(payer, plan).await
    }

    /// Produces a quote-time preview: the exact split, the estimated
    /// buyback output, and optionally a placeholder-payer swap
    /// transaction. The zero-buyback case short-circuits without any
    /// aggregator traffic.
    ///
    /// # Errors
    ///
    /// Returns the specific [`ComposeError`] of the first failed
    /// precondition.
    pub async fn preview(
        &self,
        request: &PreviewRequest,
    ) -> Result<SettlementPreview, ComposeError> {
        validate_overrides(request.payout_bps, request.buyback_bps, request.burn_bps)?;

        let profile = self.load_profile(request.merchant_id).await?;
        let state = self.fetch_state(request.merchant_id).await?;
        ensure_active(&state)?;
        if !profile.accepts(request.asset) {
            return Err(ComposeError::AssetNotAccepted(request.asset.to_string()));
        }

        let (payout_bps, buyback_bps, burn_bps) = effective_bps(
            &profile,
            request.payout_bps,
            request.buyback_bps,
            request.burn_bps,
        );
        bps::ensure_split_bps(payout_bps, buyback_bps)?;
        bps::ensure_fraction_bps("burn", burn_bps)?;
        bps::ensure_fraction_bps("slippage", profile.slippage_bps)?;

        let split = bps::split(
            request.amount,
            payout_bps,
            buyback_bps,
            state.config.protocol_fee_bps,
        )?;
        let expires_at = UnixTimestamp::expiry(self.context.expiry_window_secs);

        let mut preview = SettlementPreview {
            merchant_id: request.merchant_id,
            amount: request.amount,
            asset: request.asset,
            payout_bps,
            buyback_bps,
            burn_bps,
            slippage_bps: profile.slippage_bps,
            payout: split.payout,
            buyback_amount: split.buyback,
            protocol_fee: split.protocol_fee,
            estimated_out: 0,
            min_out: 0,
            estimated_burn: 0,
            swap_transaction: None,
            placeholder_payer: false,
            expires_at,
        };
        if split.buyback == 0 {
            return Ok(preview);
        }

        let (final_hop, estimated_out) = self
            .quote_buyback(
                request.asset,
                &state.registry.buyback_mint,
                split.buyback,
                profile.slippage_bps,
            )
            .await?;
        preview.estimated_out = estimated_out;
        preview.min_out = bps::apply_slippage(estimated_out, profile.slippage_bps)?;
        preview.estimated_burn = bps::burn_portion(estimated_out, burn_bps)?;

        // A failed build degrades the preview to quote-only; compose will
        // rebuild the swap against the true payer regardless.
        match self
            .context
            .routes
            .build_swap_transaction(&final_hop, PLACEHOLDER_PAYER, SwapBuildOptions::default())
            .await
        {
            Ok(route) => {
                preview.placeholder_payer = route.placeholder_payer;
                preview.swap_transaction = Some(route.swap_transaction);
            }
            Err(failure) => {
                tracing::debug!(reason = %failure.reason, "preview swap build unavailable");
            }
        }
        Ok(preview)
    }

    async fn load_profile(&self, merchant_id: u64) -> Result<MerchantProfile, ComposeError> {
        self.profiles
            .by_merchant_id(merchant_id)
            .await
            .map_err(|e| ComposeError::NetworkUnavailable(e.to_string()))?
            .ok_or_else(|| ComposeError::MerchantNotFound(merchant_id.to_string()))
    }

    async fn fetch_state(&self, merchant_id: u64) -> Result<MerchantState, ComposeError> {
        let (registry_pda, _) =
            pda::merchant_registry(merchant_id, &self.context.program_id)?;
        let registry_data = self
            .context
            .reader
            .fetch_account(&registry_pda)
            .await?
            .ok_or_else(|| ComposeError::MerchantNotFound(merchant_id.to_string()))?;
        let registry = MerchantRegistry::decode(&registry_data).map_err(|e| {
            tracing::warn!(merchant_id, error = %e, "undecodable merchant registry account");
            ComposeError::MerchantNotFound(merchant_id.to_string())
        })?;
        if registry.merchant_id != merchant_id {
            tracing::warn!(
                merchant_id,
                on_chain = registry.merchant_id,
                "merchant registry id mismatch"
            );
            return Err(ComposeError::MerchantNotFound(merchant_id.to_string()));
        }

        let config_data = self
            .context
            .reader
            .fetch_account(&self.context.protocol_config_pda)
            .await?
            .ok_or(ComposeError::ProtocolNotInitialized)?;
        let config = ProtocolConfig::decode(&config_data).map_err(|e| {
            tracing::warn!(error = %e, "undecodable protocol config account");
            ComposeError::ProtocolNotInitialized
        })?;

        Ok(MerchantState {
            registry_pda,
            registry,
            config,
        })
    }

    fn resolve_accounts(
        &self,
        profile: &MerchantProfile,
        state: &MerchantState,
        payer: Pubkey,
        asset: PayAsset,
    ) -> Result<SettleAccounts, ComposeError> {
        // The registry is authoritative for the payout wallet and buyback
        // mint; a drifted profile copy is logged and ignored.
        if pda::parse_address(&profile.payout_wallet).ok() != Some(state.registry.payout_wallet) {
            tracing::warn!(
                merchant_id = profile.merchant_id,
                "profile payout wallet drifted from the on-chain registry"
            );
        }
        let usdc_mint = self.context.usdc_mint;
        let vault_buyback_token = pda::parse_address(&profile.buyback_vault)?;
        Ok(SettleAccounts {
            protocol_config: self.context.protocol_config_pda,
            merchant_registry: state.registry_pda,
            payer,
            vault_sol: self.context.vault_sol_pda,
            vault_usdc: self.context.vault_usdc_pda,
            usdc_mint,
            vault_buyback_token,
            buyback_mint: state.registry.buyback_mint,
            protocol_wallet: state.config.protocol_wallet,
            protocol_wallet_usdc: pda::associated_token_account(
                &state.config.protocol_wallet,
                &usdc_mint,
            )?,
            merchant_payout_wallet: state.registry.payout_wallet,
            merchant_payout_usdc: pda::associated_token_account(
                &state.registry.payout_wallet,
                &usdc_mint,
            )?,
            payer_usdc_account: match asset {
                PayAsset::Usdc => pda::associated_token_account(&payer, &usdc_mint)?,
                PayAsset::Sol => payer,
            },
            jupiter_router: state.config.jupiter_router,
        })
    }

    /// Quotes the buyback conversion and returns the final-hop quote plus
    /// the estimated total output. SOL payments convert directly; USDC
    /// payments chain through SOL because vault liquidity is SOL-side.
    async fn quote_buyback(
        &self,
        asset: PayAsset,
        buyback_mint: &Pubkey,
        buyback_amount: u64,
        slippage_bps: u16,
    ) -> Result<(Quote, u64), ComposeError> {
        let buyback_mint = buyback_mint.to_string();
        let sol_mint = pda::SOL_MINT.to_string();
        match asset {
            PayAsset::Sol => {
                let quote = self
                    .context
                    .routes
                    .quote(&sol_mint, &buyback_mint, buyback_amount, slippage_bps)
                    .await
                    .map_err(route_unavailable)?;
                let estimated = quote.out_amount_base_units().map_err(route_unavailable)?;
                Ok((quote, estimated))
            }
            PayAsset::Usdc => {
                let usdc_mint = self.context.usdc_mint.to_string();
                let chained = self
                    .context
                    .routes
                    .multi_hop_quote(
                        &usdc_mint,
                        &sol_mint,
                        &buyback_mint,
                        buyback_amount,
                        slippage_bps,
                    )
                    .await
                    .map_err(route_unavailable)?;
                let estimated = chained.total_out_base_units().map_err(route_unavailable)?;
                Ok((chained.second, estimated))
            }
        }
    }

    async fn assemble(
        &self,
        payer: Pubkey,
        plan: SettlementPlan,
    ) -> Result<ComposedTransaction, ComposeError> {
        let mut instructions: Vec<Instruction> = Vec::with_capacity(3);
        if let Some(units) = plan.compute_unit_limit {
            instructions.push(compute_unit_limit_instruction(units));
        }
        if let Some(micro_lamports) = plan.priority_fee_micro_lamports {
            instructions.push(compute_unit_price_instruction(micro_lamports));
        }
        instructions.push(settle_instruction(
            &self.context.program_id,
            &plan.accounts,
            &plan.args,
            &plan.remaining,
        ));

        let recent_blockhash = self.context.reader.latest_blockhash().await?;
        let transaction =
            instruction::build_unsigned_transaction(&payer, &instructions, recent_blockhash)
                .map_err(|e| {
                    tracing::warn!(error = %e, "settle transaction failed to compile");
                    ComposeError::MalformedSwapTransaction(e.to_string())
                })?;
        let encoded = instruction::encode_transaction_base64(&transaction)
            .map_err(|e| ComposeError::MalformedSwapTransaction(e.to_string()))?;

        Ok(ComposedTransaction {
            transaction: encoded,
            expires_at: UnixTimestamp::expiry(self.context.expiry_window_secs),
        })
    }
}

fn validate_overrides(
    payout_bps: Option<u16>,
    buyback_bps: Option<u16>,
    burn_bps: Option<u16>,
) -> Result<(), ComposeError> {
    if let (Some(payout), Some(buyback)) = (payout_bps, buyback_bps) {
        bps::ensure_split_bps(payout, buyback)?;
    }
    if let Some(burn) = burn_bps {
        bps::ensure_fraction_bps("burn", burn)?;
    }
    Ok(())
}

fn ensure_active(state: &MerchantState) -> Result<(), ComposeError> {
    if state.registry.frozen {
        return Err(ComposeError::MerchantFrozen);
    }
    if state.config.paused {
        return Err(ComposeError::ProtocolPaused);
    }
    Ok(())
}

fn effective_bps(
    profile: &MerchantProfile,
    payout_bps: Option<u16>,
    buyback_bps: Option<u16>,
    burn_bps: Option<u16>,
) -> (u16, u16, u16) {
    (
        payout_bps.unwrap_or(profile.payout_bps),
        buyback_bps.unwrap_or(profile.buyback_bps),
        burn_bps.unwrap_or(profile.burn_bps),
    )
}

fn route_unavailable(failure: NotTradable) -> ComposeError {
    ComposeError::NotTradable(failure.reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use payrail::encoding;
    use payrail::profile::MemoryProfileStore;
    use payrail_jupiter::{MultiHopQuote, RouteSource, SwapRoute};
    use payrail_svm::reader::ChainReader;
    use solana_hash::Hash;
    use solana_message::compiled_instruction::CompiledInstruction;
    use solana_message::legacy::Message;
    use solana_message::{MessageHeader, VersionedMessage};
    use solana_transaction::versioned::VersionedTransaction;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MERCHANT_ID: u64 = 7;
    const AMOUNT: u64 = 1_000_000;

    struct FakeReader {
        accounts: HashMap<Pubkey, Vec<u8>>,
        fetch_calls: AtomicUsize,
    }

    #[async_trait]
    impl ChainReader for FakeReader {
        async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, ComposeError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.accounts.get(address).cloned())
        }

        async fn latest_blockhash(&self) -> Result<Hash, ComposeError> {
            Ok(Hash::new_from_array([9; 32]))
        }
    }

    struct FakeRoutes {
        swap_transaction: String,
        quote_calls: AtomicUsize,
        build_calls: AtomicUsize,
    }

    impl FakeRoutes {
        fn quote_for(input_mint: &str, output_mint: &str, amount: u64) -> Quote {
            Quote {
                input_mint: input_mint.to_owned(),
                output_mint: output_mint.to_owned(),
                in_amount: amount.to_string(),
                out_amount: (amount * 2).to_string(),
                route_plan: None,
                context_slot: Some(1),
            }
        }
    }

    #[async_trait]
    impl RouteSource for FakeRoutes {
        async fn quote(
            &self,
            input_mint: &str,
            output_mint: &str,
            amount: u64,
            _slippage_bps: u16,
        ) -> Result<Quote, NotTradable> {
            self.quote_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Self::quote_for(input_mint, output_mint, amount))
        }

        async fn multi_hop_quote(
            &self,
            input_mint: &str,
            via_mint: &str,
            output_mint: &str,
            amount: u64,
            _slippage_bps: u16,
        ) -> Result<MultiHopQuote, NotTradable> {
            self.quote_calls.fetch_add(2, Ordering::SeqCst);
            let first = Self::quote_for(input_mint, via_mint, amount);
            let second = Self::quote_for(via_mint, output_mint, amount * 2);
            Ok(MultiHopQuote { first, second })
        }

        async fn build_swap_transaction(
            &self,
            quote: &Quote,
            payer: &str,
            _options: SwapBuildOptions,
        ) -> Result<SwapRoute, NotTradable> {
            self.build_calls.fetch_add(1, Ordering::SeqCst);
            Ok(SwapRoute {
                quote: quote.clone(),
                swap_transaction: self.swap_transaction.clone(),
                last_valid_block_height: 100,
                placeholder_payer: payer == PLACEHOLDER_PAYER,
            })
        }
    }

    struct Harness {
        composer: SettlementComposer,
        reader: Arc<FakeReader>,
        routes: Arc<FakeRoutes>,
        router: Pubkey,
        program_id: Pubkey,
        vault_sol: Pubkey,
        pool: Pubkey,
    }

    /// A swap transaction with one router instruction over [pool,
    /// vault_sol] and one unrelated helper instruction.
    fn swap_transaction(router: Pubkey, pool: Pubkey, vault_sol: Pubkey) -> String {
        let helper_program = Pubkey::new_unique();
        let message = Message {
            header: MessageHeader {
                num_required_signatures: 0,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 3,
            },
            account_keys: vec![pool, vault_sol, router, helper_program],
            recent_blockhash: Hash::default(),
            instructions: vec![
                CompiledInstruction {
                    program_id_index: 2,
                    accounts: vec![0, 1],
                    data: vec![9],
                },
                CompiledInstruction {
                    program_id_index: 3,
                    accounts: vec![0],
                    data: vec![1],
                },
            ],
        };
        let transaction = VersionedTransaction {
            signatures: Vec::new(),
            message: VersionedMessage::Legacy(message),
        };
        encoding::encode(bincode::serialize(&transaction).unwrap())
    }

    async fn harness(frozen: bool, paused: bool) -> Harness {
        let program_id = Pubkey::new_unique();
        let router = Pubkey::new_unique();
        let usdc_mint = pda::USDC_MINT_DEVNET;

        let (registry_pda, _) = pda::merchant_registry(MERCHANT_ID, &program_id).unwrap();
        let (config_pda, _) = pda::protocol_config(&program_id).unwrap();
        let (vault_sol, _) = pda::vault_sol(&program_id).unwrap();

        let payout_wallet = Pubkey::new_unique();
        let buyback_mint = Pubkey::new_unique();
        let registry = MerchantRegistry {
            merchant_id: MERCHANT_ID,
            owner: Pubkey::new_unique(),
            payout_wallet,
            buyback_mint,
            frozen,
            bump: 254,
        };
        let config = ProtocolConfig {
            authority: Pubkey::new_unique(),
            protocol_fee_bps: 100,
            protocol_wallet: Pubkey::new_unique(),
            jupiter_router: router,
            paused,
            bump: 253,
        };

        let mut accounts = HashMap::new();
        accounts.insert(registry_pda, registry.encode());
        accounts.insert(config_pda, config.encode());
        let reader = Arc::new(FakeReader {
            accounts,
            fetch_calls: AtomicUsize::new(0),
        });

        let pool = Pubkey::new_unique();
        let routes = Arc::new(FakeRoutes {
            swap_transaction: swap_transaction(router, pool, vault_sol),
            quote_calls: AtomicUsize::new(0),
            build_calls: AtomicUsize::new(0),
        });

        let context = Arc::new(
            ProgramContext::from_parts(
                program_id,
                usdc_mint,
                30,
                Arc::clone(&reader) as Arc<dyn ChainReader>,
                Arc::clone(&routes) as Arc<dyn RouteSource>,
            )
            .unwrap(),
        );

        let profiles = Arc::new(MemoryProfileStore::new());
        profiles
            .create(MerchantProfile {
                merchant_id: MERCHANT_ID,
                owner: registry.owner.to_string(),
                payout_wallet: payout_wallet.to_string(),
                buyback_mint: buyback_mint.to_string(),
                buyback_vault: Pubkey::new_unique().to_string(),
                payout_bps: 7000,
                buyback_bps: 3000,
                burn_bps: 5000,
                slippage_bps: 100,
                allow_sol: true,
                allow_usdc: true,
                webhook_url: None,
            })
            .await
            .unwrap();

        let composer = SettlementComposer::new(context, profiles);
        Harness {
            composer,
            reader,
            routes,
            router,
            program_id,
            vault_sol,
            pool,
        }
    }

    fn sol_request() -> ComposeRequest {
        ComposeRequest {
            merchant_id: MERCHANT_ID,
            payer: Pubkey::new_unique().to_string(),
            amount: AMOUNT,
            asset: PayAsset::Sol,
            payout_bps: None,
            buyback_bps: None,
            burn_bps: None,
            swap_transactions: Vec::new(),
            compute_unit_limit: None,
            priority_fee_micro_lamports: None,
        }
    }

    fn decode_composed(composed: &ComposedTransaction) -> VersionedTransaction {
        bincode::deserialize(&encoding::decode(&composed.transaction).unwrap()).unwrap()
    }

    /// Returns (program id, resolved account keys, data) per instruction.
    fn decoded_instructions(
        transaction: &VersionedTransaction,
    ) -> Vec<(Pubkey, Vec<Pubkey>, Vec<u8>)> {
        let keys = transaction.message.static_account_keys();
        transaction
            .message
            .instructions()
            .iter()
            .map(|ix| {
                (
                    keys[ix.program_id_index as usize],
                    ix.accounts.iter().map(|&i| keys[i as usize]).collect(),
                    ix.data.clone(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn end_to_end_split_route_and_expiry() {
        let harness = harness(false, false).await;
        let before = UnixTimestamp::now();
        let composed = harness.composer.compose(&sol_request()).await.unwrap();

        assert!(composed.expires_at.as_secs() >= before.as_secs() + 30);
        assert!(composed.expires_at.as_secs() <= UnixTimestamp::now().as_secs() + 30);

        let transaction = decode_composed(&composed);
        let instructions = decoded_instructions(&transaction);
        assert_eq!(instructions.len(), 1);
        let (program, accounts, data) = &instructions[0];
        assert_eq!(*program, harness.program_id);

        // buyback = 300_000; estimated out = 600_000; min_out at 1% slippage.
        assert_eq!(&data[16..24], &AMOUNT.to_le_bytes());
        assert_eq!(&data[25..33], &594_000u64.to_le_bytes());
        assert_eq!(&data[33..35], &7000u16.to_le_bytes());
        assert_eq!(&data[35..37], &3000u16.to_le_bytes());
        assert_eq!(&data[37..39], &5000u16.to_le_bytes());

        // Sixteen fixed roles plus the pool from the swap route; the
        // vault_sol duplicate was filtered, so it appears exactly once.
        assert_eq!(accounts.len(), 17);
        assert_eq!(accounts[16], harness.pool);
        assert_eq!(
            accounts.iter().filter(|a| **a == harness.vault_sol).count(),
            1
        );

        assert_eq!(harness.routes.quote_calls.load(Ordering::SeqCst), 1);
        assert_eq!(harness.routes.build_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn usdc_payment_quotes_through_the_multi_hop_path() {
        let harness = harness(false, false).await;
        let mut request = sol_request();
        request.asset = PayAsset::Usdc;
        harness.composer.compose(&request).await.unwrap();
        assert_eq!(harness.routes.quote_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn frozen_merchant_fails_without_any_quote() {
        let harness = harness(true, false).await;
        let err = harness.composer.compose(&sol_request()).await.unwrap_err();
        assert!(matches!(err, ComposeError::MerchantFrozen));
        assert_eq!(harness.routes.quote_calls.load(Ordering::SeqCst), 0);
        assert_eq!(harness.routes.build_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn paused_protocol_rejects_compose() {
        let harness = harness(false, true).await;
        let err = harness.composer.compose(&sol_request()).await.unwrap_err();
        assert!(matches!(err, ComposeError::ProtocolPaused));
    }

    #[tokio::test]
    async fn invalid_bps_fail_before_any_network_call() {
        let harness = harness(false, false).await;
        let mut request = sol_request();
        request.payout_bps = Some(7000);
        request.buyback_bps = Some(3001);
        let err = harness.composer.compose(&request).await.unwrap_err();
        assert!(matches!(err, ComposeError::InvalidBasisPoints(_)));
        assert_eq!(harness.reader.fetch_calls.load(Ordering::SeqCst), 0);
        assert_eq!(harness.routes.quote_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_buyback_skips_quoting_and_pins_min_out_to_zero() {
        let harness = harness(false, false).await;
        let mut request = sol_request();
        request.payout_bps = Some(9000);
        request.buyback_bps = Some(0);
        let composed = harness.composer.compose(&request).await.unwrap();

        let transaction = decode_composed(&composed);
        let instructions = decoded_instructions(&transaction);
        let (_, accounts, data) = &instructions[0];
        assert_eq!(&data[25..33], &0u64.to_le_bytes());
        assert_eq!(accounts.len(), 16);
        assert_eq!(harness.routes.quote_calls.load(Ordering::SeqCst), 0);
        assert_eq!(harness.routes.build_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unaccepted_asset_is_rejected() {
        let harness = harness(false, false).await;
        let mut profile = harness
            .composer
            .profiles
            .by_merchant_id(MERCHANT_ID)
            .await
            .unwrap()
            .unwrap();
        profile.allow_usdc = false;
        harness.composer.profiles.update(profile).await.unwrap();

        let mut request = sol_request();
        request.asset = PayAsset::Usdc;
        let err = harness.composer.compose(&request).await.unwrap_err();
        assert!(matches!(err, ComposeError::AssetNotAccepted(_)));
    }

    #[tokio::test]
    async fn missing_state_maps_to_the_specific_error() {
        let harness = harness(false, false).await;
        let mut request = sol_request();
        request.merchant_id = 999;
        let err = harness.composer.compose(&request).await.unwrap_err();
        assert!(matches!(err, ComposeError::MerchantNotFound(_)));
    }

    #[tokio::test]
    async fn supplied_swap_transactions_skip_the_build_call() {
        let harness = harness(false, false).await;
        let mut request = sol_request();
        request.swap_transactions = vec![swap_transaction(
            harness.router,
            harness.pool,
            harness.vault_sol,
        )];
        let composed = harness.composer.compose(&request).await.unwrap();

        let transaction = decode_composed(&composed);
        let (_, accounts, _) = &decoded_instructions(&transaction)[0];
        assert_eq!(accounts[16], harness.pool);
        assert_eq!(harness.routes.build_calls.load(Ordering::SeqCst), 0);
        assert_eq!(harness.routes.quote_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_supplied_swap_transaction_is_fatal() {
        let harness = harness(false, false).await;
        let mut request = sol_request();
        request.swap_transactions = vec!["!!".to_owned()];
        let err = harness.composer.compose(&request).await.unwrap_err();
        assert!(matches!(err, ComposeError::MalformedSwapTransaction(_)));
    }

    #[tokio::test]
    async fn compute_budget_directives_are_prepended_in_order() {
        let harness = harness(false, false).await;
        let mut request = sol_request();
        request.compute_unit_limit = Some(400_000);
        request.priority_fee_micro_lamports = Some(10_000);
        let composed = harness.composer.compose(&request).await.unwrap();

        let transaction = decode_composed(&composed);
        let instructions = decoded_instructions(&transaction);
        assert_eq!(instructions.len(), 3);
        assert_eq!(instructions[0].2[0], 2);
        assert_eq!(instructions[1].2[0], 3);
        assert_eq!(instructions[2].0, harness.program_id);
    }

    #[tokio::test]
    async fn preview_reports_the_breakdown_with_a_placeholder_route() {
        let harness = harness(false, false).await;
        let preview = harness
            .composer
            .preview(&PreviewRequest {
                merchant_id: MERCHANT_ID,
                amount: AMOUNT,
                asset: PayAsset::Sol,
                payout_bps: None,
                buyback_bps: None,
                burn_bps: None,
            })
            .await
            .unwrap();

        assert_eq!(preview.buyback_amount, 300_000);
        assert_eq!(preview.protocol_fee, 10_000);
        assert_eq!(preview.payout, 690_000);
        assert_eq!(preview.estimated_out, 600_000);
        assert_eq!(preview.min_out, 594_000);
        assert_eq!(preview.estimated_burn, 300_000);
        assert!(preview.placeholder_payer);
        assert!(preview.swap_transaction.is_some());
    }

    #[tokio::test]
    async fn zero_buyback_preview_is_zero_valued_with_no_aggregator_traffic() {
        let harness = harness(false, false).await;
        let preview = harness
            .composer
            .preview(&PreviewRequest {
                merchant_id: MERCHANT_ID,
                amount: AMOUNT,
                asset: PayAsset::Sol,
                payout_bps: Some(10_000),
                buyback_bps: Some(0),
                burn_bps: None,
            })
            .await
            .unwrap();

        assert_eq!(preview.buyback_amount, 0);
        assert_eq!(preview.min_out, 0);
        assert_eq!(preview.estimated_out, 0);
        assert!(preview.swap_transaction.is_none());
        assert_eq!(harness.routes.quote_calls.load(Ordering::SeqCst), 0);
        assert_eq!(harness.routes.build_calls.load(Ordering::SeqCst), 0);
    }
}
