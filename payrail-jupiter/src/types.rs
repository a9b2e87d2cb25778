//! Wire types for the Jupiter quote and swap-build endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single-hop price quote.
///
/// Immutable value object: produced by the aggregator, consumed once,
/// never mutated. Amounts are decimal strings of smallest units, matching
/// the aggregator wire format. The route plan is deliberately opaque; it is
/// echoed back verbatim on the swap-build request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Input token mint, base58.
    pub input_mint: String,
    /// Output token mint, base58.
    pub output_mint: String,
    /// Exact input amount in smallest units.
    pub in_amount: String,
    /// Quoted output amount in smallest units.
    pub out_amount: String,
    /// Opaque routing plan, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_plan: Option<Value>,
    /// Slot the quote was computed at, when the aggregator reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_slot: Option<u64>,
}

impl Quote {
    /// Parses the quoted output amount.
    ///
    /// # Errors
    ///
    /// Returns [`NotTradable`] if the aggregator returned a non-numeric
    /// amount; garbage output means the route cannot be priced.
    pub fn out_amount_base_units(&self) -> Result<u64, NotTradable> {
        self.out_amount.parse::<u64>().map_err(|_| NotTradable {
            reason: format!("unparseable output amount {:?}", self.out_amount),
        })
    }
}

/// A two-hop quote chain where no direct route exists.
///
/// The first hop's output amount is the exact input of the second hop; no
/// intermediate fee is skimmed between them.
#[derive(Debug, Clone)]
pub struct MultiHopQuote {
    /// First leg (payment asset to the intermediate asset).
    pub first: Quote,
    /// Second leg (intermediate asset to the buyback token).
    pub second: Quote,
}

impl MultiHopQuote {
    /// Total output of the chain, i.e. the second leg's output.
    ///
    /// # Errors
    ///
    /// Returns [`NotTradable`] if the second leg's amount is non-numeric.
    pub fn total_out_base_units(&self) -> Result<u64, NotTradable> {
        self.second.out_amount_base_units()
    }
}

/// Options for the swap-build request.
#[derive(Debug, Clone, Copy)]
pub struct SwapBuildOptions {
    /// Wrap and unwrap SOL around the swap.
    pub wrap_unwrap_sol: bool,
    /// Let the aggregator size the compute unit limit.
    pub dynamic_compute_unit_limit: bool,
    /// Optional priority fee in lamports.
    pub prioritization_fee_lamports: Option<u64>,
}

impl Default for SwapBuildOptions {
    fn default() -> Self {
        Self {
            wrap_unwrap_sol: true,
            dynamic_compute_unit_limit: true,
            prioritization_fee_lamports: None,
        }
    }
}

/// A ready-to-merge swap transaction for the final hop of a route.
#[derive(Debug, Clone)]
pub struct SwapRoute {
    /// The quote this transaction was built from.
    pub quote: Quote,
    /// Base64-encoded unsigned swap transaction.
    pub swap_transaction: String,
    /// Last block height at which the embedded blockhash is valid.
    pub last_valid_block_height: u64,
    /// Whether the build used the placeholder payer. A route built this
    /// way must be re-requested with the true payer before settlement.
    pub placeholder_payer: bool,
}

/// Typed no-route result.
///
/// Not an exception: upstream turns this into a "route unavailable"
/// response. Network-level failures also collapse into this after the
/// retry budget is spent.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{reason}")]
pub struct NotTradable {
    /// Human-readable reason the route is unavailable.
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SwapBuildRequest<'a> {
    pub quote_response: &'a Quote,
    pub user_public_key: &'a str,
    pub wrap_unwrap_sol: bool,
    pub dynamic_compute_unit_limit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prioritization_fee_lamports: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SwapBuildResponse {
    pub swap_transaction: String,
    pub last_valid_block_height: u64,
}
