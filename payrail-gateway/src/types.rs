//! Request and response types for the settlement composer.

use payrail::asset::PayAsset;
use payrail::timestamp::UnixTimestamp;
use payrail_svm::extract::AccountRequirement;
use payrail_svm::instruction::{SettleAccounts, SettleArgs};
use serde::{Deserialize, Serialize};

/// Request to compose a signable settle transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeRequest {
    /// Merchant identifier.
    pub merchant_id: u64,
    /// Paying buyer's wallet, base58. Becomes the fee payer.
    pub payer: String,
    /// Payment amount in base units of `asset`.
    pub amount: u64,
    /// Asset the buyer pays with.
    pub asset: PayAsset,
    /// Payout share override; the merchant profile default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_bps: Option<u16>,
    /// Buyback share override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyback_bps: Option<u16>,
    /// Burn fraction override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burn_bps: Option<u16>,
    /// Pre-built swap transactions from a preview, one per hop, merged
    /// as-is. A preview-built transaction embeds the placeholder payer;
    /// callers wanting payer-accurate routes leave this empty and let the
    /// composer rebuild the swap against the true payer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub swap_transactions: Vec<String>,
    /// Optional compute-unit-limit directive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_unit_limit: Option<u32>,
    /// Optional priority fee in micro-lamports per compute unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_fee_micro_lamports: Option<u64>,
}

/// Request for a quote-time preview, before the payer is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    /// Merchant identifier.
    pub merchant_id: u64,
    /// Payment amount in base units of `asset`.
    pub amount: u64,
    /// Asset the buyer pays with.
    pub asset: PayAsset,
    /// Payout share override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_bps: Option<u16>,
    /// Buyback share override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyback_bps: Option<u16>,
    /// Burn fraction override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burn_bps: Option<u16>,
}

/// Quote-time breakdown of a prospective settlement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementPreview {
    /// Merchant identifier.
    pub merchant_id: u64,
    /// Payment amount in base units.
    pub amount: u64,
    /// Asset the buyer pays with.
    pub asset: PayAsset,
    /// Effective payout share.
    pub payout_bps: u16,
    /// Effective buyback share.
    pub buyback_bps: u16,
    /// Effective burn fraction.
    pub burn_bps: u16,
    /// Merchant slippage tolerance applied to the quote.
    pub slippage_bps: u16,
    /// Merchant payout amount after buyback and protocol fee.
    pub payout: u64,
    /// Amount converted into the buyback token.
    pub buyback_amount: u64,
    /// Protocol fee amount.
    pub protocol_fee: u64,
    /// Quoted buyback output in buyback-token base units.
    pub estimated_out: u64,
    /// Slippage-bounded minimum acceptable buyback output.
    pub min_out: u64,
    /// Portion of the estimated output that would be burned.
    pub estimated_burn: u64,
    /// Final-hop swap transaction, when the aggregator produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap_transaction: Option<String>,
    /// Whether the swap transaction was built against the placeholder
    /// payer and must be rebuilt before settlement.
    pub placeholder_payer: bool,
    /// Instant after which this preview must be re-quoted.
    pub expires_at: UnixTimestamp,
}

/// The produced artifact: an unsigned transaction and its deadline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedTransaction {
    /// Base64-encoded unsigned transaction.
    pub transaction: String,
    /// Instant after which signing or submission requires a fresh compose.
    pub expires_at: UnixTimestamp,
}

/// The composer's working value: everything resolved for one request.
///
/// Built fresh per request and discarded after assembly; never persisted
/// or shared across requests.
#[derive(Debug)]
pub struct SettlementPlan {
    /// Resolved fixed-role accounts.
    pub accounts: SettleAccounts,
    /// Encoded numeric arguments.
    pub args: SettleArgs,
    /// Merged swap-route accounts, appended after the fixed list.
    pub remaining: Vec<AccountRequirement>,
    /// Optional compute-unit-limit directive.
    pub compute_unit_limit: Option<u32>,
    /// Optional priority fee in micro-lamports.
    pub priority_fee_micro_lamports: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_request_uses_the_camel_case_wire_format() {
        let request: ComposeRequest = serde_json::from_str(
            r#"{
                "merchantId": 7,
                "payer": "So11111111111111111111111111111111111111112",
                "amount": 1000000,
                "asset": "SOL",
                "buybackBps": 3000,
                "priorityFeeMicroLamports": 5000
            }"#,
        )
        .unwrap();
        assert_eq!(request.merchant_id, 7);
        assert_eq!(request.asset, PayAsset::Sol);
        assert_eq!(request.buyback_bps, Some(3000));
        assert_eq!(request.payout_bps, None);
        assert!(request.swap_transactions.is_empty());
    }

    #[test]
    fn composed_artifact_serializes_transaction_and_expires_at() {
        let composed = ComposedTransaction {
            transaction: "AQID".to_owned(),
            expires_at: UnixTimestamp::from_secs(1_700_000_030),
        };
        assert_eq!(
            serde_json::to_string(&composed).unwrap(),
            r#"{"transaction":"AQID","expiresAt":1700000030}"#
        );
    }
}
