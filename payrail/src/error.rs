//! Typed errors for settlement composition.
//!
//! Every failure a compose or preview can hit is a distinct variant so the
//! HTTP layer can map each one to a stable machine-readable code. Variants
//! fall into four classes with different caller contracts (see
//! [`ErrorClass`]).

use serde::{Deserialize, Serialize};

/// Errors raised while composing or previewing a settlement.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ComposeError {
    /// Payout and buyback basis points are individually valid but violate a
    /// bound (sum over 10000, or a fraction over 10000).
    #[error("Invalid basis points: {0}")]
    InvalidBasisPoints(String),
    /// The requested payment asset is not in the merchant's allowed set.
    #[error("Payment asset {0} not accepted by this merchant")]
    AssetNotAccepted(String),
    /// A request-supplied address failed base58 decoding.
    #[error("Malformed address: {0}")]
    MalformedAddress(String),
    /// No merchant profile or registry entry exists for the identifier.
    #[error("Merchant {0} not found")]
    MerchantNotFound(String),
    /// The protocol config account has not been initialized on chain.
    #[error("Protocol config is not initialized")]
    ProtocolNotInitialized,
    /// The merchant registry entry is frozen.
    #[error("Merchant is frozen")]
    MerchantFrozen,
    /// The protocol-wide pause flag is set.
    #[error("Protocol is paused")]
    ProtocolPaused,
    /// The aggregator found no route, or degraded after its retry budget.
    #[error("No tradable route: {0}")]
    NotTradable(String),
    /// A chain read or blockhash fetch failed or timed out. Safe to retry
    /// the whole compose.
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),
    /// The externally supplied swap transaction could not be decoded.
    #[error("Malformed swap transaction: {0}")]
    MalformedSwapTransaction(String),
    /// Integer amount arithmetic left the representable domain.
    #[error("Amount arithmetic overflow")]
    AmountOverflow,
    /// Program address derivation found no valid bump for the seed set.
    #[error("Address derivation exhausted the bump space")]
    AddressDerivationExhausted,
}

/// Coarse classification of a [`ComposeError`], fixing the caller contract:
/// validation and state errors are surfaced verbatim and never retried,
/// external errors are recoverable by re-composing with a fresh quote, and
/// integrity errors are fatal anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Bad request input; retrying the identical request cannot succeed.
    Validation,
    /// On-chain or stored state forbids the operation right now.
    State,
    /// An external dependency failed; retry the whole compose.
    External,
    /// Forged/corrupted input or an arithmetic domain violation.
    Integrity,
}

impl ErrorClass {
    /// Returns the `snake_case` wire code for this class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::State => "state",
            Self::External => "external",
            Self::Integrity => "integrity",
        }
    }
}

impl ComposeError {
    /// Classifies this error per the taxonomy above.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidBasisPoints(_) | Self::AssetNotAccepted(_) | Self::MalformedAddress(_) => {
                ErrorClass::Validation
            }
            Self::MerchantNotFound(_)
            | Self::ProtocolNotInitialized
            | Self::MerchantFrozen
            | Self::ProtocolPaused => ErrorClass::State,
            Self::NotTradable(_) | Self::NetworkUnavailable(_) => ErrorClass::External,
            Self::MalformedSwapTransaction(_)
            | Self::AmountOverflow
            | Self::AddressDerivationExhausted => ErrorClass::Integrity,
        }
    }

    /// Whether the caller may retry the whole compose with a fresh quote.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::External)
    }
}
