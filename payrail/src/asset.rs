//! Payment asset kinds accepted by the gateway.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The base asset a buyer pays with.
///
/// The settle instruction carries this as a one-byte tag; the wire format
/// (HTTP requests and responses) uses the upper-case symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PayAsset {
    /// Native SOL, paid in lamports.
    Sol,
    /// The USDC stable token, paid in base units (6 decimals).
    Usdc,
}

impl PayAsset {
    /// Returns the one-byte tag placed into the settle instruction data.
    #[must_use]
    pub const fn instruction_tag(self) -> u8 {
        match self {
            Self::Sol => 0,
            Self::Usdc => 1,
        }
    }

    /// Returns the upper-case wire symbol.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sol => "SOL",
            Self::Usdc => "USDC",
        }
    }
}

impl fmt::Display for PayAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
