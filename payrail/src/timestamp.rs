//! Unix timestamps for quote and transaction expiry.
//!
//! Composed transactions and quotes go stale together with the blockhash
//! and the routed price, so every artifact the gateway returns carries an
//! absolute `expiresAt` instant built from a short window.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Seconds since the Unix epoch, serialized as a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixTimestamp(u64);

impl UnixTimestamp {
    /// Wraps a raw seconds value.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Returns the current system time.
    ///
    /// # Panics
    ///
    /// Panics if the system clock is set before the Unix epoch.
    #[must_use]
    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_secs();
        Self(now)
    }

    /// Returns the instant `window_secs` from now, for stamping expiry.
    #[must_use]
    pub fn expiry(window_secs: u64) -> Self {
        Self(Self::now().0.saturating_add(window_secs))
    }

    /// Raw seconds since the epoch.
    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0
    }

    /// Whether this instant is at or before `other`.
    #[must_use]
    pub const fn is_expired_at(self, other: Self) -> bool {
        self.0 <= other.0
    }
}

impl fmt::Display for UnixTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
