//! Gateway configuration.
//!
//! Loads from a TOML file with `$VAR` / `${VAR}` environment expansion in
//! string values, then applies `RPC_URL` / `AGGREGATOR_URL` / `PROGRAM_ID`
//! environment overrides.
//!
//! # Example Configuration
//!
//! ```toml
//! rpc_url = "https://api.mainnet-beta.solana.com"
//! aggregator_url = "https://lite-api.jup.ag"
//! program_id = "$SETTLEMENT_PROGRAM_ID"
//! rpc_timeout_secs = 3
//! expiry_window_secs = 30
//! ```

use payrail::error::ComposeError;
use payrail_svm::pda;
use serde::{Deserialize, Serialize};
use solana_pubkey::Pubkey;
use std::path::Path;
use url::Url;

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Chain RPC endpoint (default: devnet).
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Aggregator base URL (default: the Jupiter lite API).
    #[serde(default = "default_aggregator_url")]
    pub aggregator_url: Url,

    /// Settlement program id, base58 (default: the devnet deployment).
    #[serde(default = "default_program_id")]
    pub program_id: String,

    /// USDC mint override; when unset the mint is picked from the RPC
    /// cluster (mainnet vs devnet).
    #[serde(default)]
    pub usdc_mint: Option<String>,

    /// Per-call chain RPC timeout in seconds (default: 3).
    #[serde(default = "default_call_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// Per-call aggregator timeout in seconds (default: 3).
    #[serde(default = "default_call_timeout_secs")]
    pub aggregator_timeout_secs: u64,

    /// Extra quote attempts after the first failure (default: 0).
    #[serde(default)]
    pub quote_retry_budget: u32,

    /// Seconds a composed transaction stays signable (default: 30).
    #[serde(default = "default_expiry_window_secs")]
    pub expiry_window_secs: u64,
}

fn default_rpc_url() -> String {
    "https://api.devnet.solana.com".to_owned()
}

fn default_aggregator_url() -> Url {
    Url::parse("https://lite-api.jup.ag").expect("static URL")
}

fn default_program_id() -> String {
    pda::DEFAULT_SETTLEMENT_PROGRAM_ID.to_string()
}

const fn default_call_timeout_secs() -> u64 {
    3
}

const fn default_expiry_window_secs() -> u64 {
    30
}

impl Default for GatewayConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty config uses defaults")
    }
}

/// Error loading gateway configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Can not read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The config file is not valid TOML for this schema.
    #[error("Can not parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl GatewayConfig {
    /// Loads configuration from the path in the `CONFIG` environment
    /// variable, falling back to `config.toml`, falling back to defaults
    /// when neither exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an existing file cannot be read or
    /// parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG").unwrap_or_else(|_| "config.toml".to_owned());
        Self::load_from(&path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an existing file cannot be read or
    /// parsed.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let content = if Path::new(path).exists() {
            std::fs::read_to_string(path)?
        } else {
            String::new()
        };

        let expanded = expand_env_vars(&content);
        let mut config: Self = toml::from_str(&expanded)?;

        if let Ok(rpc_url) = std::env::var("RPC_URL") {
            config.rpc_url = rpc_url;
        }
        if let Ok(aggregator_url) = std::env::var("AGGREGATOR_URL")
            && let Ok(parsed) = aggregator_url.parse()
        {
            config.aggregator_url = parsed;
        }
        if let Ok(program_id) = std::env::var("PROGRAM_ID") {
            config.program_id = program_id;
        }

        Ok(config)
    }

    /// Parses the configured settlement program id.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::MalformedAddress`] on an invalid id.
    pub fn program_id(&self) -> Result<Pubkey, ComposeError> {
        pda::parse_address(&self.program_id)
    }

    /// Resolves the USDC mint: the explicit override, or the cluster
    /// default picked from the RPC endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::MalformedAddress`] on an invalid override.
    pub fn usdc_mint(&self) -> Result<Pubkey, ComposeError> {
        match &self.usdc_mint {
            Some(mint) => pda::parse_address(mint),
            None if self.rpc_url.contains("mainnet") => Ok(pda::USDC_MINT_MAINNET),
            None => Ok(pda::USDC_MINT_DEVNET),
        }
    }
}

/// Expands `$VAR` and `${VAR}` references from the process environment.
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut var_name = String::new();
        while let Some(&c) = chars.peek() {
            if braced {
                if c == '}' {
                    chars.next();
                    break;
                }
            } else if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            var_name.push(c);
            chars.next();
        }

        if var_name.is_empty() {
            result.push('$');
            if braced {
                result.push('{');
            }
        } else if let Ok(value) = std::env::var(&var_name) {
            result.push_str(&value);
        } else {
            result.push('$');
            if braced {
                result.push('{');
            }
            result.push_str(&var_name);
            if braced {
                result.push('}');
            }
        }
    }

    result
}
