#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Settlement composer and service wiring for the payrail gateway.
//!
//! The composer takes a validated payment request and produces an unsigned
//! settle transaction: it resolves program-derived accounts, computes the
//! exact payout/buyback/fee split, quotes the buyback conversion, merges
//! the swap route's accounts into the settle instruction, and stamps a
//! finalized blockhash plus an expiry instant. Signing and submission stay
//! with the caller.
//!
//! # Modules
//!
//! - [`composer`] - The settlement composer
//! - [`config`] - TOML + environment configuration
//! - [`context`] - Once-initialized program context shared across requests
//! - [`telemetry`] - Tracing subscriber setup
//! - [`types`] - Request and response types

pub mod composer;
pub mod config;
pub mod context;
pub mod telemetry;
pub mod types;

pub use composer::SettlementComposer;
pub use config::GatewayConfig;
pub use context::{ContextCell, ProgramContext};
