#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Jupiter aggregator client for payrail buyback routing.
//!
//! The gateway converts the buyback portion of a settlement into the
//! merchant's token through an external price/route aggregator. This crate
//! holds the wire types, the HTTP client, and the [`RouteSource`] trait the
//! composer depends on, so tests can run against a fake without touching
//! the network.
//!
//! Quotes are latency sensitive and stale quotes are rejected downstream,
//! so the client makes a single attempt by default; network failures
//! degrade to the typed [`NotTradable`] result rather than a hard fault.

pub mod client;
pub mod types;

pub use client::{JupiterClient, PLACEHOLDER_PAYER, RouteSource};
pub use types::{MultiHopQuote, NotTradable, Quote, SwapBuildOptions, SwapRoute};
