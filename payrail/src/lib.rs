#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the payrail settlement gateway.
//!
//! This crate provides the chain-agnostic foundation used throughout the
//! payrail workspace: exact basis-point arithmetic for payment splits, the
//! compose error taxonomy, timestamps for quote/transaction expiry, base64
//! helpers, and the off-chain merchant profile contract.
//!
//! Chain-specific machinery (address derivation, account extraction,
//! instruction assembly) lives in `payrail-svm`; the route aggregator
//! client lives in `payrail-jupiter`; the settlement composer that ties
//! them together lives in `payrail-gateway`.
//!
//! # Modules
//!
//! - [`asset`] - Payment asset kinds accepted by the gateway
//! - [`bps`] - Basis-point validation and integer-exact fee splitting
//! - [`encoding`] - Base64 helpers for transaction payloads
//! - [`error`] - Typed compose errors with machine-readable classes
//! - [`profile`] - Off-chain merchant configuration and its store contract
//! - [`timestamp`] - Unix timestamps and expiry windows

pub mod asset;
pub mod bps;
pub mod encoding;
pub mod error;
pub mod profile;
pub mod timestamp;
