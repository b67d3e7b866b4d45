//! Async Rust SDK for the GMO Coin exchange.
//!
//! The crate is organized by transport surface:
//! - `rest`: batched REST request assembly and concurrent dispatch.
//! - `endpoints`: thin per-endpoint request builders.
//! - `stream`: resilient public/private websocket sessions.
//! - `token`: private websocket access-token lifecycle.
//! - `auth`: request signing and private-call headers.
//! - `config`: endpoint URLs and timing knobs.

/// Request signing and private-call header assembly.
pub mod auth;
/// Endpoint URLs, symbol, and timing configuration.
pub mod config;
/// Thin builders for the exchange REST endpoints.
pub mod endpoints;
/// Request batch assembly and concurrent dispatch.
pub mod rest;
/// Public and private websocket stream sessions.
pub mod stream;
/// Private websocket access-token acquisition and renewal.
pub mod token;
