//! Transport kernel: the exchange-agnostic layers every request passes
//! through.
//!
//! - `rest`: GET-only HTTP transport with outcome classification
//! - `signer`: request authentication, pure and deterministic
//! - `budget`: shared request-weight accounting per credential
//!
//! The kernel contains no endpoint knowledge; typed endpoint wrappers live
//! under `exchanges::binance`.

pub mod budget;
pub mod rest;
pub mod signer;

pub use budget::{RateBudget, Reservation};
pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use signer::{BinanceHmacSigner, NoopSigner, SignedQuery, Signer};
