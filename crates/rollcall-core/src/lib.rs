//! Core types and component logic for the rollcall attendance service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! It holds the identify → disambiguate → confirm → record pipeline:
//! link resolution ([`link`]), candidate ranking ([`matcher`]), the
//! ephemeral disambiguation session store ([`session`]), and the
//! ledger confirmation step ([`ledger`]). Storage backends implement
//! [`store::RollcallStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod ledger;
pub mod link;
pub mod matcher;
pub mod roster;
pub mod session;
pub mod store;
pub mod window;

pub use error::{Error, Result};
