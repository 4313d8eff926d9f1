//! Test doubles for the smart-account interfaces: `mockall` mocks of the
//! external traits and an in-memory chain that plays relay, sponsor and
//! ledger at once.

#![allow(non_snake_case)]

pub use chain::*;
pub use mocks::*;
pub use signer::FakeSigner;

mod chain;
mod mocks;
mod signer;
