//! Core types and external interfaces for smart-account orchestration.
//!
//! This crate contains the operation model and its hashing, deterministic
//! account derivation, ABI helpers and the narrow traits through which the
//! orchestrator reaches the signer, relay, sponsor and ledger.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used, clippy::panic)]

pub use derivation::AccountDeriver;
pub use error::*;
pub use operation::{Operation, SignedOperation};
pub use traits::*;
pub use types::*;
pub use units::{to_base_units, to_display_units};

/// Re-exported ethers primitives used throughout the API
pub use ethers::types::{Address, Bytes, Signature, H160, H256, U256, U64};

pub mod calls;
mod derivation;
mod error;
mod operation;
mod traits;
mod types;
mod units;
