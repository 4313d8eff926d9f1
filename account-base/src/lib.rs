//! Settings, tracing and concrete network adapters for the smart-account
//! orchestrator.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::panic)]

pub use clients::*;
pub use settings::*;

mod clients;
/// Settings loading and validation
pub mod settings;
