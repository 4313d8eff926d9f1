pub use bundler::BundlerClient;
pub use ledger::NodeLedger;
pub use paymaster::PaymasterClient;
pub use rpc_types::*;
pub use signer::LocalKeySigner;

mod bundler;
mod ledger;
mod paymaster;
mod rpc;
mod rpc_types;
mod signer;
