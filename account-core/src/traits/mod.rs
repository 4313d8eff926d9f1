pub use ledger::*;
pub use relay::*;
pub use signer::*;
pub use sponsor::*;

mod ledger;
mod relay;
mod signer;
mod sponsor;
