pub use ledger::MockLedger;
pub use relay::MockRelay;
pub use signer::MockSigner;
pub use sponsor::MockSponsor;

mod ledger;
mod relay;
mod signer;
mod sponsor;
