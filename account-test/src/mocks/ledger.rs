use async_trait::async_trait;
use mockall::*;

use account_core::*;

mock! {
    pub Ledger {
        pub fn token_balance(&self, token: Address, owner: Address) -> LedgerResult<TokenAmount> {}

        pub fn account_nonce(&self, account: Address, entry_point: Address) -> LedgerResult<U256> {}

        pub fn is_deployed(&self, account: Address) -> LedgerResult<bool> {}

        pub fn fee_estimate(&self) -> LedgerResult<GasFees> {}

        pub fn router_reserve(&self, router: Address, token: Address) -> LedgerResult<U256> {}
    }
}

impl std::fmt::Debug for MockLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockLedger")
    }
}

#[async_trait]
impl LedgerReader for MockLedger {
    async fn token_balance(&self, token: Address, owner: Address) -> LedgerResult<TokenAmount> {
        self.token_balance(token, owner)
    }

    async fn account_nonce(&self, account: Address, entry_point: Address) -> LedgerResult<U256> {
        self.account_nonce(account, entry_point)
    }

    async fn is_deployed(&self, account: Address) -> LedgerResult<bool> {
        self.is_deployed(account)
    }

    async fn fee_estimate(&self) -> LedgerResult<GasFees> {
        self.fee_estimate()
    }

    async fn router_reserve(&self, router: Address, token: Address) -> LedgerResult<U256> {
        self.router_reserve(router, token)
    }
}
