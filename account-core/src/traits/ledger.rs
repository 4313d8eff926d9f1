use std::fmt::Debug;

use async_trait::async_trait;
use auto_impl::auto_impl;
use ethers::types::{Address, U256};

use crate::error::LedgerResult;
use crate::types::{GasFees, TokenAmount};

/// Read-only access to ledger state.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait LedgerReader: Send + Sync + Debug {
    /// Token balance of `owner` together with the token's decimal scale
    async fn token_balance(&self, token: Address, owner: Address) -> LedgerResult<TokenAmount>;

    /// Next nonce the entry point expects from `account`
    async fn account_nonce(&self, account: Address, entry_point: Address) -> LedgerResult<U256>;

    /// Whether `account` has code
    async fn is_deployed(&self, account: Address) -> LedgerResult<bool>;

    /// Current EIP-1559 fee caps
    async fn fee_estimate(&self) -> LedgerResult<GasFees>;

    /// Router liquidity held for `token`
    async fn router_reserve(&self, router: Address, token: Address) -> LedgerResult<U256>;
}
