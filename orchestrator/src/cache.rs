use std::collections::HashMap;
use std::sync::{Arc, Weak};

use account_core::{to_display_units, Address, LedgerError, LedgerReader, U256};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::session::AccountSession;

/// A cached token balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    /// Token contract
    pub token: Address,
    /// Holder
    pub owner: Address,
    /// Raw amount
    pub amount: U256,
    /// Token decimal scale
    pub decimals: u8,
    /// When the amount was read
    pub as_of: DateTime<Utc>,
    /// Refresh counter of `owner` the read belongs to
    pub refresh_counter: u64,
}

impl BalanceSnapshot {
    /// Amount scaled by the token's decimals, e.g. `"1.5"`
    pub fn display_amount(&self) -> String {
        to_display_units(self.amount, self.decimals)
    }
}

const MAX_SNAPSHOTS: u64 = 4_096;

/// Read-through cache of token balances with pull-based invalidation.
///
/// Each owner has a refresh counter. A snapshot read under an older counter
/// value is stale and re-fetched on the next read. Nothing is refreshed in
/// the background.
#[derive(Debug)]
pub struct SessionCache {
    ledger: Arc<dyn LedgerReader>,
    snapshots: Cache<(Address, Address), BalanceSnapshot>,
    counters: RwLock<HashMap<Address, u64>>,
    session: RwLock<Weak<AccountSession>>,
}

impl SessionCache {
    /// An empty cache reading from `ledger`
    pub fn new(ledger: Arc<dyn LedgerReader>) -> Self {
        Self {
            ledger,
            snapshots: Cache::builder()
                .max_capacity(MAX_SNAPSHOTS)
                .support_invalidation_closures()
                .build(),
            counters: RwLock::new(HashMap::new()),
            session: RwLock::new(Weak::new()),
        }
    }

    /// Balance of `owner` in `token`, fetched if absent or stale.
    pub async fn read(&self, token: Address, owner: Address) -> Result<BalanceSnapshot, LedgerError> {
        let counter = self.refresh_counter(owner);
        if let Some(snapshot) = self.snapshots.get(&(token, owner)).await {
            if snapshot.refresh_counter == counter {
                return Ok(snapshot);
            }
        }

        debug!(?token, ?owner, "Balance cache miss");
        let amount = self.ledger.token_balance(token, owner).await?;
        let snapshot = BalanceSnapshot {
            token,
            owner,
            amount: amount.amount,
            decimals: amount.decimals,
            as_of: Utc::now(),
            refresh_counter: counter,
        };

        // An invalidation racing the fetch leaves the entry stale
        self.snapshots
            .insert((token, owner), snapshot.clone())
            .await;
        Ok(snapshot)
    }

    /// Bump the refresh counter of `owner`, forcing fresh reads. Returns the
    /// new counter value.
    pub fn invalidate(&self, owner: Address) -> u64 {
        let mut counters = self.counters.write();
        let counter = counters.entry(owner).or_default();
        *counter = counter.saturating_add(1);
        info!(?owner, refresh_counter = *counter, "Balance cache invalidated");
        *counter
    }

    /// Current refresh counter of `owner`
    pub fn refresh_counter(&self, owner: Address) -> u64 {
        self.counters.read().get(&owner).copied().unwrap_or_default()
    }

    /// Point the cache at a live session. Only a weak reference is kept.
    pub fn attach(&self, session: &Arc<AccountSession>) {
        *self.session.write() = Arc::downgrade(session);
    }

    /// Drop the session reference and every snapshot of its account.
    pub fn detach(&self) {
        let session = std::mem::take(&mut *self.session.write());
        let Some(session) = session.upgrade() else {
            return;
        };
        let account = session.account();
        if let Err(err) = self
            .snapshots
            .invalidate_entries_if(move |key: &(Address, Address), _| key.1 == account)
        {
            warn!(?err, ?account, "Failed to drop cached balances");
        }
    }
}

#[cfg(test)]
mod tests {
    use account_test::{FakeChain, FakeSigner};

    use super::*;
    use crate::config::OrchestratorConfig;
    use crate::session::OwnerIdentity;

    const TOKEN: Address = account_core::H160([0xaa; 20]);
    const OWNER: Address = account_core::H160([0x01; 20]);

    fn setup() -> (Arc<FakeChain>, SessionCache) {
        let chain = Arc::new(FakeChain::default());
        chain.add_token(TOKEN, 6);
        chain.mint(TOKEN, OWNER, U256::from(1_500_000));
        let cache = SessionCache::new(chain.clone());
        (chain, cache)
    }

    #[tokio::test]
    async fn reads_are_cached_until_invalidated() {
        let (chain, cache) = setup();

        let first = cache.read(TOKEN, OWNER).await.unwrap();
        assert_eq!(first.display_amount(), "1.5");
        chain.mint(TOKEN, OWNER, U256::from(500_000));

        // still cached
        let second = cache.read(TOKEN, OWNER).await.unwrap();
        assert_eq!(second.amount, U256::from(1_500_000));
        assert_eq!(chain.balance_reads(), 1);

        assert_eq!(cache.invalidate(OWNER), 1);
        let third = cache.read(TOKEN, OWNER).await.unwrap();
        assert_eq!(third.amount, U256::from(2_000_000));
        assert_eq!(third.refresh_counter, 1);
        assert_eq!(chain.balance_reads(), 2);
    }

    #[tokio::test]
    async fn invalidation_is_per_owner() {
        let (chain, cache) = setup();
        let other = Address::repeat_byte(0x02);
        cache.read(TOKEN, OWNER).await.unwrap();
        cache.read(TOKEN, other).await.unwrap();

        cache.invalidate(other);
        cache.read(TOKEN, OWNER).await.unwrap();
        assert_eq!(chain.balance_reads(), 2);
        assert_eq!(cache.refresh_counter(OWNER), 0);
    }

    async fn session(chain: &FakeChain) -> Arc<AccountSession> {
        let owner = OwnerIdentity::new(Arc::new(FakeSigner::new(Address::repeat_byte(0x0c))));
        let session = AccountSession::establish(owner, &OrchestratorConfig::new("project"), chain)
            .await
            .unwrap();
        Arc::new(session)
    }

    #[tokio::test]
    async fn session_is_held_weakly() {
        let (chain, cache) = setup();
        let session = session(&chain).await;
        let weak = Arc::downgrade(&session);
        cache.attach(&session);
        drop(session);
        assert!(weak.upgrade().is_none());
        cache.detach();
    }

    #[tokio::test]
    async fn detach_drops_the_accounts_snapshots() {
        let (chain, cache) = setup();
        let session = session(&chain).await;
        let account = session.account();
        chain.mint(TOKEN, account, U256::from(7));
        cache.attach(&session);

        cache.read(TOKEN, account).await.unwrap();
        cache.read(TOKEN, OWNER).await.unwrap();
        cache.read(TOKEN, account).await.unwrap();
        assert_eq!(chain.balance_reads(), 2);

        cache.detach();
        assert_eq!(cache.read(TOKEN, account).await.unwrap().amount, U256::from(7));
        assert_eq!(chain.balance_reads(), 3);
        // other owners keep their entries
        cache.read(TOKEN, OWNER).await.unwrap();
        assert_eq!(chain.balance_reads(), 3);
    }
}
