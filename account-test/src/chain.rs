use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use ethers::types::U512;
use parking_lot::Mutex;
use tracing::debug;

use account_core::calls::{self, TokenCall};
use account_core::*;

/// Paymaster address the fake sponsor signs with
pub const FAKE_PAYMASTER: Address = H160([0x9a; 20]);

/// The sponsor's gas estimate attached to every fake sponsorship
pub const FAKE_GAS: GasLimits = GasLimits {
    call_gas_limit: U256([100_000, 0, 0, 0]),
    verification_gas_limit: U256([200_000, 0, 0, 0]),
    pre_verification_gas: U256([50_000, 0, 0, 0]),
};

#[derive(Debug, Clone, Default)]
struct TokenState {
    decimals: u8,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
}

impl TokenState {
    fn balance(&self, holder: Address) -> U256 {
        self.balances.get(&holder).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    fn credit(&mut self, holder: Address, amount: U256) {
        let balance = self.balances.entry(holder).or_default();
        *balance = balance.saturating_add(amount);
    }

    fn debit(&mut self, holder: Address, amount: U256) -> Result<(), String> {
        let balance = self.balances.entry(holder).or_default();
        if *balance < amount {
            return Err("ERC20: transfer amount exceeds balance".into());
        }
        *balance -= amount;
        Ok(())
    }
}

#[derive(Debug)]
struct Included {
    polls_left: usize,
    receipt: Option<OperationReceipt>,
}

#[derive(Debug)]
struct ChainState {
    chain_id: u64,
    entry_point: Address,
    block: u64,
    fees: GasFees,
    nonces: HashMap<Address, U256>,
    deployed: HashSet<Address>,
    tokens: HashMap<Address, TokenState>,
    routers: HashSet<Address>,
    sponsor_denylist: HashSet<Address>,
    relay_faults: usize,
    sponsor_faults: usize,
    pending_polls: usize,
    never_confirm: bool,
    operations: HashMap<H256, Included>,
    submitted: Vec<SignedOperation>,
    sponsor_requests: usize,
    balance_reads: usize,
}

/// An in-memory chain with an ERC-4337 entry point, mintable ERC-20 tokens
/// and constant-product routers. Implements the relay, sponsor and ledger
/// interfaces over the same state, so scenario tests see the effects of the
/// operations they submit.
///
/// Operations are executed when the relay accepts them; their receipts are
/// reported after the configured number of pending polls.
#[derive(Debug)]
pub struct FakeChain {
    state: Mutex<ChainState>,
}

impl Default for FakeChain {
    fn default() -> Self {
        Self::new(11155111, ENTRY_POINT_V07)
    }
}

impl FakeChain {
    pub fn new(chain_id: u64, entry_point: Address) -> Self {
        Self {
            state: Mutex::new(ChainState {
                chain_id,
                entry_point,
                block: 1,
                fees: GasFees {
                    max_fee_per_gas: U256::from(1_500_000_000u64),
                    max_priority_fee_per_gas: U256::from(1_000_000_000u64),
                },
                nonces: HashMap::new(),
                deployed: HashSet::new(),
                tokens: HashMap::new(),
                routers: HashSet::new(),
                sponsor_denylist: HashSet::new(),
                relay_faults: 0,
                sponsor_faults: 0,
                pending_polls: 0,
                never_confirm: false,
                operations: HashMap::new(),
                submitted: Vec::new(),
                sponsor_requests: 0,
                balance_reads: 0,
            }),
        }
    }

    pub fn set_nonce(&self, account: Address, nonce: U256) {
        self.state.lock().nonces.insert(account, nonce);
    }

    pub fn nonce(&self, account: Address) -> U256 {
        self.state
            .lock()
            .nonces
            .get(&account)
            .copied()
            .unwrap_or_default()
    }

    pub fn set_fees(&self, fees: GasFees) {
        self.state.lock().fees = fees;
    }

    pub fn deploy(&self, account: Address) {
        self.state.lock().deployed.insert(account);
    }

    pub fn is_account_deployed(&self, account: Address) -> bool {
        self.state.lock().deployed.contains(&account)
    }

    pub fn add_token(&self, token: Address, decimals: u8) {
        self.state.lock().tokens.insert(
            token,
            TokenState {
                decimals,
                ..Default::default()
            },
        );
    }

    /// Credit `holder` with `amount` of `token`, outside of any operation.
    pub fn mint(&self, token: Address, holder: Address, amount: U256) {
        self.state
            .lock()
            .tokens
            .entry(token)
            .or_default()
            .credit(holder, amount);
    }

    pub fn balance(&self, token: Address, holder: Address) -> U256 {
        self.state
            .lock()
            .tokens
            .get(&token)
            .map(|t| t.balance(holder))
            .unwrap_or_default()
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state
            .lock()
            .tokens
            .get(&token)
            .map(|t| t.allowance(owner, spender))
            .unwrap_or_default()
    }

    /// Register a router holding the given reserves.
    pub fn add_router(&self, router: Address, reserves: &[(Address, U256)]) {
        let mut state = self.state.lock();
        state.routers.insert(router);
        for (token, reserve) in reserves {
            state.tokens.entry(*token).or_default().credit(router, *reserve);
        }
    }

    /// The sponsor declines every operation calling `target`.
    pub fn reject_sponsorship_for(&self, target: Address) {
        self.state.lock().sponsor_denylist.insert(target);
    }

    /// The next `count` relay submissions fail before reaching the chain.
    pub fn fail_next_relay_submissions(&self, count: usize) {
        self.state.lock().relay_faults = count;
    }

    /// The next `count` sponsor requests fail in transport.
    pub fn fail_next_sponsor_requests(&self, count: usize) {
        self.state.lock().sponsor_faults = count;
    }

    /// Operations report `Pending` this many times before their receipt.
    pub fn set_pending_polls(&self, polls: usize) {
        self.state.lock().pending_polls = polls;
    }

    /// Accepted operations are never included.
    pub fn never_confirm(&self) {
        self.state.lock().never_confirm = true;
    }

    /// Every operation the relay accepted, in order
    pub fn submitted(&self) -> Vec<SignedOperation> {
        self.state.lock().submitted.clone()
    }

    pub fn sponsor_requests(&self) -> usize {
        self.state.lock().sponsor_requests
    }

    /// Number of `token_balance` reads served
    pub fn balance_reads(&self) -> usize {
        self.state.lock().balance_reads
    }
}

fn rejection(code: i64, message: &str) -> RelayError {
    RelayError::Rejected(Rejection::new(code, message))
}

fn swap_output(amount_in: U256, reserve_in: U256, reserve_out: U256) -> U256 {
    let denominator = U512::from(reserve_in) + U512::from(amount_in);
    if denominator.is_zero() {
        return U256::zero();
    }
    U256::try_from(amount_in.full_mul(reserve_out) / denominator).unwrap_or_default()
}

impl ChainState {
    /// Run the account's call against a copy of the token state; the copy
    /// replaces the live state only if the call succeeds.
    fn execute(&mut self, sender: Address, call: &calls::SingleCall) -> Result<(), String> {
        let mut tokens = self.tokens.clone();
        let decoded = calls::decode_token_call(&call.data).map_err(|e| e.to_string())?;

        match decoded {
            TokenCall::Approve { spender, amount } => {
                let token = tokens.get_mut(&call.target).ok_or("call to non-contract")?;
                token.allowances.insert((sender, spender), amount);
            }
            TokenCall::Transfer { to, amount } => {
                let token = tokens.get_mut(&call.target).ok_or("call to non-contract")?;
                token.debit(sender, amount)?;
                token.credit(to, amount);
            }
            TokenCall::Mint { to, amount } => {
                let token = tokens.get_mut(&call.target).ok_or("call to non-contract")?;
                token.credit(to, amount);
            }
            TokenCall::SwapExact {
                token_in,
                token_out,
                amount_in,
                min_out,
            } => {
                let router = call.target;
                if !self.routers.contains(&router) {
                    return Err("call to non-contract".into());
                }
                let reserve_in = tokens.get(&token_in).map(|t| t.balance(router));
                let reserve_out = tokens.get(&token_out).map(|t| t.balance(router));
                let (Some(reserve_in), Some(reserve_out)) = (reserve_in, reserve_out) else {
                    return Err("unknown token".into());
                };
                let amount_out = swap_output(amount_in, reserve_in, reserve_out);
                if amount_out < min_out {
                    return Err("insufficient output amount".into());
                }

                let input = tokens.get_mut(&token_in).ok_or("unknown token")?;
                let allowance = input.allowance(sender, router);
                if allowance < amount_in {
                    return Err("ERC20: insufficient allowance".into());
                }
                input.allowances.insert((sender, router), allowance - amount_in);
                input.debit(sender, amount_in)?;
                input.credit(router, amount_in);

                let output = tokens.get_mut(&token_out).ok_or("unknown token")?;
                output.debit(router, amount_out)?;
                output.credit(sender, amount_out);
            }
        }
        self.tokens = tokens;
        Ok(())
    }

    fn include(&mut self, signed: &SignedOperation) -> Result<H256, RelayError> {
        let op = signed.operation();
        let hash = op.hash(self.entry_point, self.chain_id);
        if hash != signed.hash() {
            return Err(rejection(-32602, "AA23 operation hash mismatch"));
        }
        if signed.signature().len() != 65 {
            return Err(rejection(-32602, "AA24 signature error"));
        }
        if op.sponsorship.is_none() {
            return Err(rejection(-32602, "AA21 didn't pay prefund"));
        }
        let expected = self.nonces.get(&op.sender).copied().unwrap_or_default();
        if op.nonce != expected {
            return Err(rejection(-32602, "AA25 invalid account nonce"));
        }
        let deployed = self.deployed.contains(&op.sender);
        match (&op.init, deployed) {
            (None, false) => return Err(rejection(-32602, "AA20 account not deployed")),
            (Some(_), true) => return Err(rejection(-32602, "AA10 sender already constructed")),
            _ => {}
        }

        self.submitted.push(signed.clone());
        if self.never_confirm {
            self.operations.insert(
                hash,
                Included {
                    polls_left: 0,
                    receipt: None,
                },
            );
            return Ok(hash);
        }

        // validation passed: the nonce is used and the account exists even
        // if execution reverts
        self.nonces.insert(op.sender, expected + 1);
        self.deployed.insert(op.sender);
        self.block += 1;

        let outcome = calls::decode_execute(&op.account_call_data())
            .map_err(|e| e.to_string())
            .and_then(|call| self.execute(op.sender, &call));
        debug!(?hash, ?outcome, "Included operation");

        let receipt = OperationReceipt {
            operation_hash: hash,
            success: outcome.is_ok(),
            block: BlockReference::new(
                self.block.into(),
                Some(H256::from_low_u64_be(self.block)),
                H256::from_low_u64_be(self.block << 8),
            ),
            revert_reason: outcome.err(),
            actual_gas_cost: U256::from(21_000),
        };
        self.operations.insert(
            hash,
            Included {
                polls_left: self.pending_polls,
                receipt: Some(receipt),
            },
        );
        Ok(hash)
    }
}

#[async_trait]
impl RelayProvider for FakeChain {
    async fn submit_operation(
        &self,
        operation: &SignedOperation,
        entry_point: Address,
    ) -> Result<H256, RelayError> {
        let mut state = self.state.lock();
        if state.relay_faults > 0 {
            state.relay_faults -= 1;
            return Err(RelayError::Transport("connection reset".into()));
        }
        if entry_point != state.entry_point {
            return Err(rejection(-32602, "unsupported entry point"));
        }
        if state.operations.contains_key(&operation.hash()) {
            return Err(rejection(-32602, "operation already known"));
        }
        state.include(operation)
    }

    async fn query_receipt(&self, operation_hash: H256) -> Result<ReceiptStatus, RelayError> {
        let mut state = self.state.lock();
        let Some(included) = state.operations.get_mut(&operation_hash) else {
            return Ok(ReceiptStatus::NotFound);
        };
        if included.polls_left > 0 {
            included.polls_left -= 1;
            return Ok(ReceiptStatus::Pending);
        }
        Ok(match &included.receipt {
            Some(receipt) => ReceiptStatus::Terminal(receipt.clone()),
            None => ReceiptStatus::Pending,
        })
    }
}

#[async_trait]
impl SponsorProvider for FakeChain {
    async fn request_sponsorship(
        &self,
        operation: &Operation,
        context: &SponsorContext,
    ) -> Result<Sponsorship, SponsorError> {
        let mut state = self.state.lock();
        state.sponsor_requests += 1;
        if state.sponsor_faults > 0 {
            state.sponsor_faults -= 1;
            return Err(SponsorError::Transport("request timed out".into()));
        }
        if context.chain_id != state.chain_id {
            return Err(SponsorError::Rejected(Rejection::new(
                -32602,
                "unsupported chain",
            )));
        }
        if state.sponsor_denylist.contains(&operation.target) {
            return Err(SponsorError::Rejected(Rejection::new(
                -32500,
                "operation not covered by sponsorship policy",
            )));
        }
        Ok(Sponsorship::new(
            FAKE_PAYMASTER,
            vec![0x01; 12].into(),
            U256::from(60_000),
            U256::from(1),
            FAKE_GAS,
        ))
    }
}

#[async_trait]
impl LedgerReader for FakeChain {
    async fn token_balance(&self, token: Address, owner: Address) -> LedgerResult<TokenAmount> {
        let mut state = self.state.lock();
        state.balance_reads += 1;
        let token_state = state.tokens.get(&token).ok_or_else(|| LedgerError::CallFailed {
            target: token,
            message: "execution reverted".into(),
        })?;
        Ok(TokenAmount::new(
            token_state.balance(owner),
            token_state.decimals,
        ))
    }

    async fn account_nonce(&self, account: Address, _entry_point: Address) -> LedgerResult<U256> {
        Ok(self.nonce(account))
    }

    async fn is_deployed(&self, account: Address) -> LedgerResult<bool> {
        Ok(self.is_account_deployed(account))
    }

    async fn fee_estimate(&self) -> LedgerResult<GasFees> {
        Ok(self.state.lock().fees)
    }

    async fn router_reserve(&self, router: Address, token: Address) -> LedgerResult<U256> {
        Ok(self.balance(token, router))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: Address = H160([0xaa; 20]);
    const ACCOUNT: Address = H160([0x01; 20]);

    async fn sign(chain: &FakeChain, mut op: Operation) -> SignedOperation {
        let sponsorship = chain
            .request_sponsorship(&op, &SponsorContext::new(11155111, ENTRY_POINT_V07))
            .await
            .unwrap();
        op = op.with_sponsorship(sponsorship);
        let hash = op.hash(ENTRY_POINT_V07, 11155111);
        SignedOperation::new(op, vec![0u8; 65].into(), hash)
    }

    #[tokio::test]
    async fn mints_and_enforces_nonce() {
        let chain = FakeChain::default();
        chain.add_token(TOKEN, 18);
        chain.deploy(ACCOUNT);

        let op = Operation::new(
            ACCOUNT,
            TOKEN,
            calls::mint(ACCOUNT, U256::from(5)),
            U256::zero(),
            U256::zero(),
        );
        let signed = sign(&chain, op.clone()).await;
        let hash = chain
            .submit_operation(&signed, ENTRY_POINT_V07)
            .await
            .unwrap();
        assert_eq!(chain.balance(TOKEN, ACCOUNT), U256::from(5));
        assert!(matches!(
            chain.query_receipt(hash).await.unwrap(),
            ReceiptStatus::Terminal(receipt) if receipt.success
        ));

        // same nonce again, different content
        let mut stale = op;
        stale.calldata = calls::mint(ACCOUNT, U256::from(6));
        let err = chain
            .submit_operation(&sign(&chain, stale).await, ENTRY_POINT_V07)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("AA25"));
    }

    #[tokio::test]
    async fn failed_call_reverts_state_but_uses_nonce() {
        let chain = FakeChain::default();
        chain.add_token(TOKEN, 18);
        chain.deploy(ACCOUNT);

        let op = Operation::new(
            ACCOUNT,
            TOKEN,
            calls::transfer(Address::repeat_byte(0x02), U256::from(1)),
            U256::zero(),
            U256::zero(),
        );
        let hash = chain
            .submit_operation(&sign(&chain, op).await, ENTRY_POINT_V07)
            .await
            .unwrap();
        let ReceiptStatus::Terminal(receipt) = chain.query_receipt(hash).await.unwrap() else {
            panic!("expected a terminal receipt");
        };
        assert!(!receipt.success);
        assert_eq!(
            receipt.revert_reason.as_deref(),
            Some("ERC20: transfer amount exceeds balance")
        );
        assert_eq!(chain.nonce(ACCOUNT), U256::one());
    }
}
