use std::collections::BTreeSet;
use std::fmt;

use account_core::{calls, Address, Bytes, U256};
use derive_new::new;
use serde::{Deserialize, Serialize};

/// What a planned step does, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    /// Token spending authorization
    Approve,
    /// Router swap
    Swap,
    /// Token transfer
    Transfer,
    /// Test token mint
    Mint,
    /// Any other contract call
    Call,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::Approve => "approve",
            StepKind::Swap => "swap",
            StepKind::Transfer => "transfer",
            StepKind::Mint => "mint",
            StepKind::Call => "call",
        };
        f.write_str(name)
    }
}

/// One call of a plan, not yet built into an operation.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct PlannedStep {
    /// What the step does
    pub kind: StepKind,
    /// Contract the account calls
    pub target: Address,
    /// Call data for the target
    pub calldata: Bytes,
    /// Native value forwarded
    pub value: U256,
    /// Token balances the step may change
    pub touched_tokens: Vec<Address>,
}

impl PlannedStep {
    /// `token.approve(spender, amount)`
    pub fn approve(token: Address, spender: Address, amount: U256) -> Self {
        Self::new(
            StepKind::Approve,
            token,
            calls::approve(spender, amount),
            U256::zero(),
            vec![token],
        )
    }

    /// `router.swapExact(tokenIn, tokenOut, amountIn, minOut)`
    pub fn swap_exact(
        router: Address,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        min_out: U256,
    ) -> Self {
        Self::new(
            StepKind::Swap,
            router,
            calls::swap_exact(token_in, token_out, amount_in, min_out),
            U256::zero(),
            vec![token_in, token_out],
        )
    }

    /// `token.transfer(to, amount)`
    pub fn transfer(token: Address, to: Address, amount: U256) -> Self {
        Self::new(
            StepKind::Transfer,
            token,
            calls::transfer(to, amount),
            U256::zero(),
            vec![token],
        )
    }

    /// `token.mint(to, amount)`
    pub fn mint(token: Address, to: Address, amount: U256) -> Self {
        Self::new(
            StepKind::Mint,
            token,
            calls::mint(to, amount),
            U256::zero(),
            vec![token],
        )
    }
}

/// A user level action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Sell `amount_in` of `token_in` for at least `min_out` of `token_out`
    Swap {
        /// Router executing the swap
        router: Address,
        /// Token sold
        token_in: Address,
        /// Token bought
        token_out: Address,
        /// Amount sold
        amount_in: U256,
        /// Minimum acceptable output, supplied by the caller
        min_out: U256,
    },
    /// Send `amount` of `token` to `to`
    Transfer {
        /// Token sent
        token: Address,
        /// Recipient
        to: Address,
        /// Amount sent
        amount: U256,
    },
    /// Mint test tokens to the account
    Faucet {
        /// Tokens and amounts to mint
        mints: Vec<(Address, U256)>,
    },
}

/// Ordered steps forming one user visible action. Steps run strictly in
/// order; a failed step aborts the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPlan {
    steps: Vec<PlannedStep>,
}

impl TransactionPlan {
    /// A plan running `steps` in order
    pub fn new(steps: Vec<PlannedStep>) -> Self {
        Self { steps }
    }

    /// Decompose `intent` for the account at `account`.
    pub fn from_intent(intent: &Intent, account: Address) -> Self {
        let steps = match intent {
            Intent::Swap {
                router,
                token_in,
                token_out,
                amount_in,
                min_out,
            } => vec![
                PlannedStep::approve(*token_in, *router, *amount_in),
                PlannedStep::swap_exact(*router, *token_in, *token_out, *amount_in, *min_out),
            ],
            Intent::Transfer { token, to, amount } => {
                vec![PlannedStep::transfer(*token, *to, *amount)]
            }
            Intent::Faucet { mints } => mints
                .iter()
                .map(|(token, amount)| PlannedStep::mint(*token, account, *amount))
                .collect(),
        };
        Self::new(steps)
    }

    /// The steps, in execution order
    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Union of the tokens touched by every step
    pub fn referenced_tokens(&self) -> BTreeSet<Address> {
        self.steps
            .iter()
            .flat_map(|step| step.touched_tokens.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use account_core::calls::{decode_token_call, TokenCall};

    use super::*;

    #[test]
    fn swap_is_approve_then_swap() {
        let (router, a, b) = (
            Address::repeat_byte(0x0e),
            Address::repeat_byte(0x0a),
            Address::repeat_byte(0x0b),
        );
        let plan = TransactionPlan::from_intent(
            &Intent::Swap {
                router,
                token_in: a,
                token_out: b,
                amount_in: U256::from(100),
                min_out: U256::zero(),
            },
            Address::repeat_byte(0x01),
        );

        assert_eq!(plan.len(), 2);
        let approve = &plan.steps()[0];
        assert_eq!(approve.kind, StepKind::Approve);
        assert_eq!(approve.target, a);
        assert_eq!(
            decode_token_call(&approve.calldata).unwrap(),
            TokenCall::Approve {
                spender: router,
                amount: U256::from(100)
            }
        );

        let swap = &plan.steps()[1];
        assert_eq!(swap.kind, StepKind::Swap);
        assert_eq!(swap.target, router);
        assert_eq!(plan.referenced_tokens(), BTreeSet::from([a, b]));
    }

    #[test]
    fn faucet_mints_to_the_account() {
        let account = Address::repeat_byte(0x01);
        let plan = TransactionPlan::from_intent(
            &Intent::Faucet {
                mints: vec![
                    (Address::repeat_byte(0x0a), U256::from(5)),
                    (Address::repeat_byte(0x0b), U256::from(6)),
                ],
            },
            account,
        );
        assert_eq!(plan.len(), 2);
        assert!(plan.steps().iter().all(|s| s.kind == StepKind::Mint));
        assert_eq!(
            decode_token_call(&plan.steps()[1].calldata).unwrap(),
            TokenCall::Mint {
                to: account,
                amount: U256::from(6)
            }
        );
    }
}
