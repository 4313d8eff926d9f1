use std::sync::Arc;

use account_core::{Address, ConfigurationError, LedgerReader, U256};
use ethers::types::U512;
use tracing::instrument;

use crate::error::OrchestratorError;

const BPS_DENOMINATOR: u64 = 10_000;

/// Expected output of a swap and the minimum output to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapQuote {
    /// Constant product output at current reserves
    pub expected_out: U256,
    /// `expected_out` less the slippage allowance
    pub min_out: U256,
}

/// Quotes router swaps from on-chain reserves.
#[derive(Debug, Clone)]
pub struct SwapQuoter {
    ledger: Arc<dyn LedgerReader>,
}

/// `amount_in * reserve_out / (reserve_in + amount_in)`
pub fn constant_product_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> U256 {
    let denominator = U512::from(reserve_in) + U512::from(amount_in);
    if denominator.is_zero() {
        return U256::zero();
    }
    let out = amount_in.full_mul(reserve_out) / denominator;
    // out < reserve_out, so it always fits
    U256::try_from(out).unwrap_or(reserve_out)
}

impl SwapQuoter {
    /// A quoter reading reserves from `ledger`
    pub fn new(ledger: Arc<dyn LedgerReader>) -> Self {
        Self { ledger }
    }

    /// Quote selling `amount_in` of `token_in` for `token_out` through
    /// `router`, allowing `slippage_bps` basis points of slippage.
    #[instrument(skip(self))]
    pub async fn quote(
        &self,
        router: Address,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        slippage_bps: u64,
    ) -> Result<SwapQuote, OrchestratorError> {
        if slippage_bps > BPS_DENOMINATOR {
            return Err(ConfigurationError::InvalidOption {
                option: "slippageBps",
                reason: format!("{slippage_bps} exceeds {BPS_DENOMINATOR}"),
            }
            .into());
        }
        let reserve_in = self.ledger.router_reserve(router, token_in).await?;
        let reserve_out = self.ledger.router_reserve(router, token_out).await?;

        let expected_out = constant_product_out(amount_in, reserve_in, reserve_out);
        let min_out = expected_out
            .full_mul(U256::from(BPS_DENOMINATOR - slippage_bps))
            / U512::from(BPS_DENOMINATOR);
        Ok(SwapQuote {
            expected_out,
            min_out: U256::try_from(min_out).unwrap_or(expected_out),
        })
    }
}

#[cfg(test)]
mod tests {
    use account_test::MockLedger;

    use super::*;

    #[test]
    fn constant_product() {
        assert_eq!(
            constant_product_out(U256::from(100), U256::from(1_000), U256::from(2_000)),
            U256::from(181)
        );
        assert_eq!(
            constant_product_out(U256::from(100), U256::zero(), U256::zero()),
            U256::zero()
        );
        assert_eq!(
            constant_product_out(U256::MAX, U256::MAX, U256::MAX),
            U256::MAX / 2
        );
    }

    #[tokio::test]
    async fn quote_applies_slippage() {
        let (router, a, b) = (
            Address::repeat_byte(0x0e),
            Address::repeat_byte(0x0a),
            Address::repeat_byte(0x0b),
        );
        let mut ledger = MockLedger::new();
        ledger
            .expect_router_reserve()
            .returning(move |_, token| {
                Ok(if token == a {
                    U256::from(1_000)
                } else {
                    U256::from(2_000)
                })
            });

        let quote = SwapQuoter::new(Arc::new(ledger))
            .quote(router, a, b, U256::from(100), 100)
            .await
            .unwrap();
        assert_eq!(quote.expected_out, U256::from(181));
        // 181 * 0.99, rounded down
        assert_eq!(quote.min_out, U256::from(179));
    }

    #[tokio::test]
    async fn slippage_above_one_hundred_percent_is_rejected() {
        let quoter = SwapQuoter::new(Arc::new(MockLedger::new()));
        let err = quoter
            .quote(
                Address::zero(),
                Address::zero(),
                Address::zero(),
                U256::one(),
                10_001,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Configuration(_)));
    }
}
