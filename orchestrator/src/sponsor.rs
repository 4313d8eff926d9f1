use std::sync::Arc;

use account_core::{Operation, SponsorContext, SponsorProvider};
use tracing::{info, instrument, warn};

use crate::error::OrchestratorError;
use crate::retry::RetryPolicy;

/// Attaches sponsorship metadata to built operations.
#[derive(Debug, Clone)]
pub struct SponsorClient {
    sponsor: Arc<dyn SponsorProvider>,
    context: SponsorContext,
    retry: RetryPolicy,
}

impl SponsorClient {
    /// A client for `sponsor`, retrying transport faults with `retry`
    pub fn new(sponsor: Arc<dyn SponsorProvider>, context: SponsorContext, retry: RetryPolicy) -> Self {
        Self {
            sponsor,
            context,
            retry,
        }
    }

    /// Request sponsorship for `operation` and return it with the metadata
    /// attached. Does not sign. A decline is final for this operation.
    #[instrument(skip_all, fields(sender = ?operation.sender, nonce = ?operation.nonce))]
    pub async fn sponsor(&self, operation: Operation) -> Result<Operation, OrchestratorError> {
        let result = self
            .retry
            .run("sponsor_operation", || {
                self.sponsor
                    .request_sponsorship(&operation, &self.context)
            })
            .await;
        match result {
            Ok(sponsorship) => {
                info!(paymaster = ?sponsorship.paymaster, "Operation sponsored");
                Ok(operation.with_sponsorship(sponsorship))
            }
            Err(err) => {
                warn!(?err, "Sponsorship failed");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use account_core::{
        calls, Address, GasLimits, Rejection, SponsorError, Sponsorship, ENTRY_POINT_V07, U256,
    };
    use account_test::MockSponsor;

    use super::*;

    fn operation() -> Operation {
        Operation::new(
            Address::repeat_byte(0x01),
            Address::repeat_byte(0x02),
            calls::approve(Address::repeat_byte(0x03), U256::from(100)),
            U256::zero(),
            U256::zero(),
        )
    }

    fn sponsorship() -> Sponsorship {
        Sponsorship::new(
            Address::repeat_byte(0x44),
            vec![0x01].into(),
            U256::from(1),
            U256::from(1),
            GasLimits {
                call_gas_limit: U256::from(90_000),
                ..Default::default()
            },
        )
    }

    fn client(sponsor: MockSponsor) -> SponsorClient {
        SponsorClient::new(
            Arc::new(sponsor),
            SponsorContext::new(11155111, ENTRY_POINT_V07),
            RetryPolicy::new(3, Duration::from_millis(10)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn attaches_sponsorship() {
        let mut sponsor = MockSponsor::new();
        sponsor
            .expect_request_sponsorship()
            .times(1)
            .returning(|_, _| Ok(sponsorship()));

        let sponsored = client(sponsor).sponsor(operation()).await.unwrap();
        assert_eq!(sponsored.sponsorship, Some(sponsorship()));
        assert_eq!(sponsored.gas.call_gas_limit, U256::from(90_000));
        assert!(sponsored.signature.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn declines_are_not_retried() {
        let mut sponsor = MockSponsor::new();
        sponsor
            .expect_request_sponsorship()
            .times(1)
            .returning(|_, _| Err(SponsorError::Rejected(Rejection::new(-32500, "policy"))));

        let err = client(sponsor).sponsor(operation()).await.unwrap_err();
        assert_eq!(
            err,
            OrchestratorError::SponsorRejected("code -32500: policy".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transport_faults_are_retried() {
        let mut sponsor = MockSponsor::new();
        let mut seq = mockall::Sequence::new();
        sponsor
            .expect_request_sponsorship()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(SponsorError::Transport("timeout".into())));
        sponsor
            .expect_request_sponsorship()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(sponsorship()));

        assert!(client(sponsor).sponsor(operation()).await.is_ok());
    }
}
