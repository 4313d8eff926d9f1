use async_trait::async_trait;
use mockall::*;

use account_core::*;

mock! {
    pub Relay {
        pub fn submit_operation(
            &self,
            operation: &SignedOperation,
            entry_point: Address,
        ) -> Result<H256, RelayError> {}

        pub fn query_receipt(&self, operation_hash: H256) -> Result<ReceiptStatus, RelayError> {}
    }
}

impl std::fmt::Debug for MockRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockRelay")
    }
}

#[async_trait]
impl RelayProvider for MockRelay {
    async fn submit_operation(
        &self,
        operation: &SignedOperation,
        entry_point: Address,
    ) -> Result<H256, RelayError> {
        self.submit_operation(operation, entry_point)
    }

    async fn query_receipt(&self, operation_hash: H256) -> Result<ReceiptStatus, RelayError> {
        self.query_receipt(operation_hash)
    }
}
