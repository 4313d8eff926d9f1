use chrono::{DateTime, Utc};
use derive_new::new;
use ethers::types::{Address, Bytes, H160, H256, U256, U64};
use serde::{Deserialize, Serialize};

/// ERC-4337 v0.7 entry point, deployed at the same address on every chain.
/// `0x0000000071727De22E5E9d8BAf0edAc6f37da032`
pub const ENTRY_POINT_V07: Address = H160([
    0x00, 0x00, 0x00, 0x00, 0x71, 0x72, 0x7d, 0xe2, 0x2e, 0x5e, 0x9d, 0x8b, 0xaf, 0x0e, 0xda, 0xc6,
    0xf3, 0x7d, 0xa0, 0x32,
]);

/// Gas limits carried by an operation. Filled in by the sponsor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasLimits {
    /// Gas for the account's execution phase
    pub call_gas_limit: U256,
    /// Gas for the account's validation phase
    pub verification_gas_limit: U256,
    /// Overhead charged by the relay for including the operation
    pub pre_verification_gas: U256,
}

/// EIP-1559 fee caps for an operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasFees {
    /// Max total fee per gas
    pub max_fee_per_gas: U256,
    /// Max tip per gas
    pub max_priority_fee_per_gas: U256,
}

/// Sponsorship metadata attached by the sponsor (paymaster).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
#[serde(rename_all = "camelCase")]
pub struct Sponsorship {
    /// Paymaster contract that pays for the operation
    pub paymaster: Address,
    /// Opaque paymaster data (usually a signed validity window)
    pub paymaster_data: Bytes,
    /// Gas for the paymaster's validation phase
    pub paymaster_verification_gas_limit: U256,
    /// Gas for the paymaster's post-operation phase
    pub paymaster_post_op_gas_limit: U256,
    /// Account gas limits estimated by the sponsor
    pub gas: GasLimits,
}

/// Deployment data for an account that has no code yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
#[serde(rename_all = "camelCase")]
pub struct AccountInit {
    /// Factory that deploys the account
    pub factory: Address,
    /// Call data for the factory
    pub factory_data: Bytes,
}

/// Where in the ledger a terminal operation landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, new)]
#[serde(rename_all = "camelCase")]
pub struct BlockReference {
    /// Block that included the bundle
    pub block_number: U64,
    /// Hash of that block, when known
    pub block_hash: Option<H256>,
    /// Hash of the bundle transaction
    pub transaction_hash: H256,
}

/// Terminal ledger outcome of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReceipt {
    /// Hash of the operation
    pub operation_hash: H256,
    /// Whether the account's execution succeeded
    pub success: bool,
    /// Inclusion details
    pub block: BlockReference,
    /// Revert reason, when the ledger reports one
    pub revert_reason: Option<String>,
    /// Fee actually paid (by the sponsor)
    pub actual_gas_cost: U256,
}

/// Result of a single receipt query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// The relay does not know this operation
    NotFound,
    /// Known but not yet included
    Pending,
    /// Included, with a terminal outcome
    Terminal(OperationReceipt),
}

/// Handle on an in-flight operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
#[serde(rename_all = "camelCase")]
pub struct PendingHandle {
    /// Content hash of the submitted operation
    pub operation_hash: H256,
    /// Nonce the operation was submitted under
    pub nonce: U256,
    /// When the relay accepted the operation
    pub submitted_at: DateTime<Utc>,
}

/// A token amount together with its decimal scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct TokenAmount {
    /// Raw integer amount
    pub amount: U256,
    /// Decimal scale of the token
    pub decimals: u8,
}
