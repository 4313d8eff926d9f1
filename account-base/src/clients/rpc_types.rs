//! Wire types of the bundler and paymaster JSON-RPC APIs (ERC-4337 v0.7).

use account_core::{
    Address, BlockReference, Bytes, GasLimits, Operation, OperationReceipt, SignedOperation,
    Sponsorship, H256, U256, U64,
};
use serde::{Deserialize, Serialize};

/// Well formed ECDSA signature used while the real one does not exist yet, so
/// that sponsors can simulate validation and estimate its gas.
pub fn placeholder_signature() -> Bytes {
    let mut sig = [0u8; 65];
    sig[..15].fill(0xff);
    sig[15] = 0xf0;
    sig[32] = 0x7a;
    sig[33..64].fill(0xaa);
    sig[64] = 0x1c;
    Bytes::from(sig.to_vec())
}

/// Unpacked user operation as bundlers and paymasters expect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcUserOperation {
    pub sender: Address,
    pub nonce: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<Bytes>,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<Bytes>,
    pub signature: Bytes,
}

impl RpcUserOperation {
    fn from_operation(op: &Operation, signature: Bytes) -> Self {
        let sponsorship = op.sponsorship.as_ref();
        Self {
            sender: op.sender,
            nonce: op.nonce,
            factory: op.init.as_ref().map(|i| i.factory),
            factory_data: op.init.as_ref().map(|i| i.factory_data.clone()),
            call_data: op.account_call_data(),
            call_gas_limit: op.gas.call_gas_limit,
            verification_gas_limit: op.gas.verification_gas_limit,
            pre_verification_gas: op.gas.pre_verification_gas,
            max_fee_per_gas: op.fees.max_fee_per_gas,
            max_priority_fee_per_gas: op.fees.max_priority_fee_per_gas,
            paymaster: sponsorship.map(|s| s.paymaster),
            paymaster_verification_gas_limit: sponsorship
                .map(|s| s.paymaster_verification_gas_limit),
            paymaster_post_op_gas_limit: sponsorship.map(|s| s.paymaster_post_op_gas_limit),
            paymaster_data: sponsorship.map(|s| s.paymaster_data.clone()),
            signature,
        }
    }

    /// An operation not yet signed, carrying the placeholder signature
    pub fn unsigned(op: &Operation) -> Self {
        Self::from_operation(op, placeholder_signature())
    }

    /// A signed operation, ready to relay
    pub fn signed(op: &SignedOperation) -> Self {
        Self::from_operation(op.operation(), op.signature())
    }
}

/// Result of `zd_sponsorUserOperation`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcSponsorship {
    pub paymaster: Address,
    pub paymaster_data: Bytes,
    pub paymaster_verification_gas_limit: U256,
    pub paymaster_post_op_gas_limit: U256,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
}

impl From<RpcSponsorship> for Sponsorship {
    fn from(rpc: RpcSponsorship) -> Self {
        Sponsorship::new(
            rpc.paymaster,
            rpc.paymaster_data,
            rpc.paymaster_verification_gas_limit,
            rpc.paymaster_post_op_gas_limit,
            GasLimits {
                call_gas_limit: rpc.call_gas_limit,
                verification_gas_limit: rpc.verification_gas_limit,
                pre_verification_gas: rpc.pre_verification_gas,
            },
        )
    }
}

/// The bundle transaction part of a user operation receipt
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransactionReceipt {
    pub transaction_hash: H256,
    #[serde(default)]
    pub block_hash: Option<H256>,
    pub block_number: U64,
}

/// Result of `eth_getUserOperationReceipt`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcOperationReceipt {
    pub user_op_hash: H256,
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub actual_gas_cost: U256,
    pub receipt: RpcTransactionReceipt,
}

impl From<RpcOperationReceipt> for OperationReceipt {
    fn from(rpc: RpcOperationReceipt) -> Self {
        // bundlers report an empty "0x" reason for successful operations
        let revert_reason = rpc
            .reason
            .filter(|r| !r.is_empty() && r != "0x" && !rpc.success);
        OperationReceipt {
            operation_hash: rpc.user_op_hash,
            success: rpc.success,
            block: BlockReference::new(
                rpc.receipt.block_number,
                rpc.receipt.block_hash,
                rpc.receipt.transaction_hash,
            ),
            revert_reason,
            actual_gas_cost: rpc.actual_gas_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use account_core::{calls, AccountInit};

    use super::*;

    fn operation() -> Operation {
        Operation::new(
            Address::repeat_byte(0x11),
            Address::repeat_byte(0x22),
            calls::transfer(Address::repeat_byte(0x33), U256::from(5)),
            U256::zero(),
            U256::from(3),
        )
    }

    #[test]
    fn unsponsored_operations_omit_paymaster_fields() {
        let json = serde_json::to_value(RpcUserOperation::unsigned(&operation())).unwrap();
        assert_eq!(json["nonce"], "0x3");
        assert!(json.get("paymaster").is_none());
        assert!(json.get("factory").is_none());
        assert_eq!(json["signature"].as_str().unwrap().len(), 2 + 130);
    }

    #[test]
    fn undeployed_accounts_send_factory_data() {
        let mut op = operation();
        op.init = Some(AccountInit::new(
            Address::repeat_byte(0x44),
            vec![0x01, 0x02].into(),
        ));
        let json = serde_json::to_value(RpcUserOperation::unsigned(&op)).unwrap();
        assert_eq!(json["factoryData"], "0x0102");
    }

    #[test]
    fn parses_sponsor_reply() {
        let reply = r#"{
            "paymaster": "0x4444444444444444444444444444444444444444",
            "paymasterData": "0xabcd",
            "paymasterVerificationGasLimit": "0x8000",
            "paymasterPostOpGasLimit": "0x1",
            "callGasLimit": "0x10000",
            "verificationGasLimit": "0x20000",
            "preVerificationGas": "0xb000"
        }"#;
        let sponsorship: Sponsorship = serde_json::from_str::<RpcSponsorship>(reply)
            .unwrap()
            .into();
        assert_eq!(sponsorship.paymaster, Address::repeat_byte(0x44));
        assert_eq!(sponsorship.gas.call_gas_limit, U256::from(0x10000));
    }

    #[test]
    fn parses_reverted_receipt() {
        let reply = r#"{
            "userOpHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "success": false,
            "reason": "ERC20: insufficient allowance",
            "actualGasCost": "0x10",
            "receipt": {
                "transactionHash": "0x2222222222222222222222222222222222222222222222222222222222222222",
                "blockNumber": "0x10"
            }
        }"#;
        let receipt: OperationReceipt = serde_json::from_str::<RpcOperationReceipt>(reply)
            .unwrap()
            .into();
        assert!(!receipt.success);
        assert_eq!(
            receipt.revert_reason.as_deref(),
            Some("ERC20: insufficient allowance")
        );
        assert_eq!(receipt.block.block_number, U64::from(16));
        assert_eq!(receipt.block.block_hash, None);
    }
}
