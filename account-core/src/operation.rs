use ethers::abi::{self, Token};
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};

use crate::calls::{self, SingleCall};
use crate::types::{AccountInit, GasFees, GasLimits, Sponsorship};

/// An operation executed through the smart account.
///
/// Built unsigned by the operation builder, enriched with sponsorship, then
/// frozen into a [`SignedOperation`] once a signature is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// The smart account executing the call
    pub sender: Address,
    /// Contract the account calls
    pub target: Address,
    /// Call data for the target
    pub calldata: Bytes,
    /// Native value forwarded with the call
    pub value: U256,
    /// Account nonce
    pub nonce: U256,
    /// Deployment data when the account has no code yet
    pub init: Option<AccountInit>,
    /// Gas limits, set from the sponsor's estimate
    pub gas: GasLimits,
    /// Fee caps
    pub fees: GasFees,
    /// Sponsorship metadata, once the sponsor accepted the operation
    pub sponsorship: Option<Sponsorship>,
    /// Owner signature
    pub signature: Option<Bytes>,
}

fn pack_u128_pair(high: U256, low: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[..16].copy_from_slice(&high.low_u128().to_be_bytes());
    out[16..].copy_from_slice(&low.low_u128().to_be_bytes());
    out
}

impl Operation {
    /// A fresh, unsigned and unsponsored operation.
    pub fn new(sender: Address, target: Address, calldata: Bytes, value: U256, nonce: U256) -> Self {
        Self {
            sender,
            target,
            calldata,
            value,
            nonce,
            init: None,
            gas: GasLimits::default(),
            fees: GasFees::default(),
            sponsorship: None,
            signature: None,
        }
    }

    /// Attach sponsorship metadata. The sponsor's gas estimate replaces the
    /// operation's gas limits.
    pub fn with_sponsorship(mut self, sponsorship: Sponsorship) -> Self {
        self.gas = sponsorship.gas;
        self.sponsorship = Some(sponsorship);
        self
    }

    /// Call data executed by the account: the target call wrapped in `execute`.
    pub fn account_call_data(&self) -> Bytes {
        calls::execute(&SingleCall {
            target: self.target,
            value: self.value,
            data: self.calldata.clone(),
        })
    }

    /// `factory ‖ factoryData`, or empty when the account is deployed.
    pub fn init_code(&self) -> Bytes {
        match &self.init {
            Some(init) => {
                let mut code = init.factory.as_bytes().to_vec();
                code.extend_from_slice(&init.factory_data);
                code.into()
            }
            None => Bytes::default(),
        }
    }

    /// `paymaster ‖ uint128 verificationGas ‖ uint128 postOpGas ‖ paymasterData`,
    /// or empty when unsponsored.
    pub fn paymaster_and_data(&self) -> Bytes {
        match &self.sponsorship {
            Some(s) => {
                let mut out = s.paymaster.as_bytes().to_vec();
                out.extend_from_slice(&s.paymaster_verification_gas_limit.low_u128().to_be_bytes());
                out.extend_from_slice(&s.paymaster_post_op_gas_limit.low_u128().to_be_bytes());
                out.extend_from_slice(&s.paymaster_data);
                out.into()
            }
            None => Bytes::default(),
        }
    }

    /// Hash of the packed operation, excluding the signature.
    pub fn packed_hash(&self) -> H256 {
        let encoded = abi::encode(&[
            Token::Address(self.sender),
            Token::Uint(self.nonce),
            Token::FixedBytes(keccak256(self.init_code()).to_vec()),
            Token::FixedBytes(keccak256(self.account_call_data()).to_vec()),
            Token::FixedBytes(
                pack_u128_pair(self.gas.verification_gas_limit, self.gas.call_gas_limit).to_vec(),
            ),
            Token::Uint(self.gas.pre_verification_gas),
            Token::FixedBytes(
                pack_u128_pair(self.fees.max_priority_fee_per_gas, self.fees.max_fee_per_gas)
                    .to_vec(),
            ),
            Token::FixedBytes(keccak256(self.paymaster_and_data()).to_vec()),
        ]);
        keccak256(encoded).into()
    }

    /// Content hash identifying the operation for a given entry point and chain.
    /// This is the digest the owner signs.
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> H256 {
        let encoded = abi::encode(&[
            Token::FixedBytes(self.packed_hash().as_bytes().to_vec()),
            Token::Address(entry_point),
            Token::Uint(chain_id.into()),
        ]);
        keccak256(encoded).into()
    }
}

/// A signed operation. Immutable: the fields can only be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedOperation {
    operation: Operation,
    hash: H256,
}

impl SignedOperation {
    /// Freeze `operation` with `signature`. `hash` must be the digest the
    /// signature was produced over.
    pub fn new(mut operation: Operation, signature: Bytes, hash: H256) -> Self {
        operation.signature = Some(signature);
        Self { operation, hash }
    }

    /// The underlying operation
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Content hash of the operation
    pub fn hash(&self) -> H256 {
        self.hash
    }

    /// The owner signature
    pub fn signature(&self) -> Bytes {
        self.operation.signature.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ENTRY_POINT_V07;

    fn operation() -> Operation {
        Operation::new(
            Address::repeat_byte(0x11),
            Address::repeat_byte(0x22),
            calls::approve(Address::repeat_byte(0x33), U256::from(100)),
            U256::zero(),
            U256::from(4),
        )
    }

    fn sponsorship() -> Sponsorship {
        Sponsorship::new(
            Address::repeat_byte(0x44),
            vec![0xaa, 0xbb].into(),
            U256::from(50_000),
            U256::from(10_000),
            GasLimits {
                call_gas_limit: U256::from(100_000),
                verification_gas_limit: U256::from(200_000),
                pre_verification_gas: U256::from(45_000),
            },
        )
    }

    #[test]
    fn hash_is_deterministic() {
        let op = operation();
        assert_eq!(
            op.hash(ENTRY_POINT_V07, 11155111),
            op.clone().hash(ENTRY_POINT_V07, 11155111)
        );
    }

    #[test]
    fn hash_binds_nonce_chain_and_entry_point() {
        let op = operation();
        let base = op.hash(ENTRY_POINT_V07, 11155111);

        let mut bumped = op.clone();
        bumped.nonce = U256::from(5);
        assert_ne!(base, bumped.hash(ENTRY_POINT_V07, 11155111));
        assert_ne!(base, op.hash(ENTRY_POINT_V07, 1));
        assert_ne!(base, op.hash(Address::repeat_byte(0x01), 11155111));
    }

    #[test]
    fn sponsorship_changes_hash_and_gas() {
        let op = operation();
        let sponsored = op.clone().with_sponsorship(sponsorship());
        assert_eq!(sponsored.gas.call_gas_limit, U256::from(100_000));
        assert_ne!(
            op.hash(ENTRY_POINT_V07, 11155111),
            sponsored.hash(ENTRY_POINT_V07, 11155111)
        );
    }

    #[test]
    fn signature_does_not_change_hash() {
        let op = operation().with_sponsorship(sponsorship());
        let hash = op.hash(ENTRY_POINT_V07, 11155111);
        let signed = SignedOperation::new(op.clone(), vec![1u8; 65].into(), hash);
        assert_eq!(signed.operation().hash(ENTRY_POINT_V07, 11155111), hash);
        assert_eq!(signed.signature().len(), 65);
    }

    #[test]
    fn paymaster_and_data_layout() {
        let op = operation().with_sponsorship(sponsorship());
        let pnd = op.paymaster_and_data();
        assert_eq!(pnd.len(), 20 + 16 + 16 + 2);
        assert_eq!(&pnd[..20], Address::repeat_byte(0x44).as_bytes());
        assert_eq!(&pnd[52..], &[0xaa, 0xbb]);
    }

    #[test]
    fn init_code_is_empty_for_deployed_accounts() {
        let mut op = operation();
        assert!(op.init_code().is_empty());
        op.init = Some(AccountInit::new(Address::repeat_byte(0x55), vec![0x01].into()));
        assert_eq!(op.init_code().len(), 21);
    }
}
