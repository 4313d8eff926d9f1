use ethers::abi::{self, Token};
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::{get_create2_address_from_hash, keccak256};

use crate::calls;
use crate::error::ConfigurationError;
use crate::types::AccountInit;

/// Deterministic mapping from an owner address to its smart account address.
///
/// Derivation is CREATE2 content addressing over the owner, the account
/// index and the implementation version, so the same inputs always yield the
/// same address, in any process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDeriver {
    project_id: Option<String>,
    factory: Address,
    index: U256,
}

impl AccountDeriver {
    /// A deriver for accounts deployed by `factory`. `project_id` is the
    /// sponsor identifier the accounts will be used under.
    pub fn new(project_id: Option<String>, factory: Address) -> Self {
        Self {
            project_id,
            factory,
            index: U256::zero(),
        }
    }

    /// Use a non-default account index, for owners holding several accounts.
    pub fn with_index(mut self, index: U256) -> Self {
        self.index = index;
        self
    }

    /// The factory accounts are deployed through
    pub fn factory(&self) -> Address {
        self.factory
    }

    fn version_hash(protocol_version: &str) -> H256 {
        keccak256(protocol_version.as_bytes()).into()
    }

    fn salt(&self, owner: Address, protocol_version: &str) -> [u8; 32] {
        keccak256(abi::encode(&[
            Token::Address(owner),
            Token::Uint(self.index),
            Token::FixedBytes(Self::version_hash(protocol_version).as_bytes().to_vec()),
        ]))
    }

    fn init_code_hash(protocol_version: &str, entry_point: Address) -> [u8; 32] {
        keccak256(abi::encode(&[
            Token::Address(entry_point),
            Token::FixedBytes(Self::version_hash(protocol_version).as_bytes().to_vec()),
        ]))
    }

    fn check_configuration(&self, protocol_version: &str) -> Result<(), ConfigurationError> {
        match self.project_id.as_deref() {
            None | Some("") => return Err(ConfigurationError::MissingProjectId),
            Some(_) => {}
        }
        if protocol_version.is_empty() {
            return Err(ConfigurationError::MissingOption("accountVersion"));
        }
        if self.factory.is_zero() {
            return Err(ConfigurationError::MissingOption("factory"));
        }
        Ok(())
    }

    /// Derive the account address for `owner`.
    pub fn derive(
        &self,
        owner: Address,
        protocol_version: &str,
        entry_point: Address,
    ) -> Result<Address, ConfigurationError> {
        self.check_configuration(protocol_version)?;
        Ok(get_create2_address_from_hash(
            self.factory,
            self.salt(owner, protocol_version),
            Self::init_code_hash(protocol_version, entry_point),
        ))
    }

    /// Factory call that deploys the account [`Self::derive`] returns.
    pub fn account_init(&self, owner: Address, protocol_version: &str) -> AccountInit {
        let factory_data: Bytes =
            calls::create_account(owner, self.index, Self::version_hash(protocol_version));
        AccountInit::new(self.factory, factory_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ENTRY_POINT_V07;

    fn deriver() -> AccountDeriver {
        AccountDeriver::new(Some("project".into()), Address::repeat_byte(0xfa))
    }

    #[test]
    fn derivation_is_deterministic() {
        let owner = Address::random();
        let a = deriver().derive(owner, "0.3.1", ENTRY_POINT_V07).unwrap();
        let b = deriver().derive(owner, "0.3.1", ENTRY_POINT_V07).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn derivation_depends_on_every_input() {
        let owner = Address::random();
        let base = deriver().derive(owner, "0.3.1", ENTRY_POINT_V07).unwrap();

        assert_ne!(
            base,
            deriver().derive(Address::random(), "0.3.1", ENTRY_POINT_V07).unwrap()
        );
        assert_ne!(base, deriver().derive(owner, "0.3.0", ENTRY_POINT_V07).unwrap());
        assert_ne!(
            base,
            deriver()
                .derive(owner, "0.3.1", Address::repeat_byte(0x01))
                .unwrap()
        );
        assert_ne!(
            base,
            deriver()
                .with_index(U256::one())
                .derive(owner, "0.3.1", ENTRY_POINT_V07)
                .unwrap()
        );
    }

    #[test]
    fn missing_project_id_is_a_configuration_error() {
        let deriver = AccountDeriver::new(None, Address::repeat_byte(0xfa));
        assert_eq!(
            deriver.derive(Address::random(), "0.3.1", ENTRY_POINT_V07),
            Err(ConfigurationError::MissingProjectId)
        );

        let deriver = AccountDeriver::new(Some(String::new()), Address::repeat_byte(0xfa));
        assert_eq!(
            deriver.derive(Address::random(), "0.3.1", ENTRY_POINT_V07),
            Err(ConfigurationError::MissingProjectId)
        );
    }

    #[test]
    fn zero_factory_is_rejected() {
        let deriver = AccountDeriver::new(Some("project".into()), Address::zero());
        assert_eq!(
            deriver.derive(Address::random(), "0.3.1", ENTRY_POINT_V07),
            Err(ConfigurationError::MissingOption("factory"))
        );
    }

    #[test]
    fn account_init_targets_factory() {
        let owner = Address::random();
        let init = deriver().account_init(owner, "0.3.1");
        assert_eq!(init.factory, Address::repeat_byte(0xfa));
        assert_eq!(init.factory_data.len(), 4 + 3 * 32);
    }
}
