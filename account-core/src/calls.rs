//! ABI encoders and decoders for the handful of contract calls the account
//! layer needs: ERC-20 tokens, the swap router, the entry point, the account
//! factory and the account's own `execute`.

use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::id;

use crate::error::CallDecodeError;

/// Function signatures, used to derive selectors.
pub mod signatures {
    /// ERC-20 `approve`
    pub const APPROVE: &str = "approve(address,uint256)";
    /// ERC-20 `transfer`
    pub const TRANSFER: &str = "transfer(address,uint256)";
    /// Test-token `mint`
    pub const MINT: &str = "mint(address,uint256)";
    /// ERC-20 `balanceOf`
    pub const BALANCE_OF: &str = "balanceOf(address)";
    /// ERC-20 `decimals`
    pub const DECIMALS: &str = "decimals()";
    /// Router swap with a caller supplied minimum output
    pub const SWAP_EXACT: &str = "swapExact(address,address,uint256,uint256)";
    /// Router reserve for one token
    pub const GET_RESERVE: &str = "getReserve(address)";
    /// Entry point nonce query
    pub const GET_NONCE: &str = "getNonce(address,uint192)";
    /// Account single-call execution
    pub const EXECUTE: &str = "execute(bytes32,bytes)";
    /// Account factory deployment
    pub const CREATE_ACCOUNT: &str = "createAccount(address,uint256,bytes32)";
}

/// A single call made by the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleCall {
    /// Contract being called
    pub target: Address,
    /// Native value forwarded
    pub value: U256,
    /// Call data for the target
    pub data: Bytes,
}

/// Decoded token / router call, as understood by the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenCall {
    /// `approve(spender, amount)`
    Approve {
        /// Address allowed to spend
        spender: Address,
        /// Allowance
        amount: U256,
    },
    /// `transfer(to, amount)`
    Transfer {
        /// Recipient
        to: Address,
        /// Amount moved
        amount: U256,
    },
    /// `mint(to, amount)`
    Mint {
        /// Recipient
        to: Address,
        /// Amount minted
        amount: U256,
    },
    /// `swapExact(tokenIn, tokenOut, amountIn, minOut)`
    SwapExact {
        /// Token sold
        token_in: Address,
        /// Token bought
        token_out: Address,
        /// Amount sold
        amount_in: U256,
        /// Minimum acceptable output
        min_out: U256,
    },
}

fn encode_call(signature: &str, args: &[Token]) -> Bytes {
    let mut data = id(signature).to_vec();
    data.extend(abi::encode(args));
    data.into()
}

/// ERC-20 `approve(spender, amount)`
pub fn approve(spender: Address, amount: U256) -> Bytes {
    encode_call(
        signatures::APPROVE,
        &[Token::Address(spender), Token::Uint(amount)],
    )
}

/// ERC-20 `transfer(to, amount)`
pub fn transfer(to: Address, amount: U256) -> Bytes {
    encode_call(
        signatures::TRANSFER,
        &[Token::Address(to), Token::Uint(amount)],
    )
}

/// Test-token `mint(to, amount)`
pub fn mint(to: Address, amount: U256) -> Bytes {
    encode_call(signatures::MINT, &[Token::Address(to), Token::Uint(amount)])
}

/// ERC-20 `balanceOf(owner)`
pub fn balance_of(owner: Address) -> Bytes {
    encode_call(signatures::BALANCE_OF, &[Token::Address(owner)])
}

/// ERC-20 `decimals()`
pub fn decimals() -> Bytes {
    encode_call(signatures::DECIMALS, &[])
}

/// Router `swapExact(tokenIn, tokenOut, amountIn, minOut)`
pub fn swap_exact(token_in: Address, token_out: Address, amount_in: U256, min_out: U256) -> Bytes {
    encode_call(
        signatures::SWAP_EXACT,
        &[
            Token::Address(token_in),
            Token::Address(token_out),
            Token::Uint(amount_in),
            Token::Uint(min_out),
        ],
    )
}

/// Router `getReserve(token)`
pub fn get_reserve(token: Address) -> Bytes {
    encode_call(signatures::GET_RESERVE, &[Token::Address(token)])
}

/// Entry point `getNonce(sender, key)`
pub fn get_nonce(sender: Address, key: U256) -> Bytes {
    encode_call(
        signatures::GET_NONCE,
        &[Token::Address(sender), Token::Uint(key)],
    )
}

/// Factory `createAccount(owner, index, versionHash)`
pub fn create_account(owner: Address, index: U256, version_hash: H256) -> Bytes {
    encode_call(
        signatures::CREATE_ACCOUNT,
        &[
            Token::Address(owner),
            Token::Uint(index),
            Token::FixedBytes(version_hash.as_bytes().to_vec()),
        ],
    )
}

/// Account `execute(mode, target ‖ value ‖ data)` with the default
/// single-call mode (all zero).
pub fn execute(call: &SingleCall) -> Bytes {
    let mut packed = Vec::with_capacity(20 + 32 + call.data.len());
    packed.extend_from_slice(call.target.as_bytes());
    let mut value = [0u8; 32];
    call.value.to_big_endian(&mut value);
    packed.extend_from_slice(&value);
    packed.extend_from_slice(&call.data);
    encode_call(
        signatures::EXECUTE,
        &[Token::FixedBytes(vec![0u8; 32]), Token::Bytes(packed)],
    )
}

fn split_selector(data: &[u8]) -> Result<([u8; 4], &[u8]), CallDecodeError> {
    if data.len() < 4 {
        return Err(CallDecodeError::TooShort(data.len()));
    }
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&data[..4]);
    Ok((selector, &data[4..]))
}

fn decode_args(types: &[ParamType], args: &[u8]) -> Result<Vec<Token>, CallDecodeError> {
    abi::decode(types, args).map_err(|e| CallDecodeError::InvalidArguments(e.to_string()))
}

fn address_arg(token: Option<&Token>) -> Result<Address, CallDecodeError> {
    token
        .cloned()
        .and_then(Token::into_address)
        .ok_or_else(|| CallDecodeError::InvalidArguments("expected address".into()))
}

fn uint_arg(token: Option<&Token>) -> Result<U256, CallDecodeError> {
    token
        .cloned()
        .and_then(Token::into_uint)
        .ok_or_else(|| CallDecodeError::InvalidArguments("expected uint".into()))
}

/// Decode account `execute` call data back into the wrapped call.
pub fn decode_execute(data: &[u8]) -> Result<SingleCall, CallDecodeError> {
    let (selector, args) = split_selector(data)?;
    if selector != id(signatures::EXECUTE) {
        return Err(CallDecodeError::UnknownSelector(ethers::utils::hex::encode(
            selector,
        )));
    }
    let tokens = decode_args(&[ParamType::FixedBytes(32), ParamType::Bytes], args)?;
    let packed = tokens
        .get(1)
        .cloned()
        .and_then(Token::into_bytes)
        .ok_or_else(|| CallDecodeError::InvalidArguments("expected bytes".into()))?;
    if packed.len() < 52 {
        return Err(CallDecodeError::TooShort(packed.len()));
    }
    Ok(SingleCall {
        target: Address::from_slice(&packed[..20]),
        value: U256::from_big_endian(&packed[20..52]),
        data: packed[52..].to_vec().into(),
    })
}

/// Decode the token and router calls the planner emits.
pub fn decode_token_call(data: &[u8]) -> Result<TokenCall, CallDecodeError> {
    use ParamType::{Address as A, Uint};

    let (selector, args) = split_selector(data)?;
    if selector == id(signatures::APPROVE) {
        let tokens = decode_args(&[A, Uint(256)], args)?;
        Ok(TokenCall::Approve {
            spender: address_arg(tokens.first())?,
            amount: uint_arg(tokens.get(1))?,
        })
    } else if selector == id(signatures::TRANSFER) {
        let tokens = decode_args(&[A, Uint(256)], args)?;
        Ok(TokenCall::Transfer {
            to: address_arg(tokens.first())?,
            amount: uint_arg(tokens.get(1))?,
        })
    } else if selector == id(signatures::MINT) {
        let tokens = decode_args(&[A, Uint(256)], args)?;
        Ok(TokenCall::Mint {
            to: address_arg(tokens.first())?,
            amount: uint_arg(tokens.get(1))?,
        })
    } else if selector == id(signatures::SWAP_EXACT) {
        let tokens = decode_args(&[A, A, Uint(256), Uint(256)], args)?;
        Ok(TokenCall::SwapExact {
            token_in: address_arg(tokens.first())?,
            token_out: address_arg(tokens.get(1))?,
            amount_in: uint_arg(tokens.get(2))?,
            min_out: uint_arg(tokens.get(3))?,
        })
    } else {
        Err(CallDecodeError::UnknownSelector(ethers::utils::hex::encode(
            selector,
        )))
    }
}

/// Decode a single `uint256` return value.
pub fn decode_uint(output: &[u8]) -> Result<U256, CallDecodeError> {
    let tokens = decode_args(&[ParamType::Uint(256)], output)?;
    uint_arg(tokens.first())
}
