use ethers::types::Address;

/// Result of a ledger read.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// A required configuration value is missing or malformed. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// The project / sponsor identifier was not provided
    #[error("Missing project (sponsor) identifier")]
    MissingProjectId,
    /// A required option was not provided and has no default
    #[error("Missing required option `{0}`")]
    MissingOption(&'static str),
    /// An option was provided but could not be parsed
    #[error("Invalid value for `{option}`: {reason}")]
    InvalidOption {
        /// Name of the offending option
        option: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// An error returned by the owner's signing capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    /// The user refused to sign
    #[error("User declined to sign")]
    UserDeclined,
    /// The signing device or key store could not be reached
    #[error("Signer unavailable: {0}")]
    SignerUnavailable(String),
}

/// A structured rejection `{code, message}` as returned by relay and sponsor
/// endpoints.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("code {code}: {message}")]
pub struct Rejection {
    /// Endpoint specific error code
    pub code: i64,
    /// Human readable reason
    pub message: String,
}

impl Rejection {
    /// Construct a rejection
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Errors from the relayer (bundler) interface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// Timeout, connection reset or similar. May be retried.
    #[error("Relay transport failure: {0}")]
    Transport(String),
    /// The relay understood the request and refused it.
    #[error("Relay rejected operation: {0}")]
    Rejected(Rejection),
    /// The relay answered with something we could not decode
    #[error("Malformed relay response: {0}")]
    MalformedResponse(String),
}

/// Errors from the sponsor (paymaster) interface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SponsorError {
    /// Timeout, connection reset or similar. May be retried.
    #[error("Sponsor transport failure: {0}")]
    Transport(String),
    /// The sponsor declined, typically for policy reasons
    #[error("Sponsor declined operation: {0}")]
    Rejected(Rejection),
    /// The sponsor answered with something we could not decode
    #[error("Malformed sponsor response: {0}")]
    MalformedResponse(String),
}

/// Errors from the ledger read interface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Timeout, connection reset or similar. May be retried.
    #[error("Ledger transport failure: {0}")]
    Transport(String),
    /// The node returned an error for the call
    #[error("Ledger call to {target:?} failed: {message}")]
    CallFailed {
        /// Contract that was called
        target: Address,
        /// Node supplied message
        message: String,
    },
    /// The call succeeded but the returned data could not be decoded
    #[error("Could not decode ledger response: {0}")]
    Decode(String),
}

/// Failure to decode ABI encoded call data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallDecodeError {
    /// Call data shorter than a selector
    #[error("Call data too short ({0} bytes)")]
    TooShort(usize),
    /// Selector did not match any known function
    #[error("Unknown selector 0x{0}")]
    UnknownSelector(String),
    /// Arguments could not be decoded
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

/// A human readable amount could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid amount `{amount}`: {reason}")]
pub struct AmountError {
    /// The offending input
    pub amount: String,
    /// Conversion failure
    pub reason: String,
}
