//! Settings for the smart-account client.
//!
//! Settings are loaded in three layers, later ones overriding earlier ones:
//!
//! 1. `./config/*.json`, if the directory exists
//! 2. the comma separated list of json files in `CONFIG_FILES`
//! 3. environment variables prefixed with `SA_`, nested with `__`
//!    (e.g. `SA_PROJECTID`, `SA_TRACING__LEVEL`)
//!
//! Keys are case-insensitive. Everything except the project identifier has a
//! default; relay and sponsor endpoints are derived from the project
//! identifier when not given.

use std::{str::FromStr, time::Duration};

use account_core::{Address, ConfigurationError, ENTRY_POINT_V07, H160, H256};
use serde::Deserialize;
use url::Url;

pub use loader::load_settings;
pub use trace::{Level, Style, TracingConfig};

mod loader;
mod trace;

/// Chain id of the Sepolia test network
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;
/// Default kernel account implementation version
pub const DEFAULT_ACCOUNT_VERSION: &str = "0.3.1";
/// Default kernel factory, `0xaac5D4240AF87249B3f71BC8E4A2cae074A3E419`
pub const DEFAULT_FACTORY: Address = H160([
    0xaa, 0xc5, 0xd4, 0x24, 0x0a, 0xf8, 0x72, 0x49, 0xb3, 0xf7, 0x1b, 0xc8, 0xe4, 0xa2, 0xca, 0xe0,
    0x74, 0xa3, 0xe4, 0x19,
]);

const ZERODEV_API: &str = "https://rpc.zerodev.app/api/v3";
const DEFAULT_LEDGER_URL: &str = "https://rpc.sepolia.org";
const DEFAULT_EXPLORER_URL: &str = "https://sepolia.etherscan.io";

const DEFAULT_RELAY_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_MAX_RELAY_ATTEMPTS: usize = 3;
const DEFAULT_BASE_RETRY_MS: u64 = 250;
const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_RECEIPT_POLL_INTERVAL_MS: u64 = 2_000;
const DEFAULT_MAX_AWAIT_ROUNDS: usize = 3;

/// Settings as they come out of the config sources. Every field is optional
/// here; [`RawSettings::parse`] applies defaults and validates.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSettings {
    #[serde(alias = "projectid")]
    pub project_id: Option<String>,
    #[serde(alias = "relayurl")]
    pub relay_url: Option<String>,
    #[serde(alias = "sponsorurl")]
    pub sponsor_url: Option<String>,
    #[serde(alias = "ledgerurl")]
    pub ledger_url: Option<String>,
    #[serde(alias = "entrypoint")]
    pub entry_point: Option<String>,
    #[serde(alias = "accountversion")]
    pub account_version: Option<String>,
    pub factory: Option<String>,
    #[serde(alias = "chainid")]
    pub chain_id: Option<u64>,
    #[serde(alias = "explorerurl")]
    pub explorer_url: Option<String>,
    #[serde(alias = "relaytimeoutms")]
    pub relay_timeout_ms: Option<u64>,
    #[serde(alias = "maxrelayattempts")]
    pub max_relay_attempts: Option<usize>,
    #[serde(alias = "baseretryms")]
    pub base_retry_ms: Option<u64>,
    #[serde(alias = "receipttimeoutsecs")]
    pub receipt_timeout_secs: Option<u64>,
    #[serde(alias = "receiptpollintervalms")]
    pub receipt_poll_interval_ms: Option<u64>,
    #[serde(alias = "maxawaitrounds")]
    pub max_await_rounds: Option<usize>,
    #[serde(default)]
    pub tracing: TracingConfig,
}

/// Validated settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Sponsor / project identifier
    pub project_id: String,
    /// Bundler JSON-RPC endpoint
    pub relay_url: Url,
    /// Paymaster JSON-RPC endpoint
    pub sponsor_url: Url,
    /// Node JSON-RPC endpoint for ledger reads
    pub ledger_url: Url,
    /// Entry point contract
    pub entry_point: Address,
    /// Account implementation version
    pub account_version: String,
    /// Account factory
    pub factory: Address,
    /// Target chain
    pub chain_id: u64,
    /// Block explorer base url
    pub explorer_url: Url,
    /// Timeout for a single relay or sponsor request
    pub relay_timeout: Duration,
    /// Attempts per relay or sponsor request, including the first
    pub max_relay_attempts: usize,
    /// Backoff before the first retry; doubles on every further retry
    pub base_retry: Duration,
    /// How long a single wait for a receipt may take
    pub receipt_timeout: Duration,
    /// Delay between receipt queries
    pub receipt_poll_interval: Duration,
    /// Receipt waits before an operation is reported as unconfirmed
    pub max_await_rounds: usize,
    /// Log output
    pub tracing: TracingConfig,
}

fn parse_url(option: &'static str, value: &str) -> Result<Url, ConfigurationError> {
    Url::parse(value).map_err(|e| ConfigurationError::InvalidOption {
        option,
        reason: e.to_string(),
    })
}

fn parse_address(option: &'static str, value: &str) -> Result<Address, ConfigurationError> {
    Address::from_str(value).map_err(|e| ConfigurationError::InvalidOption {
        option,
        reason: e.to_string(),
    })
}

fn at_least_one(option: &'static str, value: usize) -> Result<usize, ConfigurationError> {
    if value == 0 {
        return Err(ConfigurationError::InvalidOption {
            option,
            reason: "must be at least 1".into(),
        });
    }
    Ok(value)
}

impl RawSettings {
    /// Settings carrying only a project id; everything else defaults.
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            ..Default::default()
        }
    }

    /// Apply defaults and validate.
    pub fn parse(self) -> Result<Settings, ConfigurationError> {
        let project_id = self
            .project_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigurationError::MissingProjectId)?;
        let chain_id = self.chain_id.unwrap_or(SEPOLIA_CHAIN_ID);
        let default_relay = format!("{ZERODEV_API}/{project_id}/chain/{chain_id}");

        let relay_url = parse_url("relayUrl", self.relay_url.as_deref().unwrap_or(&default_relay))?;
        let sponsor_url = match self.sponsor_url.as_deref() {
            Some(url) => parse_url("sponsorUrl", url)?,
            None => parse_url("sponsorUrl", &format!("{default_relay}?selfFunded=true"))?,
        };
        let ledger_url = parse_url(
            "ledgerUrl",
            self.ledger_url.as_deref().unwrap_or(DEFAULT_LEDGER_URL),
        )?;
        let explorer_url = parse_url(
            "explorerUrl",
            self.explorer_url.as_deref().unwrap_or(DEFAULT_EXPLORER_URL),
        )?;

        let entry_point = match self.entry_point.as_deref() {
            Some(addr) => parse_address("entryPoint", addr)?,
            None => ENTRY_POINT_V07,
        };
        let factory = match self.factory.as_deref() {
            Some(addr) => parse_address("factory", addr)?,
            None => DEFAULT_FACTORY,
        };
        let account_version = self
            .account_version
            .unwrap_or_else(|| DEFAULT_ACCOUNT_VERSION.to_owned());
        if account_version.is_empty() {
            return Err(ConfigurationError::MissingOption("accountVersion"));
        }

        Ok(Settings {
            project_id,
            relay_url,
            sponsor_url,
            ledger_url,
            entry_point,
            account_version,
            factory,
            chain_id,
            explorer_url,
            relay_timeout: Duration::from_millis(
                self.relay_timeout_ms.unwrap_or(DEFAULT_RELAY_TIMEOUT_MS),
            ),
            max_relay_attempts: at_least_one(
                "maxRelayAttempts",
                self.max_relay_attempts
                    .unwrap_or(DEFAULT_MAX_RELAY_ATTEMPTS),
            )?,
            base_retry: Duration::from_millis(self.base_retry_ms.unwrap_or(DEFAULT_BASE_RETRY_MS)),
            receipt_timeout: Duration::from_secs(
                self.receipt_timeout_secs
                    .unwrap_or(DEFAULT_RECEIPT_TIMEOUT_SECS),
            ),
            receipt_poll_interval: Duration::from_millis(
                self.receipt_poll_interval_ms
                    .unwrap_or(DEFAULT_RECEIPT_POLL_INTERVAL_MS),
            ),
            max_await_rounds: at_least_one(
                "maxAwaitRounds",
                self.max_await_rounds.unwrap_or(DEFAULT_MAX_AWAIT_ROUNDS),
            )?,
            tracing: self.tracing,
        })
    }
}

impl Settings {
    /// Explorer page for a ledger transaction.
    pub fn explorer_tx_url(&self, transaction_hash: H256) -> String {
        format!(
            "{}/tx/{:?}",
            self.explorer_url.as_str().trim_end_matches('/'),
            transaction_hash
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_id_is_fatal() {
        assert_eq!(
            RawSettings::default().parse(),
            Err(ConfigurationError::MissingProjectId)
        );
        assert_eq!(
            RawSettings::for_project("  ").parse(),
            Err(ConfigurationError::MissingProjectId)
        );
    }

    #[test]
    fn endpoints_default_from_project_id() {
        let settings = RawSettings::for_project("abc").parse().unwrap();
        assert_eq!(
            settings.relay_url.as_str(),
            "https://rpc.zerodev.app/api/v3/abc/chain/11155111"
        );
        assert_eq!(
            settings.sponsor_url.as_str(),
            "https://rpc.zerodev.app/api/v3/abc/chain/11155111?selfFunded=true"
        );
        assert_eq!(settings.ledger_url.as_str(), "https://rpc.sepolia.org/");
        assert_eq!(settings.entry_point, ENTRY_POINT_V07);
        assert_eq!(settings.factory, DEFAULT_FACTORY);
        assert_eq!(settings.max_relay_attempts, 3);
        assert_eq!(settings.receipt_timeout, Duration::from_secs(60));
    }

    #[test]
    fn explicit_values_win() {
        let raw = RawSettings {
            relay_url: Some("http://localhost:4337".into()),
            chain_id: Some(31337),
            entry_point: Some("0x1111111111111111111111111111111111111111".into()),
            ..RawSettings::for_project("abc")
        };
        let settings = raw.parse().unwrap();
        assert_eq!(settings.relay_url.as_str(), "http://localhost:4337/");
        assert!(settings.sponsor_url.as_str().contains("/chain/31337"));
        assert_eq!(settings.entry_point, Address::repeat_byte(0x11));
    }

    #[test]
    fn malformed_values_are_rejected() {
        let raw = RawSettings {
            factory: Some("not an address".into()),
            ..RawSettings::for_project("abc")
        };
        assert!(matches!(
            raw.parse(),
            Err(ConfigurationError::InvalidOption {
                option: "factory",
                ..
            })
        ));

        let raw = RawSettings {
            max_relay_attempts: Some(0),
            ..RawSettings::for_project("abc")
        };
        assert!(raw.parse().is_err());
    }

    #[test]
    fn explorer_links() {
        let settings = RawSettings::for_project("abc").parse().unwrap();
        let link = settings.explorer_tx_url(H256::repeat_byte(0xab));
        assert!(link.starts_with("https://sepolia.etherscan.io/tx/0xabab"));
    }
}
