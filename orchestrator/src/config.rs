use std::time::Duration;

use account_core::{Address, AccountDeriver, ConfigurationError, ENTRY_POINT_V07};

use crate::retry::RetryPolicy;

/// Kernel factory `0xaac5D4240AF87249B3f71BC8E4A2cae074A3E419`
const KERNEL_FACTORY: Address = account_core::H160([
    0xaa, 0xc5, 0xd4, 0x24, 0x0a, 0xf8, 0x72, 0x49, 0xb3, 0xf7, 0x1b, 0xc8, 0xe4, 0xa2, 0xca, 0xe0,
    0x74, 0xa3, 0xe4, 0x19,
]);

/// Everything the orchestrator needs to know about the account protocol and
/// its timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Sponsor / project identifier
    pub project_id: Option<String>,
    /// Entry point contract
    pub entry_point: Address,
    /// Account factory
    pub factory: Address,
    /// Account implementation version
    pub account_version: String,
    /// Target chain
    pub chain_id: u64,
    /// Retry budget for relay and sponsor requests
    pub relay_retry: RetryPolicy,
    /// Length of one receipt wait
    pub receipt_timeout: Duration,
    /// Delay between receipt queries
    pub receipt_poll_interval: Duration,
    /// Receipt waits before a step is reported unconfirmed
    pub max_await_rounds: usize,
}

impl OrchestratorConfig {
    /// Defaults for Sepolia with the v0.7 entry point.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            entry_point: ENTRY_POINT_V07,
            factory: KERNEL_FACTORY,
            account_version: "0.3.1".into(),
            chain_id: 11155111,
            relay_retry: RetryPolicy::default(),
            receipt_timeout: Duration::from_secs(60),
            receipt_poll_interval: Duration::from_secs(2),
            max_await_rounds: 3,
        }
    }

    /// The deriver for accounts under this configuration
    pub fn deriver(&self) -> AccountDeriver {
        AccountDeriver::new(self.project_id.clone(), self.factory)
    }

    /// Check the configuration is usable. Called once at construction.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self.project_id.as_deref() {
            None | Some("") => return Err(ConfigurationError::MissingProjectId),
            Some(_) => {}
        }
        if self.account_version.is_empty() {
            return Err(ConfigurationError::MissingOption("accountVersion"));
        }
        if self.entry_point.is_zero() {
            return Err(ConfigurationError::MissingOption("entryPoint"));
        }
        if self.max_await_rounds == 0 {
            return Err(ConfigurationError::InvalidOption {
                option: "maxAwaitRounds",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(OrchestratorConfig::new("project").validate(), Ok(()));
    }

    #[test]
    fn missing_project_id_is_fatal() {
        let config = OrchestratorConfig {
            project_id: None,
            ..OrchestratorConfig::new("project")
        };
        assert_eq!(config.validate(), Err(ConfigurationError::MissingProjectId));
    }
}
