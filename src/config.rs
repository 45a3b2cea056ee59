//! Protocol and ledger configuration.

use crate::{
    errors::{CallerError, Result},
    parallel::default_worker_count,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::error;

/// Slots of shared randomness per organization pair and epoch.
pub const DEFAULT_MAX_NUM_TX_IN_EPOCH: usize = 1024;
/// Length in bytes of an epoch pseudonym.
pub const DEFAULT_PSEUDONYM_LEN: usize = 32;
const DEFAULT_LEDGER_MAX_RETRIES: usize = 3;
const DEFAULT_LEDGER_RETRY_DELAY_MS: u64 = 1000;

/// Parameters of one audit deployment. Every committee, auditor and
/// organization taking part in an epoch must use the same values.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Maximum number of transactions per organization pair in one epoch.
    pub max_num_tx_in_epoch: usize,
    /// Length of the random epoch pseudonyms.
    pub pseudonym_len: usize,
    /// Threads used for bulk hiding and batch verification.
    pub worker_count: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig {
            max_num_tx_in_epoch: DEFAULT_MAX_NUM_TX_IN_EPOCH,
            pseudonym_len: DEFAULT_PSEUDONYM_LEN,
            worker_count: default_worker_count(),
        }
    }
}

impl ProtocolConfig {
    /// Parse a JSON configuration, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            error!("Failed to parse protocol configuration: {e}");
            CallerError::BadInput
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the protocol cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_num_tx_in_epoch == 0 {
            error!("max_num_tx_in_epoch must be positive");
            Err(CallerError::BadInput)?
        }
        // shorter pseudonyms make the hash-to-point terms guessable
        if self.pseudonym_len < 16 {
            error!(
                "pseudonym_len must be at least 16 bytes, got {}",
                self.pseudonym_len
            );
            Err(CallerError::BadInput)?
        }
        if self.worker_count == 0 {
            error!("worker_count must be positive");
            Err(CallerError::BadInput)?
        }
        Ok(())
    }
}

/// Retry policy for writes to the external ledger.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Attempts per record before giving up.
    pub max_retries: usize,
    /// Fixed pause between attempts.
    pub retry_delay_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            max_retries: DEFAULT_LEDGER_MAX_RETRIES,
            retry_delay_ms: DEFAULT_LEDGER_RETRY_DELAY_MS,
        }
    }
}

impl LedgerConfig {
    /// The pause between attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Reject a policy that would never attempt a write.
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            error!("max_retries must be positive");
            Err(CallerError::BadInput)?
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::InternalError;

    #[test]
    fn missing_fields_take_defaults() {
        let config = ProtocolConfig::from_json(r#"{"pseudonym_len": 64}"#).unwrap();
        assert_eq!(config.max_num_tx_in_epoch, DEFAULT_MAX_NUM_TX_IN_EPOCH);
        assert_eq!(config.pseudonym_len, 64);
        assert!(config.worker_count >= 1);

        let ledger: LedgerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(ledger, LedgerConfig::default());
        assert_eq!(ledger.retry_delay(), Duration::from_secs(1));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_input = InternalError::CallingApplicationMistake(CallerError::BadInput);
        assert_eq!(
            ProtocolConfig::from_json(r#"{"max_num_tx_in_epoch": 0}"#).unwrap_err(),
            bad_input
        );
        assert_eq!(
            ProtocolConfig::from_json(r#"{"pseudonym_len": 8}"#).unwrap_err(),
            bad_input
        );
        assert_eq!(
            ProtocolConfig::from_json("not json").unwrap_err(),
            bad_input
        );
        let ledger = LedgerConfig {
            max_retries: 0,
            ..Default::default()
        };
        assert_eq!(ledger.validate().unwrap_err(), bad_input);
    }
}
