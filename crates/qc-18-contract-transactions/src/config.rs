//! # Engine Configuration
//!
//! Admission limits, fuel parameters and the protocol upgrade schedule.
//!
//! All limits have sane defaults with override capability, either by struct
//! update or from JSON via [`EngineConfig::from_json_str`].

use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON did not parse.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Fee bounds are inverted.
    #[error("min_tx_fee {min} exceeds max_tx_fee {max}")]
    InvertedFeeBounds {
        /// Lower bound.
        min: u64,
        /// Upper bound.
        max: u64,
    },

    /// VM would never be allowed to run.
    #[error("max_run_steps must be non-zero")]
    ZeroRunSteps,

    /// Native symbol missing.
    #[error("fee_symbol must not be empty")]
    EmptyFeeSymbol,
}

/// Protocol generations that change admission rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProtocolVersion {
    /// Initial rules.
    Genesis,
    /// Relay fee floor enforced on contract transactions.
    RelayFloor,
}

/// Protocol context threaded through admission checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolContext {
    /// Height being checked.
    pub height: u32,
    /// Active protocol version at that height.
    pub version: ProtocolVersion,
}

impl ProtocolContext {
    /// Returns true if the relay fee floor applies.
    #[must_use]
    pub fn relay_floor_active(&self) -> bool {
        self.version >= ProtocolVersion::RelayFloor
    }
}

/// Heights at which protocol versions activate.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProtocolSchedule {
    /// First height enforcing the relay fee floor.
    pub relay_floor_height: u32,
}

impl Default for ProtocolSchedule {
    fn default() -> Self {
        Self {
            relay_floor_height: 2_000_000,
        }
    }
}

impl ProtocolSchedule {
    /// Protocol context in force at `height`.
    #[must_use]
    pub fn context_at(&self, height: u32) -> ProtocolContext {
        let version = if height >= self.relay_floor_height {
            ProtocolVersion::RelayFloor
        } else {
            ProtocolVersion::Genesis
        };
        ProtocolContext { height, version }
    }
}

/// Contract transaction engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Symbol fees and transfers are paid in.
    pub fee_symbol: String,
    /// Lowest acceptable fee.
    pub min_tx_fee: u64,
    /// Highest acceptable fee.
    pub max_tx_fee: u64,
    /// Invoke argument size limit.
    pub max_argument_bytes: usize,
    /// Deploy code size limit.
    pub max_contract_code_size: usize,
    /// Deploy memo size limit.
    pub max_contract_memo_size: usize,
    /// Fuel units charged for every invoke.
    pub invoke_base_fuel: u64,
    /// Hard cap on VM steps per invoke.
    pub max_run_steps: u64,
    /// Relay floor, in fee units per 1000 serialized bytes.
    pub min_relay_fee_per_kb: u64,
    /// Maximum distance between a transaction's valid height and the block.
    pub valid_height_window: u32,
    /// Upgrade schedule.
    pub protocol: ProtocolSchedule,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fee_symbol: "QC".to_string(),
            min_tx_fee: 1,
            max_tx_fee: 21_000_000 * 100_000_000,
            max_argument_bytes: 4 * 1024,
            max_contract_code_size: 64 * 1024,
            max_contract_memo_size: 100,
            invoke_base_fuel: 100,
            max_run_steps: 12_000_000,
            min_relay_fee_per_kb: 1_000,
            valid_height_window: 250,
            protocol: ProtocolSchedule::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a JSON document; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Parse failures or any [`EngineConfig::validate`] failure.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_tx_fee > self.max_tx_fee {
            return Err(ConfigError::InvertedFeeBounds {
                min: self.min_tx_fee,
                max: self.max_tx_fee,
            });
        }
        if self.max_run_steps == 0 {
            return Err(ConfigError::ZeroRunSteps);
        }
        if self.fee_symbol.is_empty() {
            return Err(ConfigError::EmptyFeeSymbol);
        }
        Ok(())
    }
}
