//! src/config.rs
//!
//! @description
//! Orchestrator configuration. `Config` is the YAML document as written by
//! an operator; `Config::validate` turns it into `Settings`, the typed form
//! every operation reads through its `Context`.

use std::str::FromStr;
use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::Commitment;
use crate::retry::RetryPolicy;

fn default_program_id() -> String {
    aces_table::ID.to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    2_000
}

fn default_finalization_timeout_ms() -> u64 {
    30_000
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_program_id")]
    pub program_id: String,
    /// Cluster the program's MXE is bound to.
    pub cluster_offset: u32,
    #[serde(default)]
    pub commitment: Commitment,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default = "default_finalization_timeout_ms")]
    pub finalization_timeout_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("{field} is not a valid address: {value}")]
    InvalidPubkey { field: &'static str, value: String },
    #[error("program_id {configured} does not match the linked program {expected}")]
    ProgramMismatch { configured: Pubkey, expected: Pubkey },
    #[error("{field} must be > 0")]
    InvalidNonZero { field: &'static str },
    #[error("retry.initial_backoff_ms ({initial_ms}) exceeds retry.max_backoff_ms ({max_ms})")]
    BackoffOrder { initial_ms: u64, max_ms: u64 },
}

/// Validated configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    pub program_id: Pubkey,
    pub cluster_offset: u32,
    pub commitment: Commitment,
    pub retry: RetryPolicy,
    pub finalization_timeout: Duration,
}

impl Settings {
    /// Defaults for `cluster_offset`.
    pub fn for_cluster(cluster_offset: u32) -> Self {
        Self {
            program_id: aces_table::ID,
            cluster_offset,
            commitment: Commitment::default(),
            retry: RetryPolicy::default(),
            finalization_timeout: Duration::from_millis(default_finalization_timeout_ms()),
        }
    }
}

fn ensure_nonzero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidNonZero { field });
    }
    Ok(())
}

impl Config {
    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn validate(self) -> Result<Settings, ConfigError> {
        let program_id =
            Pubkey::from_str(&self.program_id).map_err(|_| ConfigError::InvalidPubkey {
                field: "program_id",
                value: self.program_id.clone(),
            })?;
        if program_id != aces_table::ID {
            return Err(ConfigError::ProgramMismatch {
                configured: program_id,
                expected: aces_table::ID,
            });
        }

        ensure_nonzero("retry.max_attempts", self.retry.max_attempts as u64)?;
        ensure_nonzero("retry.initial_backoff_ms", self.retry.initial_backoff_ms)?;
        ensure_nonzero("finalization_timeout_ms", self.finalization_timeout_ms)?;
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::BackoffOrder {
                initial_ms: self.retry.initial_backoff_ms,
                max_ms: self.retry.max_backoff_ms,
            });
        }

        Ok(Settings {
            program_id,
            cluster_offset: self.cluster_offset,
            commitment: self.commitment,
            retry: RetryPolicy {
                max_attempts: self.retry.max_attempts,
                initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
            },
            finalization_timeout: Duration::from_millis(self.finalization_timeout_ms),
        })
    }
}
