//! Investigator-supplied session configuration
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::balloon::Variant;
use crate::constants::{
    EXPORT_PREFIX_BASIC, EXPORT_PREFIX_RISK, MAX_ROUNDS, PARTICIPANT_ID_DIGITS,
};
use crate::sequencer::{PlanError, RemainderPolicy};

/// Errors raised when session configuration is invalid. All are fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(transparent)]
    RoundCount(#[from] PlanError),
    #[error("participant id `{0}` must be exactly {digits} digits", digits = PARTICIPANT_ID_DIGITS)]
    ParticipantId(String),
}

/// How the probability source file is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFormat {
    /// `size,probability` or `size,low,medium,high` rows
    #[default]
    Csv,
    /// One line of "1 in X" odds per balloon type
    LegacyOdds,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub variant: Variant,
    #[serde(default = "SessionConfig::default_round_count")]
    pub round_count: i64,
    #[serde(default = "SessionConfig::default_participant_id")]
    pub participant_id: String,
    /// Seed for every random draw; fresh entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub remainder_policy: RemainderPolicy,
    /// Probability source; the bundled table when absent
    #[serde(default)]
    pub table_path: Option<PathBuf>,
    #[serde(default)]
    pub table_format: TableFormat,
}

impl SessionConfig {
    const fn default_round_count() -> i64 {
        30
    }

    fn default_participant_id() -> String {
        "0000".to_string()
    }

    /// Parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a configuration.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check every field before a session may start.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an out-of-range round count or a malformed
    /// participant id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=i64::from(MAX_ROUNDS)).contains(&self.round_count) {
            return Err(PlanError::InvalidRoundCount(self.round_count).into());
        }
        let id = &self.participant_id;
        if id.len() != PARTICIPANT_ID_DIGITS || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::ParticipantId(id.clone()));
        }
        Ok(())
    }

    /// Conventional export file name for this participant and variant.
    #[must_use]
    pub fn export_file_name(&self) -> String {
        let prefix = match self.variant {
            Variant::Basic => EXPORT_PREFIX_BASIC,
            Variant::Risk => EXPORT_PREFIX_RISK,
        };
        format!("{prefix}_{}.csv", self.participant_id)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            round_count: Self::default_round_count(),
            participant_id: Self::default_participant_id(),
            seed: None,
            remainder_policy: RemainderPolicy::default(),
            table_path: None,
            table_format: TableFormat::default(),
        }
    }
}
