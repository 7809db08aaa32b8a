//! Centralized task constants for the BART engine.
//!
//! These values define the protocol that investigators rely on when comparing
//! sessions. Keeping them together ensures the task can only be adjusted via
//! code changes reviewed in version control.

// Session limits -----------------------------------------------------------
/// Largest round count an investigator may configure.
pub const MAX_ROUNDS: u32 = 240;
/// Number of digits in a participant identifier.
pub const PARTICIPANT_ID_DIGITS: usize = 4;

// Inflation caps -----------------------------------------------------------
pub const LOW_RISK_MAX_INFLATIONS: u32 = 10;
pub const MEDIUM_RISK_MAX_INFLATIONS: u32 = 7;
pub const HIGH_RISK_MAX_INFLATIONS: u32 = 3;

// Event marker codes -------------------------------------------------------
pub const MARKER_CODE_BANKED: u8 = 7;
pub const MARKER_CODE_POPPED: u8 = 9;

// Default probability sources ----------------------------------------------
pub(crate) const DEFAULT_BASIC_TABLE: &str = include_str!("../data/probabilities_basic.csv");
pub(crate) const DEFAULT_RISK_TABLE: &str = include_str!("../data/probabilities_risk.csv");

// Export naming ------------------------------------------------------------
pub(crate) const EXPORT_PREFIX_BASIC: &str = "BART_basic_data";
pub(crate) const EXPORT_PREFIX_RISK: &str = "BART_multirisk_data";
