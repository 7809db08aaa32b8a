//! Balloon types and per-round balloon instances
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    HIGH_RISK_MAX_INFLATIONS, LOW_RISK_MAX_INFLATIONS, MEDIUM_RISK_MAX_INFLATIONS,
};

/// Task variant selected by the investigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// One balloon type whose limit is implied by the probability table
    #[default]
    Basic,
    /// Low, medium and high risk balloons with fixed inflation caps
    Risk,
}

impl Variant {
    /// Balloon types that appear in this variant, in table column order.
    #[must_use]
    pub const fn balloon_types(self) -> &'static [BalloonType] {
        match self {
            Self::Basic => &[BalloonType::Standard],
            Self::Risk => &[BalloonType::Low, BalloonType::Medium, BalloonType::High],
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Risk => "risk",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "risk" | "multirisk" | "multi-risk" => Ok(Self::Risk),
            other => Err(format!("unknown task variant: {other}")),
        }
    }
}

/// Risk level of a balloon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalloonType {
    /// The single balloon of the basic variant
    Standard,
    Low,
    Medium,
    High,
}

impl BalloonType {
    /// Fixed inflation cap, or `None` when the probability table sets the limit.
    #[must_use]
    pub const fn max_inflations(self) -> Option<u32> {
        match self {
            Self::Standard => None,
            Self::Low => Some(LOW_RISK_MAX_INFLATIONS),
            Self::Medium => Some(MEDIUM_RISK_MAX_INFLATIONS),
            Self::High => Some(HIGH_RISK_MAX_INFLATIONS),
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for BalloonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// One balloon for the lifetime of a single round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balloon {
    pub balloon_type: BalloonType,
    pub current_size: u32,
    pub is_alive: bool,
    max_inflations: u32,
}

impl Balloon {
    /// Create an uninflated balloon that may grow to `max_inflations`.
    #[must_use]
    pub const fn new(balloon_type: BalloonType, max_inflations: u32) -> Self {
        Self {
            balloon_type,
            current_size: 0,
            is_alive: true,
            max_inflations,
        }
    }

    #[must_use]
    pub const fn max_inflations(&self) -> u32 {
        self.max_inflations
    }

    /// Whether one more inflation stays within the cap.
    #[must_use]
    pub const fn can_inflate(&self) -> bool {
        self.is_alive && self.current_size < self.max_inflations
    }

    /// Grow by one unit and return the size reached.
    pub(crate) fn inflate(&mut self) -> u32 {
        self.current_size += 1;
        self.current_size
    }

    pub(crate) fn pop(&mut self) {
        self.is_alive = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_caps_match_protocol() {
        assert_eq!(BalloonType::Low.max_inflations(), Some(10));
        assert_eq!(BalloonType::Medium.max_inflations(), Some(7));
        assert_eq!(BalloonType::High.max_inflations(), Some(3));
        assert_eq!(BalloonType::Standard.max_inflations(), None);
    }

    #[test]
    fn balloon_stops_at_cap() {
        let mut balloon = Balloon::new(BalloonType::High, 3);
        for expected in 1..=3 {
            assert!(balloon.can_inflate());
            assert_eq!(balloon.inflate(), expected);
        }
        assert!(!balloon.can_inflate());
    }

    #[test]
    fn popped_balloon_cannot_inflate() {
        let mut balloon = Balloon::new(BalloonType::Low, 10);
        balloon.inflate();
        balloon.pop();
        assert!(!balloon.is_alive);
        assert!(!balloon.can_inflate());
    }

    #[test]
    fn variant_parses_aliases() {
        assert_eq!("Basic".parse::<Variant>(), Ok(Variant::Basic));
        assert_eq!("multirisk".parse::<Variant>(), Ok(Variant::Risk));
        assert!("triple".parse::<Variant>().is_err());
        assert_eq!(Variant::Risk.balloon_types().len(), 3);
    }
}
