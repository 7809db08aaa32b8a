//! Trial sequencing for the multi-risk variant
//!
//! Per-type counts are fixed before any shuffling so that every session with
//! the same round count sees the same mix of balloons, only in a different
//! order.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::balloon::{BalloonType, Variant};
use crate::constants::MAX_ROUNDS;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("round count {0} is outside 0..={max}", max = MAX_ROUNDS)]
    InvalidRoundCount(i64),
}

/// Where leftover rounds go when the count is not a multiple of three.
///
/// Medium always receives the first leftover round. The investigators'
/// brief leaves the second one open, so both readings are selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Second leftover round goes to Low (11 rounds -> 4 low, 4 medium, 3 high)
    #[default]
    MediumThenLow,
    /// Every leftover round goes to Medium (11 rounds -> 3 low, 5 medium, 3 high)
    MediumTakesAll,
}

impl RemainderPolicy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MediumThenLow => "medium_then_low",
            Self::MediumTakesAll => "medium_takes_all",
        }
    }
}

impl fmt::Display for RemainderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RemainderPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "medium_then_low" => Ok(Self::MediumThenLow),
            "medium_takes_all" => Ok(Self::MediumTakesAll),
            other => Err(format!("unknown remainder policy: {other}")),
        }
    }
}

/// Number of balloons of each risk level in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeCounts {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

impl TypeCounts {
    /// Balance the risk levels over `round_count` rounds.
    #[must_use]
    pub const fn balanced(round_count: u32, policy: RemainderPolicy) -> Self {
        let base = round_count / 3;
        let remainder = round_count % 3;
        let mut counts = Self {
            low: base,
            medium: base,
            high: base,
        };
        match (remainder, policy) {
            (0, _) => {}
            (1, _) => counts.medium += 1,
            (_, RemainderPolicy::MediumThenLow) => {
                counts.medium += 1;
                counts.low += 1;
            }
            (_, RemainderPolicy::MediumTakesAll) => counts.medium += remainder,
        }
        counts
    }

    #[must_use]
    pub const fn total(&self) -> u32 {
        self.low + self.medium + self.high
    }
}

/// Ordered balloon types, one per round, fixed before the session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialPlan {
    rounds: Vec<BalloonType>,
}

impl TrialPlan {
    /// Build a shuffled, balanced multi-risk plan.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidRoundCount`] when `round_count` is negative
    /// or above the protocol maximum.
    pub fn build<R>(
        round_count: i64,
        policy: RemainderPolicy,
        rng: &mut R,
    ) -> Result<Self, PlanError>
    where
        R: Rng + ?Sized,
    {
        let count = validate_round_count(round_count)?;
        let counts = TypeCounts::balanced(count, policy);
        let mut rounds = Vec::with_capacity(counts.total() as usize);
        rounds.extend(std::iter::repeat_n(BalloonType::Low, counts.low as usize));
        rounds.extend(std::iter::repeat_n(BalloonType::Medium, counts.medium as usize));
        rounds.extend(std::iter::repeat_n(BalloonType::High, counts.high as usize));
        rounds.shuffle(rng);
        Ok(Self { rounds })
    }

    /// Plan for the basic variant: every round uses the standard balloon.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidRoundCount`] on an out-of-range count.
    pub fn basic(round_count: i64) -> Result<Self, PlanError> {
        let count = validate_round_count(round_count)?;
        Ok(Self {
            rounds: vec![BalloonType::Standard; count as usize],
        })
    }

    /// Plan for whichever variant the session runs.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidRoundCount`] on an out-of-range count.
    pub fn for_variant<R>(
        variant: Variant,
        round_count: i64,
        policy: RemainderPolicy,
        rng: &mut R,
    ) -> Result<Self, PlanError>
    where
        R: Rng + ?Sized,
    {
        match variant {
            Variant::Basic => Self::basic(round_count),
            Variant::Risk => Self::build(round_count, policy, rng),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    #[must_use]
    pub fn get(&self, round_index: u32) -> Option<BalloonType> {
        self.rounds.get(round_index as usize).copied()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[BalloonType] {
        &self.rounds
    }

    /// Count the risk levels actually present in the plan.
    #[must_use]
    pub fn counts(&self) -> TypeCounts {
        let mut counts = TypeCounts::default();
        for balloon_type in &self.rounds {
            match balloon_type {
                BalloonType::Low => counts.low += 1,
                BalloonType::Medium => counts.medium += 1,
                BalloonType::High => counts.high += 1,
                BalloonType::Standard => {}
            }
        }
        counts
    }
}

fn validate_round_count(round_count: i64) -> Result<u32, PlanError> {
    u32::try_from(round_count)
        .ok()
        .filter(|count| *count <= MAX_ROUNDS)
        .ok_or(PlanError::InvalidRoundCount(round_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn assert_balanced(counts: TypeCounts) {
        assert!(counts.medium >= counts.low, "{counts:?}");
        assert!(counts.medium >= counts.high, "{counts:?}");
        assert!(counts.low.abs_diff(counts.high) <= 1, "{counts:?}");
    }

    #[test]
    fn every_valid_count_is_balanced() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        for policy in [RemainderPolicy::MediumThenLow, RemainderPolicy::MediumTakesAll] {
            for count in 0..=i64::from(MAX_ROUNDS) {
                let plan = TrialPlan::build(count, policy, &mut rng).unwrap();
                assert_eq!(plan.len() as i64, count);
                let counts = plan.counts();
                assert_eq!(i64::from(counts.total()), count);
                assert_balanced(counts);
            }
        }
    }

    #[test]
    fn nine_rounds_split_evenly() {
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let plan = TrialPlan::build(9, RemainderPolicy::default(), &mut rng).unwrap();
        assert_eq!(
            plan.counts(),
            TypeCounts {
                low: 3,
                medium: 3,
                high: 3
            }
        );
    }

    #[test]
    fn remainders_favor_medium() {
        let ten = TypeCounts::balanced(10, RemainderPolicy::MediumThenLow);
        assert_eq!((ten.low, ten.medium, ten.high), (3, 4, 3));
        let eleven = TypeCounts::balanced(11, RemainderPolicy::MediumThenLow);
        assert_eq!((eleven.low, eleven.medium, eleven.high), (4, 4, 3));
        let legacy = TypeCounts::balanced(11, RemainderPolicy::MediumTakesAll);
        assert_eq!((legacy.low, legacy.medium, legacy.high), (3, 5, 3));
    }

    #[test]
    fn out_of_range_counts_fail() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        assert_eq!(
            TrialPlan::build(-1, RemainderPolicy::default(), &mut rng),
            Err(PlanError::InvalidRoundCount(-1))
        );
        assert_eq!(
            TrialPlan::build(241, RemainderPolicy::default(), &mut rng),
            Err(PlanError::InvalidRoundCount(241))
        );
        assert!(TrialPlan::basic(300).is_err());
    }

    #[test]
    fn same_seed_same_order() {
        let a = TrialPlan::build(30, RemainderPolicy::default(), &mut ChaCha20Rng::seed_from_u64(5))
            .unwrap();
        let b = TrialPlan::build(30, RemainderPolicy::default(), &mut ChaCha20Rng::seed_from_u64(5))
            .unwrap();
        assert_eq!(a, b);
        let c = TrialPlan::build(30, RemainderPolicy::default(), &mut ChaCha20Rng::seed_from_u64(6))
            .unwrap();
        assert_eq!(a.counts(), c.counts());
    }

    #[test]
    fn build_interleaves_balloon_types() {
        let plan = TrialPlan::build(30, RemainderPolicy::default(), &mut ChaCha20Rng::seed_from_u64(5))
            .unwrap();
        let mut grouped = plan.as_slice().to_vec();
        grouped.sort();
        assert_ne!(plan.as_slice(), grouped.as_slice());
        let switches = plan.as_slice().windows(2).filter(|w| w[0] != w[1]).count();
        assert!(switches > 2, "{:?}", plan.as_slice());

        let other = TrialPlan::build(30, RemainderPolicy::default(), &mut ChaCha20Rng::seed_from_u64(6))
            .unwrap();
        assert_ne!(plan.as_slice(), other.as_slice());
    }

    #[test]
    fn basic_plan_uses_standard_balloons() {
        let plan = TrialPlan::basic(5).unwrap();
        assert!(plan.as_slice().iter().all(|t| *t == BalloonType::Standard));
        assert_eq!(plan.counts(), TypeCounts::default());
        assert!(TrialPlan::basic(0).unwrap().is_empty());
    }

    #[test]
    fn remainder_policy_parses() {
        assert_eq!(
            "medium-takes-all".parse::<RemainderPolicy>(),
            Ok(RemainderPolicy::MediumTakesAll)
        );
        assert!("random".parse::<RemainderPolicy>().is_err());
    }
}
