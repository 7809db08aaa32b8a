//! Round state machine
//!
//! A round starts `Ready` with an uninflated balloon. Each inflate grows the
//! balloon and then rolls against the pop probability of the size just
//! reached. Banking or popping ends the round; terminal rounds reject every
//! further action without changing state.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::balloon::{Balloon, BalloonType};
use crate::probability::{ProbabilityTable, SizeOutOfRange};

/// Participant input forwarded by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Inflate,
    Bank,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inflate => f.write_str("inflate"),
            Self::Bank => f.write_str("bank"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    Ready,
    Inflating,
    Popped,
    Banked,
}

impl RoundPhase {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Popped | Self::Banked)
    }

    #[must_use]
    pub const fn outcome(self) -> Option<Outcome> {
        match self {
            Self::Popped => Some(Outcome::Popped),
            Self::Banked => Some(Outcome::Banked),
            Self::Ready | Self::Inflating => None,
        }
    }
}

/// How a finished round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Popped,
    Banked,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Popped => f.write_str("popped"),
            Self::Banked => f.write_str("banked"),
        }
    }
}

/// Rejected actions. None of these change round state.
#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum TransitionError {
    #[error("round already {phase:?}; {action} ignored")]
    Terminal { phase: RoundPhase, action: Action },
    #[error("{balloon_type} balloon is at its cap of {cap}; inflate ignored")]
    AtCapacity { balloon_type: BalloonType, cap: u32 },
    #[error("no round is active; {action} ignored")]
    NoActiveRound { action: Action },
    #[error(transparent)]
    Lookup(#[from] SizeOutOfRange),
}

/// Result of an accepted action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RoundEvent {
    /// Balloon grew and survived the pop roll
    Inflated { size: u32, probability: f64 },
    /// Balloon burst at `size`; round earnings forfeited
    Popped { size: u32, probability: f64 },
    /// Round ended with `earnings` secured
    Banked { earnings: u32 },
}

impl RoundEvent {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Popped { .. } | Self::Banked { .. })
    }
}

/// Immutable record of a finished round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_index: u32,
    pub balloon_type: BalloonType,
    pub final_size: u32,
    pub outcome: Outcome,
    pub earnings: u32,
}

/// One balloon's life cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    round_index: u32,
    balloon: Balloon,
    phase: RoundPhase,
}

impl Round {
    /// Start round `round_index` with a fresh balloon capped by the table.
    #[must_use]
    pub fn new(round_index: u32, balloon_type: BalloonType, table: &ProbabilityTable) -> Self {
        Self {
            round_index,
            balloon: Balloon::new(balloon_type, table.inflation_cap(balloon_type)),
            phase: RoundPhase::Ready,
        }
    }

    #[must_use]
    pub const fn round_index(&self) -> u32 {
        self.round_index
    }

    #[must_use]
    pub const fn balloon(&self) -> &Balloon {
        &self.balloon
    }

    #[must_use]
    pub const fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Earnings if the round ended now: zero once popped, else the size.
    #[must_use]
    pub const fn earnings(&self) -> u32 {
        match self.phase {
            RoundPhase::Popped => 0,
            _ => self.balloon.current_size,
        }
    }

    /// Apply one participant action.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when the round is already over, the balloon
    /// is at its cap, or the table lacks the size just reached. The round is
    /// unchanged in every error case.
    pub fn apply<R>(
        &mut self,
        action: Action,
        table: &ProbabilityTable,
        rng: &mut R,
    ) -> Result<RoundEvent, TransitionError>
    where
        R: Rng + ?Sized,
    {
        if self.phase.is_terminal() {
            return Err(TransitionError::Terminal {
                phase: self.phase,
                action,
            });
        }
        match action {
            Action::Inflate => self.inflate(table, rng),
            Action::Bank => {
                self.phase = RoundPhase::Banked;
                Ok(RoundEvent::Banked {
                    earnings: self.balloon.current_size,
                })
            }
        }
    }

    fn inflate<R>(
        &mut self,
        table: &ProbabilityTable,
        rng: &mut R,
    ) -> Result<RoundEvent, TransitionError>
    where
        R: Rng + ?Sized,
    {
        if !self.balloon.can_inflate() {
            return Err(TransitionError::AtCapacity {
                balloon_type: self.balloon.balloon_type,
                cap: self.balloon.max_inflations(),
            });
        }
        let next_size = self.balloon.current_size + 1;
        let probability = table.probability_of_pop(self.balloon.balloon_type, next_size)?;

        let size = self.balloon.inflate();
        let roll = rng.r#gen::<f64>();
        if roll < probability {
            self.balloon.pop();
            self.phase = RoundPhase::Popped;
            Ok(RoundEvent::Popped { size, probability })
        } else {
            self.phase = RoundPhase::Inflating;
            Ok(RoundEvent::Inflated { size, probability })
        }
    }

    /// Record for the ledger once the round has ended.
    #[must_use]
    pub fn record(&self) -> Option<RoundRecord> {
        let outcome = self.phase.outcome()?;
        Some(RoundRecord {
            round_index: self.round_index,
            balloon_type: self.balloon.balloon_type,
            final_size: self.balloon.current_size,
            outcome,
            earnings: self.earnings(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balloon::Variant;
    use rand::SeedableRng;
    use rand::rngs::mock::StepRng;
    use rand_chacha::ChaCha20Rng;

    fn basic_table(source: &str) -> ProbabilityTable {
        ProbabilityTable::load(source, Variant::Basic).unwrap().table
    }

    fn risk_table() -> ProbabilityTable {
        ProbabilityTable::default_for(Variant::Risk).unwrap().table
    }

    #[test]
    fn pops_on_certain_size() {
        let table = basic_table("1,0.0\n2,0.0\n3,1.0\n");
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let mut round = Round::new(0, BalloonType::Standard, &table);

        assert!(matches!(
            round.apply(Action::Inflate, &table, &mut rng),
            Ok(RoundEvent::Inflated { size: 1, .. })
        ));
        assert!(matches!(
            round.apply(Action::Inflate, &table, &mut rng),
            Ok(RoundEvent::Inflated { size: 2, .. })
        ));
        assert!(matches!(
            round.apply(Action::Inflate, &table, &mut rng),
            Ok(RoundEvent::Popped { size: 3, .. })
        ));
        let record = round.record().unwrap();
        assert_eq!(record.outcome, Outcome::Popped);
        assert_eq!(record.final_size, 3);
        assert_eq!(record.earnings, 0);
    }

    #[test]
    fn banking_secures_current_size() {
        let table = risk_table();
        // StepRng yielding u64::MAX maps to a roll just below 1.0, so nothing pops early.
        let mut rng = StepRng::new(u64::MAX, 0);
        let mut round = Round::new(4, BalloonType::Low, &table);
        round.apply(Action::Inflate, &table, &mut rng).unwrap();
        round.apply(Action::Inflate, &table, &mut rng).unwrap();
        assert_eq!(round.earnings(), 2);
        assert_eq!(
            round.apply(Action::Bank, &table, &mut rng),
            Ok(RoundEvent::Banked { earnings: 2 })
        );
        assert_eq!(
            round.record(),
            Some(RoundRecord {
                round_index: 4,
                balloon_type: BalloonType::Low,
                final_size: 2,
                outcome: Outcome::Banked,
                earnings: 2,
            })
        );
    }

    #[test]
    fn banking_from_ready_banks_zero() {
        let table = risk_table();
        let mut rng = StepRng::new(0, 0);
        let mut round = Round::new(0, BalloonType::Medium, &table);
        assert_eq!(
            round.apply(Action::Bank, &table, &mut rng),
            Ok(RoundEvent::Banked { earnings: 0 })
        );
        assert_eq!(round.record().map(|r| r.earnings), Some(0));
    }

    #[test]
    fn terminal_round_ignores_actions() {
        let table = basic_table("1,1.0\n");
        let mut rng = StepRng::new(0, 0);
        let mut round = Round::new(0, BalloonType::Standard, &table);
        round.apply(Action::Inflate, &table, &mut rng).unwrap();
        let before = round.clone();

        for action in [Action::Inflate, Action::Bank] {
            let err = round.apply(action, &table, &mut rng).unwrap_err();
            assert!(matches!(
                err,
                TransitionError::Terminal {
                    phase: RoundPhase::Popped,
                    ..
                }
            ));
        }
        assert_eq!(round, before);
        assert_eq!(round.earnings(), 0);
    }

    #[test]
    fn high_balloon_rejects_inflate_past_cap() {
        // Certain-survival table so the balloon reaches its cap intact.
        let mut source = String::new();
        for size in 1..=10 {
            source.push_str(&format!("{size},0.0,0.0,0.0\n"));
        }
        let table = ProbabilityTable::load(&source, Variant::Risk).unwrap().table;
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let mut round = Round::new(0, BalloonType::High, &table);
        for _ in 0..3 {
            round.apply(Action::Inflate, &table, &mut rng).unwrap();
        }
        let before = round.clone();
        assert_eq!(
            round.apply(Action::Inflate, &table, &mut rng),
            Err(TransitionError::AtCapacity {
                balloon_type: BalloonType::High,
                cap: 3,
            })
        );
        assert_eq!(round, before);
        assert_eq!(round.phase(), RoundPhase::Inflating);
        assert_eq!(round.apply(Action::Bank, &table, &mut rng), Ok(RoundEvent::Banked { earnings: 3 }));
    }

    #[test]
    fn pop_roll_uses_size_reached() {
        let table = basic_table("1,0.0\n2,0.5\n3,1.0\n");
        // A roll of 0.25 survives size 1 (p=0) and pops at size 2 (p=0.5).
        let quarter = u64::MAX / 4;
        let mut rng = StepRng::new(quarter, 0);
        let mut round = Round::new(0, BalloonType::Standard, &table);
        assert!(matches!(
            round.apply(Action::Inflate, &table, &mut rng),
            Ok(RoundEvent::Inflated { size: 1, .. })
        ));
        assert!(matches!(
            round.apply(Action::Inflate, &table, &mut rng),
            Ok(RoundEvent::Popped { size: 2, probability }) if (probability - 0.5).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn earnings_are_never_anything_but_size_or_zero() {
        let table = ProbabilityTable::default_for(Variant::Basic).unwrap().table;
        let mut rng = ChaCha20Rng::seed_from_u64(0xBA11);
        for target in 0..12_u32 {
            let mut round = Round::new(target, BalloonType::Standard, &table);
            for _ in 0..target {
                if round.apply(Action::Inflate, &table, &mut rng).is_err() || round.phase().is_terminal() {
                    break;
                }
            }
            let _ = round.apply(Action::Bank, &table, &mut rng);
            let record = round.record().unwrap();
            match record.outcome {
                Outcome::Popped => assert_eq!(record.earnings, 0),
                Outcome::Banked => assert_eq!(record.earnings, record.final_size),
            }
        }
    }
}
