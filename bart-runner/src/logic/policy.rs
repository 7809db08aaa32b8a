use std::fmt;
use std::str::FromStr;

use bart_engine::{Action, Snapshot};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Policy interface for simulated participants.
pub trait ParticipantPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Choose the next action for the active, unfinished round.
    fn decide(&mut self, snapshot: &Snapshot) -> Action;
}

/// Built-in pumping strategies for simulated sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PumpStrategy {
    /// Bank after a fixed number of pumps (or at the cap, if lower)
    Fixed(u32),
    /// Bank at a third of the balloon's cap
    Cautious,
    /// Pump to one short of the cap
    Bold,
    /// Draw a fresh target each round
    Random,
}

impl PumpStrategy {
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Fixed(pumps) => format!("fixed:{pumps}"),
            Self::Cautious => "cautious".to_string(),
            Self::Bold => "bold".to_string(),
            Self::Random => "random".to_string(),
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn ParticipantPolicy + Send> {
        match self {
            Self::Fixed(pumps) => Box::new(FixedPolicy { pumps }),
            Self::Cautious => Box::new(TargetPolicy {
                name: "Cautious",
                target: |cap| (cap / 3).max(1),
            }),
            Self::Bold => Box::new(TargetPolicy {
                name: "Bold",
                target: |cap| cap.saturating_sub(1).max(1),
            }),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for PumpStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for PumpStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        if let Some(count) = token.strip_prefix("fixed:") {
            return count
                .parse()
                .map(Self::Fixed)
                .map_err(|_| format!("fixed strategy needs a pump count, got `{count}`"));
        }
        match token.as_str() {
            "cautious" => Ok(Self::Cautious),
            "bold" => Ok(Self::Bold),
            "random" => Ok(Self::Random),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}

fn pump_until(snapshot: &Snapshot, target: u32) -> Action {
    if snapshot.current_size < target.min(snapshot.max_size) {
        Action::Inflate
    } else {
        Action::Bank
    }
}

struct FixedPolicy {
    pumps: u32,
}

impl ParticipantPolicy for FixedPolicy {
    fn name(&self) -> &'static str {
        "Fixed"
    }

    fn decide(&mut self, snapshot: &Snapshot) -> Action {
        pump_until(snapshot, self.pumps)
    }
}

struct TargetPolicy {
    name: &'static str,
    target: fn(u32) -> u32,
}

impl ParticipantPolicy for TargetPolicy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn decide(&mut self, snapshot: &Snapshot) -> Action {
        pump_until(snapshot, (self.target)(snapshot.max_size))
    }
}

struct RandomPolicy {
    rng: ChaCha20Rng,
    round: Option<u32>,
    target: u32,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            round: None,
            target: 0,
        }
    }
}

impl ParticipantPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn decide(&mut self, snapshot: &Snapshot) -> Action {
        if self.round != Some(snapshot.round_index) {
            self.round = Some(snapshot.round_index);
            self.target = self.rng.gen_range(1..=snapshot.max_size.max(1));
            log::debug!("round {}: random target {}", snapshot.round_index, self.target);
        }
        pump_until(snapshot, self.target)
    }
}
