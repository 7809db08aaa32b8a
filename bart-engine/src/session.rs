//! Session orchestration: table, trial plan, active round and ledger
//!
//! A [`Session`] owns everything one participant run needs and hands out
//! [`Snapshot`]s for the presentation layer after every accepted action.
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::balloon::{BalloonType, Variant};
use crate::config::{ConfigError, SessionConfig};
use crate::ledger::{LedgerExport, LedgerSummary, SessionLedger};
use crate::markers::{EventMarker, MarkerSink, NullSink};
use crate::probability::{ProbabilityTable, TableError, TableLoad, TableWarning};
use crate::round::{Action, Outcome, Round, RoundEvent, RoundPhase, TransitionError};
use crate::sequencer::{PlanError, RemainderPolicy, TrialPlan};

/// Fatal start-up failures. No round has begun when one of these is returned.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("session runs the {config} variant but the probability table is {table}")]
    VariantMismatch { config: Variant, table: Variant },
}

/// What the presentation layer shows after each accepted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub round_index: u32,
    pub rounds_total: u32,
    pub rounds_remaining: u32,
    pub balloon_type: BalloonType,
    pub current_size: u32,
    pub max_size: u32,
    pub round_earnings: u32,
    pub phase: RoundPhase,
    pub outcome: Option<Outcome>,
    pub bank_total: u64,
}

/// Everything an investigator keeps once the session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub variant: Variant,
    pub seed: Option<u64>,
    pub plan: Vec<BalloonType>,
    pub completed: bool,
    pub warnings: Vec<TableWarning>,
    pub summary: LedgerSummary,
    pub export: LedgerExport,
}

/// One participant's run through the task.
///
/// The session owns the probability table, the trial plan, the ledger and
/// the random source for its whole lifetime; at most one round is active.
pub struct Session<R = ChaCha20Rng> {
    table: ProbabilityTable,
    warnings: Vec<TableWarning>,
    plan: TrialPlan,
    ledger: SessionLedger,
    rng: R,
    seed: Option<u64>,
    markers: Box<dyn MarkerSink>,
    current: Option<Round>,
    next_index: u32,
}

impl Session<ChaCha20Rng> {
    /// Validate `config` and start a session seeded from it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the configuration is invalid or the table
    /// was loaded for a different variant.
    pub fn start(config: &SessionConfig, load: TableLoad) -> Result<Self, SessionError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let rng = ChaCha20Rng::seed_from_u64(seed);
        let mut session = Self::with_rng(
            config.variant,
            config.round_count,
            config.remainder_policy,
            load,
            rng,
        )?;
        session.seed = Some(seed);
        log::info!(
            "session started: participant {}, {} variant, {} rounds, seed {seed}",
            config.participant_id,
            config.variant,
            config.round_count
        );
        Ok(session)
    }
}

impl<R: Rng> Session<R> {
    /// Start a session drawing from a caller-supplied random source.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] on an invalid round count or a table loaded
    /// for another variant.
    pub fn with_rng(
        variant: Variant,
        round_count: i64,
        policy: RemainderPolicy,
        load: TableLoad,
        mut rng: R,
    ) -> Result<Self, SessionError> {
        let TableLoad { table, warnings } = load;
        if table.variant() != variant {
            return Err(SessionError::VariantMismatch {
                config: variant,
                table: table.variant(),
            });
        }
        let plan = TrialPlan::for_variant(variant, round_count, policy, &mut rng)?;
        let mut session = Self {
            table,
            warnings,
            plan,
            ledger: SessionLedger::new(),
            rng,
            seed: None,
            markers: Box::new(NullSink),
            current: None,
            next_index: 0,
        };
        session.open_next_round();
        Ok(session)
    }

    /// Route event markers to `sink`.
    #[must_use]
    pub fn with_marker_sink(mut self, sink: Box<dyn MarkerSink>) -> Self {
        self.markers = sink;
        self
    }

    /// Apply one participant action to the active round.
    ///
    /// Rejected actions are logged and leave the session untouched, so a stray
    /// key press after a round ends is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when no round is active, the round is over,
    /// or the balloon is at its cap.
    pub fn apply(&mut self, action: Action) -> Result<RoundEvent, TransitionError> {
        let Some(round) = self.current.as_mut() else {
            let err = TransitionError::NoActiveRound { action };
            log::warn!("{err}");
            return Err(err);
        };

        let event = match round.apply(action, &self.table, &mut self.rng) {
            Ok(event) => event,
            Err(err) => {
                log::warn!("round {}: {err}", round.round_index());
                return Err(err);
            }
        };
        log::debug!("round {}: {action} -> {event:?}", round.round_index());

        if event.is_terminal()
            && let Some(record) = round.record()
        {
            self.ledger.record_round(record);
            let marker = EventMarker::from(record.outcome);
            if let Err(err) = self.markers.emit(marker) {
                log::warn!("event marker {} not delivered: {err}", marker.code());
            }
        }
        Ok(event)
    }

    /// Move past a finished round. Returns `true` when a new round started.
    ///
    /// Does nothing while the active round is still in play.
    pub fn next_round(&mut self) -> bool {
        if let Some(round) = &self.current
            && !round.phase().is_terminal()
        {
            return false;
        }
        self.open_next_round()
    }

    fn open_next_round(&mut self) -> bool {
        match self.plan.get(self.next_index) {
            Some(balloon_type) => {
                self.current = Some(Round::new(self.next_index, balloon_type, &self.table));
                self.next_index += 1;
                true
            }
            None => {
                self.current = None;
                false
            }
        }
    }

    /// Display state of the active (or just finished) round.
    #[must_use]
    pub fn snapshot(&self) -> Option<Snapshot> {
        let round = self.current.as_ref()?;
        let balloon = round.balloon();
        let phase = round.phase();
        Some(Snapshot {
            round_index: round.round_index(),
            rounds_total: self.rounds_total(),
            rounds_remaining: self.rounds_remaining(),
            balloon_type: balloon.balloon_type,
            current_size: balloon.current_size,
            max_size: balloon.max_inflations(),
            round_earnings: round.earnings(),
            phase,
            outcome: phase.outcome(),
            bank_total: self.ledger.bank_total(),
        })
    }

    #[must_use]
    pub fn rounds_total(&self) -> u32 {
        u32::try_from(self.plan.len()).unwrap_or(u32::MAX)
    }

    /// Rounds not yet recorded in the ledger.
    #[must_use]
    pub fn rounds_remaining(&self) -> u32 {
        let recorded = u32::try_from(self.ledger.history().len()).unwrap_or(u32::MAX);
        self.rounds_total().saturating_sub(recorded)
    }

    /// Every planned round has been recorded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.rounds_remaining() == 0
    }

    #[must_use]
    pub const fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    #[must_use]
    pub const fn plan(&self) -> &TrialPlan {
        &self.plan
    }

    #[must_use]
    pub const fn table(&self) -> &ProbabilityTable {
        &self.table
    }

    #[must_use]
    pub fn table_warnings(&self) -> &[TableWarning] {
        &self.warnings
    }

    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// End the session, discarding any unfinished round.
    #[must_use]
    pub fn finish(self) -> SessionReport {
        let completed = self.is_complete();
        if let Some(round) = &self.current
            && !round.phase().is_terminal()
        {
            log::info!("discarding unfinished round {}", round.round_index());
        }
        log::info!(
            "session finished: {} of {} rounds, bank {}",
            self.ledger.history().len(),
            self.plan.len(),
            self.ledger.bank_total()
        );
        SessionReport {
            variant: self.table.variant(),
            seed: self.seed,
            plan: self.plan.as_slice().to_vec(),
            completed,
            warnings: self.warnings,
            summary: self.ledger.summary(),
            export: self.ledger.export(),
        }
    }
}
