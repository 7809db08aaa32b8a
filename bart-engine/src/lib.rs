//! BART Trial Engine
//!
//! Platform-agnostic core of the Balloon Analogue Risk Task: probability
//! tables, balloon sequencing, the per-round state machine and the earnings
//! ledger. Rendering, input polling and file handling live with the caller.

pub mod balloon;
pub mod config;
pub mod constants;
pub mod ledger;
pub mod markers;
pub mod probability;
pub mod round;
pub mod sequencer;
pub mod session;

// Re-export commonly used types
pub use balloon::{Balloon, BalloonType, Variant};
pub use config::{ConfigError, SessionConfig, TableFormat};
pub use ledger::{ExportRow, LedgerExport, LedgerSummary, SessionLedger, TypeSummary};
pub use markers::{EventMarker, MarkerSink, NullSink, RecordingSink};
pub use probability::{ProbabilityTable, SizeOutOfRange, TableError, TableLoad, TableWarning};
pub use round::{Action, Outcome, Round, RoundEvent, RoundPhase, RoundRecord, TransitionError};
pub use sequencer::{PlanError, RemainderPolicy, TrialPlan, TypeCounts};
pub use session::{Session, SessionError, SessionReport, Snapshot};

use std::convert::Infallible;

/// Trait for abstracting where probability sources come from
/// Platform-specific implementations should provide this
pub trait TableSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Raw probability source text for `config`, or `None` to fall back to
    /// the bundled table for the configured variant.
    ///
    /// # Errors
    ///
    /// Returns an error if the source exists but cannot be read.
    fn read_table(&self, config: &SessionConfig) -> Result<Option<String>, Self::Error>;
}

/// Source that always uses the compiled-in tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledTables;

impl TableSource for BundledTables {
    type Error = Infallible;

    fn read_table(&self, _config: &SessionConfig) -> Result<Option<String>, Self::Error> {
        Ok(None)
    }
}

/// Failure to bring up a session through [`BartEngine`].
#[derive(Debug, thiserror::Error)]
pub enum StartError<E: std::error::Error + 'static> {
    #[error("probability source unavailable")]
    Source(#[source] E),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Entry point binding a table source to session construction
pub struct BartEngine<L>
where
    L: TableSource,
{
    tables: L,
}

impl<L> BartEngine<L>
where
    L: TableSource,
{
    /// Create a new engine with the provided table source
    pub const fn new(tables: L) -> Self {
        Self { tables }
    }

    /// Load and validate the probability table `config` asks for.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or the table is malformed.
    pub fn load_table(&self, config: &SessionConfig) -> Result<TableLoad, StartError<L::Error>> {
        let source = self.tables.read_table(config).map_err(StartError::Source)?;
        let load = match (source, config.table_format) {
            (None, _) => ProbabilityTable::default_for(config.variant),
            (Some(text), TableFormat::Csv) => ProbabilityTable::load(&text, config.variant),
            (Some(text), TableFormat::LegacyOdds) => {
                ProbabilityTable::from_legacy_odds(&text, config.variant)
            }
        };
        load.map_err(|err| StartError::Session(err.into()))
    }

    /// Validate `config`, load its table and start a seeded session.
    ///
    /// # Errors
    ///
    /// Returns an error before any round begins if the configuration, the
    /// probability source, or the table is invalid.
    pub fn start_session(&self, config: &SessionConfig) -> Result<Session, StartError<L::Error>> {
        config.validate().map_err(SessionError::from)?;
        let load = self.load_table(config)?;
        Ok(Session::start(config, load)?)
    }
}
