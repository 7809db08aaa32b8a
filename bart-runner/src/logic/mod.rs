pub mod interactive;
pub mod policy;
pub mod reports;
pub mod simulation;

pub use interactive::{PlayEnd, play};
pub use policy::{ParticipantPolicy, PumpStrategy};
pub use reports::{ReportFormat, SessionHeader};
pub use simulation::{
    SimulationRecord, StrategyAggregate, aggregate, run_simulations, run_to_completion,
    simulate_session,
};
