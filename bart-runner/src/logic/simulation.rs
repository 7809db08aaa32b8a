use bart_engine::{
    Action, BartEngine, Session, SessionConfig, SessionReport, StartError, TableSource,
};
use rand::Rng;
use serde::Serialize;

use crate::logic::policy::{ParticipantPolicy, PumpStrategy};

/// One simulated participant's finished session.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationRecord {
    pub strategy: String,
    pub seed: u64,
    pub actions: u32,
    pub report: SessionReport,
}

/// Per-strategy means across simulated sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyAggregate {
    pub strategy: String,
    pub sessions: usize,
    pub mean_bank_total: f64,
    pub pop_rate: f64,
    /// Mean of per-session adjusted pumps, over sessions with any banked round
    pub mean_adjusted_pumps: Option<f64>,
}

/// Drive `session` with `policy` until every planned round is recorded.
/// Returns the number of accepted actions.
pub fn run_to_completion<R: Rng>(
    session: &mut Session<R>,
    policy: &mut dyn ParticipantPolicy,
) -> u32 {
    let mut actions = 0;
    while let Some(snapshot) = session.snapshot() {
        if snapshot.phase.is_terminal() {
            if !session.next_round() {
                break;
            }
            continue;
        }
        let action = policy.decide(&snapshot);
        if session.apply(action).is_ok() {
            actions += 1;
        } else if session.apply(Action::Bank).is_ok() {
            actions += 1;
        } else {
            log::warn!("{} policy stalled on round {}", policy.name(), snapshot.round_index);
            break;
        }
    }
    actions
}

/// Run one simulated session for `strategy` with `seed`.
///
/// # Errors
///
/// Returns an error if the session cannot start.
pub fn simulate_session<L: TableSource>(
    engine: &BartEngine<L>,
    base: &SessionConfig,
    strategy: PumpStrategy,
    seed: u64,
) -> Result<SimulationRecord, StartError<L::Error>> {
    let config = SessionConfig {
        seed: Some(seed),
        ..base.clone()
    };
    let mut session = engine.start_session(&config)?;
    let mut policy = strategy.create_policy(seed);
    let actions = run_to_completion(&mut session, policy.as_mut());
    Ok(SimulationRecord {
        strategy: strategy.label(),
        seed,
        actions,
        report: session.finish(),
    })
}

/// Run `iterations` sessions per strategy and seed. Iteration `i` of seed `s`
/// uses seed `s + i`.
///
/// # Errors
///
/// Returns the first start-up error.
pub fn run_simulations<L: TableSource>(
    engine: &BartEngine<L>,
    base: &SessionConfig,
    strategies: &[PumpStrategy],
    seeds: &[u64],
    iterations: usize,
) -> Result<Vec<SimulationRecord>, StartError<L::Error>> {
    let mut records = Vec::with_capacity(strategies.len() * seeds.len() * iterations);
    for &strategy in strategies {
        for &seed in seeds {
            for i in 0..iterations {
                let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
                records.push(simulate_session(engine, base, strategy, iteration_seed)?);
            }
        }
    }
    Ok(records)
}

#[must_use]
pub fn aggregate(records: &[SimulationRecord]) -> Vec<StrategyAggregate> {
    let mut order: Vec<&str> = Vec::new();
    for record in records {
        if !order.contains(&record.strategy.as_str()) {
            order.push(&record.strategy);
        }
    }

    order
        .into_iter()
        .map(|strategy| {
            let group: Vec<&SimulationRecord> =
                records.iter().filter(|r| r.strategy == strategy).collect();
            #[allow(clippy::cast_precision_loss)]
            let sessions = group.len() as f64;
            #[allow(clippy::cast_precision_loss)]
            let mean_bank_total = group
                .iter()
                .map(|r| r.report.summary.bank_total as f64)
                .sum::<f64>()
                / sessions;
            let rounds: u32 = group.iter().map(|r| r.report.summary.rounds).sum();
            let popped: u32 = group.iter().map(|r| r.report.summary.popped).sum();
            let pop_rate = if rounds == 0 {
                0.0
            } else {
                f64::from(popped) / f64::from(rounds)
            };
            let adjusted: Vec<f64> = group
                .iter()
                .filter_map(|r| r.report.summary.adjusted_pumps)
                .collect();
            #[allow(clippy::cast_precision_loss)]
            let mean_adjusted_pumps = (!adjusted.is_empty())
                .then(|| adjusted.iter().sum::<f64>() / adjusted.len() as f64);
            StrategyAggregate {
                strategy: strategy.to_string(),
                sessions: group.len(),
                mean_bank_total,
                pop_rate,
                mean_adjusted_pumps,
            }
        })
        .collect()
}
