mod common;
mod logic;

use anyhow::{Context, Result, bail};
use bart_engine::{BartEngine, RemainderPolicy, SessionConfig, TableFormat, Variant};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdin, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use common::{FileTableSource, TriggerSink, create_export, split_csv};
use logic::reports::{self, ReportFormat, SessionHeader};
use logic::{PlayEnd, PumpStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// A participant plays at the keyboard
    Interactive,
    /// Simulated participants play with scripted strategies
    Simulate,
    /// Load and print the probability table, then exit
    Table,
}

#[derive(Debug, Parser)]
#[command(name = "bart-runner", version = "0.1.0")]
#[command(about = "Balloon Analogue Risk Task - interactive sessions, simulations and data export")]
struct Args {
    /// Run mode
    #[arg(long, value_enum, default_value_t = RunMode::Interactive)]
    mode: RunMode,

    /// JSON session configuration; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Task variant (basic or risk)
    #[arg(long)]
    variant: Option<Variant>,

    /// Number of rounds (0-240)
    #[arg(long, allow_negative_numbers = true)]
    rounds: Option<i64>,

    /// Four-digit participant id
    #[arg(long)]
    participant: Option<String>,

    /// Seed for the session's random draws
    #[arg(long)]
    seed: Option<u64>,

    /// How a remainder of two rounds is split between balloon types
    #[arg(long)]
    remainder_policy: Option<RemainderPolicy>,

    /// Probability table file (bundled table when omitted)
    #[arg(long)]
    table: Option<PathBuf>,

    /// Read the table as "1 in X" odds lines
    #[arg(long)]
    legacy_odds: bool,

    /// Strategies to simulate (comma-separated: fixed:N, cautious, bold, random)
    #[arg(long, default_value = "fixed:5")]
    strategies: String,

    /// Seeds to simulate (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of sessions per strategy and seed (simulate mode only)
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Directory for the participant data export (interactive mode)
    #[arg(long, default_value = ".")]
    export_dir: PathBuf,

    /// Send event markers to a trigger listener at host:port
    #[arg(long)]
    trigger_addr: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = resolve_config(&args)?;
    let engine = BartEngine::new(FileTableSource);

    match args.mode {
        RunMode::Interactive => run_interactive(&args, &config, &engine),
        RunMode::Simulate => run_simulations(&args, &config, &engine),
        RunMode::Table => show_table(&args, &config, &engine),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn resolve_config(args: &Args) -> Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => load_config_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(variant) = args.variant {
        config.variant = variant;
    }
    if let Some(rounds) = args.rounds {
        config.round_count = rounds;
    }
    if let Some(participant) = &args.participant {
        config.participant_id.clone_from(participant);
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(policy) = args.remainder_policy {
        config.remainder_policy = policy;
    }
    if let Some(table) = &args.table {
        config.table_path = Some(table.clone());
    }
    if args.legacy_odds {
        config.table_format = TableFormat::LegacyOdds;
    }
    config.validate().context("invalid session configuration")?;
    Ok(config)
}

fn load_config_file(path: &Path) -> Result<SessionConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    SessionConfig::from_json(&json).with_context(|| format!("failed to parse {}", path.display()))
}

fn announce_banner(title: &str) {
    println!("{}", format!("🎈 {title}").bright_cyan().bold());
    println!("{}", "=".repeat(32).cyan());
}

fn run_interactive(
    args: &Args,
    config: &SessionConfig,
    engine: &BartEngine<FileTableSource>,
) -> Result<()> {
    let mut session = engine
        .start_session(config)
        .context("could not start session")?;
    if let Some(addr) = &args.trigger_addr {
        session = session.with_marker_sink(Box::new(TriggerSink::connect(addr)?));
    }

    announce_banner("Balloon Analogue Risk Task");
    println!("Inflate the balloon to earn points. Bank before it pops!");

    let end = {
        let mut screen = stdout().lock();
        logic::play(&mut session, stdin().lock(), &mut screen)
            .context("interactive session failed")?
    };
    if end == PlayEnd::Quit {
        println!("{}", "Session ended early.".yellow());
    }

    let report = session.finish();
    std::fs::create_dir_all(&args.export_dir)
        .with_context(|| format!("failed to create {}", args.export_dir.display()))?;
    let now = Utc::now();
    let (path, file) = create_export(&args.export_dir, &config.export_file_name(), now)
        .with_context(|| format!("failed to create export in {}", args.export_dir.display()))?;
    let mut file = BufWriter::new(file);
    report.export.write_csv(&mut file)?;
    file.flush()?;
    log::info!("exported {} rounds to {}", report.export.rows.len(), path.display());

    let header = SessionHeader {
        participant_id: config.participant_id.clone(),
        generated_at: now,
        export_file: Some(path.display().to_string()),
    };
    let mut output_target = OutputTarget::new(args.output.clone())?;
    reports::write_session_report(output_target.writer(), args.report, &header, &report)?;
    output_target.flush_inner()?;
    Ok(())
}

fn parse_strategies(arg: &str) -> Result<Vec<PumpStrategy>> {
    let strategies = split_csv(arg)
        .iter()
        .map(|token| token.parse::<PumpStrategy>().map_err(anyhow::Error::msg))
        .collect::<Result<Vec<_>>>()?;
    if strategies.is_empty() {
        bail!("no strategies given");
    }
    Ok(strategies)
}

fn parse_seeds(arg: &str) -> Result<Vec<u64>> {
    split_csv(arg)
        .iter()
        .map(|token| {
            token
                .parse::<u64>()
                .with_context(|| format!("invalid seed `{token}`"))
        })
        .collect()
}

fn run_simulations(
    args: &Args,
    config: &SessionConfig,
    engine: &BartEngine<FileTableSource>,
) -> Result<()> {
    let strategies = parse_strategies(&args.strategies)?;
    let seeds = parse_seeds(&args.seeds)?;
    let start_time = Instant::now();

    if args.report == ReportFormat::Console {
        announce_banner("BART Simulation");
    }
    let records =
        logic::run_simulations(engine, config, &strategies, &seeds, args.iterations)
            .context("could not start simulated session")?;
    if args.verbose {
        for record in &records {
            let (banked, popped) = reports::outcome_tally(&record.report);
            println!(
                "🧪 {} seed {}: {} banked, {} popped, earnings {}",
                record.strategy.bright_white(),
                record.seed,
                banked,
                popped,
                record.report.summary.bank_total
            );
        }
    }
    let aggregates = logic::aggregate(&records);

    let mut output_target = OutputTarget::new(args.output.clone())?;
    reports::write_simulation_report(
        output_target.writer(),
        args.report,
        &records,
        &aggregates,
        start_time.elapsed(),
    )?;
    output_target.flush_inner()?;
    Ok(())
}

fn show_table(
    args: &Args,
    config: &SessionConfig,
    engine: &BartEngine<FileTableSource>,
) -> Result<()> {
    let load = engine
        .load_table(config)
        .context("could not load probability table")?;
    let mut output_target = OutputTarget::new(args.output.clone())?;
    reports::write_table_report(output_target.writer(), args.report, &load.table, &load.warnings)?;
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}
