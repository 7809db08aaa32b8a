use anyhow::Result;
use bart_engine::{Outcome, ProbabilityTable, SessionReport, TableWarning};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::{SimulationRecord, StrategyAggregate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
    Csv,
}

/// Context printed alongside a participant's session report.
#[derive(Debug, Clone, Serialize)]
pub struct SessionHeader {
    pub participant_id: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub generated_at: DateTime<Utc>,
    pub export_file: Option<String>,
}

#[derive(Serialize)]
struct SessionJson<'a> {
    #[serde(flatten)]
    header: &'a SessionHeader,
    report: &'a SessionReport,
}

fn fmt_pumps(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn serialize_timestamp<S: serde::Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&timestamp(*at))
}

pub fn write_session_report(
    out: &mut dyn Write,
    format: ReportFormat,
    header: &SessionHeader,
    report: &SessionReport,
) -> Result<()> {
    match format {
        ReportFormat::Console => session_console(out, header, report)?,
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&SessionJson { header, report })?;
            writeln!(out, "{json}")?;
        }
        ReportFormat::Markdown => session_markdown(out, header, report)?,
        ReportFormat::Csv => report.export.write_csv(out)?,
    }
    Ok(())
}

fn session_console(
    out: &mut dyn Write,
    header: &SessionHeader,
    report: &SessionReport,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Session Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==================".cyan())?;
    writeln!(out, "Participant: {}", header.participant_id)?;
    writeln!(out, "Variant: {}", report.variant)?;
    if let Some(seed) = report.seed {
        writeln!(out, "Seed: {seed}")?;
    }
    let summary = &report.summary;
    let status = if report.completed {
        "complete".green()
    } else {
        "ended early".yellow()
    };
    writeln!(
        out,
        "Rounds: {}/{} ({status})",
        summary.rounds,
        report.plan.len()
    )?;
    writeln!(
        out,
        "Banked: {}  Popped: {}",
        summary.banked.to_string().green(),
        summary.popped.to_string().red()
    )?;
    writeln!(out, "Total earnings: {}", summary.bank_total.to_string().bold())?;
    writeln!(out, "Adjusted pumps: {}", fmt_pumps(summary.adjusted_pumps))?;
    for (balloon_type, per_type) in &summary.per_type {
        writeln!(
            out,
            "   {balloon_type:<8} rounds {:>3}  banked {:>3}  popped {:>3}  adjusted {}",
            per_type.rounds,
            per_type.banked,
            per_type.popped,
            fmt_pumps(per_type.adjusted_pumps)
        )?;
    }
    write_warnings(out, &report.warnings)?;
    if let Some(file) = &header.export_file {
        writeln!(out, "💾 Data saved to {file}")?;
    }
    writeln!(out, "Generated {}", timestamp(header.generated_at))?;
    Ok(())
}

fn session_markdown(
    out: &mut dyn Write,
    header: &SessionHeader,
    report: &SessionReport,
) -> Result<()> {
    writeln!(out, "# BART Session {}\n", header.participant_id)?;
    writeln!(out, "_Generated {}_\n", timestamp(header.generated_at))?;
    writeln!(out, "- Variant: {}", report.variant)?;
    if let Some(seed) = report.seed {
        writeln!(out, "- Seed: {seed}")?;
    }
    writeln!(out, "- Completed: {}", report.completed)?;
    writeln!(out, "- Total earnings: {}", report.summary.bank_total)?;
    writeln!(
        out,
        "- Adjusted pumps: {}\n",
        fmt_pumps(report.summary.adjusted_pumps)
    )?;
    writeln!(out, "| Round | Balloon | Size | Outcome | Earnings | Bank |")?;
    writeln!(out, "|------:|---------|-----:|---------|---------:|-----:|")?;
    for row in &report.export.rows {
        writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            row.round, row.balloon_type, row.final_size, row.outcome, row.earnings, row.bank_total
        )?;
    }
    if !report.warnings.is_empty() {
        writeln!(out, "\n## Table warnings\n")?;
        for warning in &report.warnings {
            writeln!(out, "- {warning}")?;
        }
    }
    Ok(())
}

fn write_warnings(out: &mut dyn Write, warnings: &[TableWarning]) -> Result<()> {
    for warning in warnings {
        writeln!(out, "{} {warning}", "⚠️ ".yellow())?;
    }
    Ok(())
}

pub fn write_simulation_report(
    out: &mut dyn Write,
    format: ReportFormat,
    records: &[SimulationRecord],
    aggregates: &[StrategyAggregate],
    total_duration: Duration,
) -> Result<()> {
    match format {
        ReportFormat::Console => simulation_console(out, records, aggregates, total_duration)?,
        ReportFormat::Json => {
            #[derive(Serialize)]
            struct Payload<'a> {
                aggregates: &'a [StrategyAggregate],
                sessions: &'a [SimulationRecord],
            }
            let json = serde_json::to_string_pretty(&Payload {
                aggregates,
                sessions: records,
            })?;
            writeln!(out, "{json}")?;
        }
        ReportFormat::Markdown => simulation_markdown(out, aggregates)?,
        ReportFormat::Csv => simulation_csv(out, records)?,
    }
    Ok(())
}

fn simulation_console(
    out: &mut dyn Write,
    records: &[SimulationRecord],
    aggregates: &[StrategyAggregate],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Simulation Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=====================".cyan())?;
    writeln!(out, "Sessions: {}", records.len())?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;
    for agg in aggregates {
        writeln!(out, "{}", agg.strategy.bold())?;
        writeln!(out, "   Sessions: {}", agg.sessions)?;
        writeln!(out, "   Mean earnings: {:.1}", agg.mean_bank_total)?;
        writeln!(out, "   Pop rate: {:.1}%", agg.pop_rate * 100.0)?;
        writeln!(
            out,
            "   Mean adjusted pumps: {}",
            fmt_pumps(agg.mean_adjusted_pumps)
        )?;
    }

    let incomplete = records.iter().filter(|r| !r.report.completed).count();
    if incomplete > 0 {
        writeln!(
            out,
            "{}",
            format!("❌ {incomplete} sessions did not complete").red()
        )?;
    }
    Ok(())
}

fn simulation_markdown(out: &mut dyn Write, aggregates: &[StrategyAggregate]) -> Result<()> {
    writeln!(out, "# BART Simulation Results\n")?;
    writeln!(out, "_Generated {}_\n", timestamp(Utc::now()))?;
    writeln!(
        out,
        "| Strategy | Sessions | Mean earnings | Pop rate | Mean adjusted pumps |"
    )?;
    writeln!(
        out,
        "|----------|---------:|--------------:|---------:|--------------------:|"
    )?;
    for agg in aggregates {
        writeln!(
            out,
            "| {} | {} | {:.1} | {:.1}% | {} |",
            agg.strategy,
            agg.sessions,
            agg.mean_bank_total,
            agg.pop_rate * 100.0,
            fmt_pumps(agg.mean_adjusted_pumps)
        )?;
    }
    Ok(())
}

fn simulation_csv(out: &mut dyn Write, records: &[SimulationRecord]) -> Result<()> {
    writeln!(
        out,
        "strategy,seed,variant,rounds,banked,popped,bank_total,adjusted_pumps"
    )?;
    for record in records {
        let summary = &record.report.summary;
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            record.strategy,
            record.seed,
            record.report.variant,
            summary.rounds,
            summary.banked,
            summary.popped,
            summary.bank_total,
            summary
                .adjusted_pumps
                .map(|v| format!("{v:.3}"))
                .unwrap_or_default()
        )?;
    }
    Ok(())
}

pub fn write_table_report(
    out: &mut dyn Write,
    format: ReportFormat,
    table: &ProbabilityTable,
    warnings: &[TableWarning],
) -> Result<()> {
    let types = table.variant().balloon_types();
    match format {
        ReportFormat::Json => {
            #[derive(Serialize)]
            struct Payload<'a> {
                table: &'a ProbabilityTable,
                warnings: &'a [TableWarning],
            }
            writeln!(
                out,
                "{}",
                serde_json::to_string_pretty(&Payload { table, warnings })?
            )?;
        }
        ReportFormat::Csv => {
            let header: Vec<&str> = types.iter().map(|t| t.label()).collect();
            writeln!(out, "size,{}", header.join(","))?;
            let rows = types.iter().map(|t| table.max_size(*t)).max().unwrap_or(0);
            for size in 1..=rows {
                let cells: Vec<String> = types
                    .iter()
                    .map(|t| {
                        table
                            .probability_of_pop(*t, size)
                            .map(|p| p.to_string())
                            .unwrap_or_default()
                    })
                    .collect();
                writeln!(out, "{size},{}", cells.join(","))?;
            }
        }
        ReportFormat::Console | ReportFormat::Markdown => {
            writeln!(
                out,
                "{}",
                format!("🎈 {} probability table", table.variant())
                    .bright_cyan()
                    .bold()
            )?;
            for balloon_type in types {
                let curve = table.curve(*balloon_type).unwrap_or(&[]);
                let cells: Vec<String> = curve.iter().map(|p| format!("{p:.3}")).collect();
                writeln!(
                    out,
                    "   {balloon_type:<8} cap {:>2}  [{}]",
                    table.inflation_cap(*balloon_type),
                    cells.join(", ")
                )?;
            }
            write_warnings(out, warnings)?;
        }
    }
    Ok(())
}

/// Outcome counts for a one-line progress message.
#[must_use]
pub fn outcome_tally(report: &SessionReport) -> (usize, usize) {
    let banked = report
        .export
        .rows
        .iter()
        .filter(|r| r.outcome == Outcome::Banked)
        .count();
    (banked, report.export.rows.len() - banked)
}
