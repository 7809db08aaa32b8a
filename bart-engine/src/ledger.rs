//! Session earnings ledger and export
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::balloon::BalloonType;
use crate::round::{Outcome, RoundRecord};

/// Append-only history of finished rounds plus the running bank total.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionLedger {
    bank_total: u64,
    history: Vec<RoundRecord>,
}

impl SessionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished round. Popped rounds add nothing to the bank.
    pub fn record_round(&mut self, record: RoundRecord) {
        if record.outcome == Outcome::Banked {
            self.bank_total += u64::from(record.earnings);
        }
        log::debug!(
            "round {} {} at size {} (earnings {}, bank {})",
            record.round_index,
            record.outcome,
            record.final_size,
            record.earnings,
            self.bank_total
        );
        self.history.push(record);
    }

    #[must_use]
    pub const fn bank_total(&self) -> u64 {
        self.bank_total
    }

    #[must_use]
    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    /// Rows in history order with the bank total after each round.
    #[must_use]
    pub fn export(&self) -> LedgerExport {
        let mut running = 0_u64;
        let rows = self
            .history
            .iter()
            .map(|record| {
                if record.outcome == Outcome::Banked {
                    running += u64::from(record.earnings);
                }
                ExportRow {
                    round: record.round_index,
                    balloon_type: record.balloon_type,
                    final_size: record.final_size,
                    outcome: record.outcome,
                    earnings: record.earnings,
                    bank_total: running,
                }
            })
            .collect();
        LedgerExport {
            rows,
            bank_total: self.bank_total,
        }
    }

    /// Aggregate scores for analysis, including adjusted average pumps.
    #[must_use]
    pub fn summary(&self) -> LedgerSummary {
        let mut per_type: BTreeMap<BalloonType, TypeSummary> = BTreeMap::new();
        for record in &self.history {
            let entry = per_type.entry(record.balloon_type).or_default();
            entry.rounds += 1;
            match record.outcome {
                Outcome::Banked => {
                    entry.banked += 1;
                    entry.banked_pumps += u64::from(record.final_size);
                }
                Outcome::Popped => entry.popped += 1,
            }
        }
        for entry in per_type.values_mut() {
            entry.adjusted_pumps = average(entry.banked_pumps, entry.banked);
        }

        let banked = per_type.values().map(|t| t.banked).sum();
        let banked_pumps = per_type.values().map(|t| t.banked_pumps).sum();
        LedgerSummary {
            rounds: u32::try_from(self.history.len()).unwrap_or(u32::MAX),
            banked,
            popped: per_type.values().map(|t| t.popped).sum(),
            bank_total: self.bank_total,
            adjusted_pumps: average(banked_pumps, banked),
            per_type,
        }
    }
}

fn average(total: u64, count: u32) -> Option<f64> {
    if count == 0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let total = total as f64;
    Some(total / f64::from(count))
}

/// One exported round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub round: u32,
    pub balloon_type: BalloonType,
    pub final_size: u32,
    pub outcome: Outcome,
    pub earnings: u32,
    pub bank_total: u64,
}

/// Exported session table written at session end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerExport {
    pub rows: Vec<ExportRow>,
    pub bank_total: u64,
}

impl LedgerExport {
    pub const CSV_HEADER: &'static str = "round,balloon_type,final_size,outcome,earnings,bank_total";

    /// Write rows as CSV followed by a `bank_total` summary line.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by `writer`.
    pub fn write_csv<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "{}", Self::CSV_HEADER)?;
        for row in &self.rows {
            writeln!(
                writer,
                "{},{},{},{},{},{}",
                row.round, row.balloon_type, row.final_size, row.outcome, row.earnings, row.bank_total
            )?;
        }
        writeln!(writer, "bank_total,{}", self.bank_total)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypeSummary {
    pub rounds: u32,
    pub banked: u32,
    pub popped: u32,
    pub banked_pumps: u64,
    /// Mean final size over banked rounds
    pub adjusted_pumps: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub rounds: u32,
    pub banked: u32,
    pub popped: u32,
    pub bank_total: u64,
    pub adjusted_pumps: Option<f64>,
    pub per_type: BTreeMap<BalloonType, TypeSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(round_index: u32, balloon_type: BalloonType, size: u32, outcome: Outcome) -> RoundRecord {
        RoundRecord {
            round_index,
            balloon_type,
            final_size: size,
            outcome,
            earnings: if outcome == Outcome::Banked { size } else { 0 },
        }
    }

    fn sample_ledger() -> SessionLedger {
        let mut ledger = SessionLedger::new();
        ledger.record_round(record(0, BalloonType::Low, 2, Outcome::Banked));
        ledger.record_round(record(1, BalloonType::High, 3, Outcome::Popped));
        ledger.record_round(record(2, BalloonType::Low, 6, Outcome::Banked));
        ledger.record_round(record(3, BalloonType::Medium, 4, Outcome::Banked));
        ledger
    }

    #[test]
    fn bank_total_sums_banked_rounds_only() {
        let ledger = sample_ledger();
        assert_eq!(ledger.bank_total(), 12);
        let from_history: u64 = ledger
            .history()
            .iter()
            .filter(|r| r.outcome == Outcome::Banked)
            .map(|r| u64::from(r.earnings))
            .sum();
        assert_eq!(from_history, ledger.bank_total());
    }

    #[test]
    fn export_keeps_history_order_and_running_total() {
        let export = sample_ledger().export();
        let rounds: Vec<u32> = export.rows.iter().map(|r| r.round).collect();
        assert_eq!(rounds, vec![0, 1, 2, 3]);
        let running: Vec<u64> = export.rows.iter().map(|r| r.bank_total).collect();
        assert_eq!(running, vec![2, 2, 8, 12]);
        assert_eq!(export.bank_total, 12);
    }

    #[test]
    fn csv_has_header_rows_and_summary() {
        let mut buffer = Vec::new();
        sample_ledger().export().write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], LedgerExport::CSV_HEADER);
        assert_eq!(lines[1], "0,low,2,banked,2,2");
        assert_eq!(lines[2], "1,high,3,popped,0,2");
        assert_eq!(lines.last(), Some(&"bank_total,12"));
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn summary_reports_adjusted_pumps() {
        let summary = sample_ledger().summary();
        assert_eq!(summary.rounds, 4);
        assert_eq!(summary.banked, 3);
        assert_eq!(summary.popped, 1);
        assert_eq!(summary.adjusted_pumps, Some(4.0));
        let low = &summary.per_type[&BalloonType::Low];
        assert_eq!(low.adjusted_pumps, Some(4.0));
        let high = &summary.per_type[&BalloonType::High];
        assert_eq!(high.adjusted_pumps, None);
        assert_eq!(high.popped, 1);
    }

    #[test]
    fn empty_ledger_exports_only_summary() {
        let ledger = SessionLedger::new();
        let mut buffer = Vec::new();
        ledger.export().write_csv(&mut buffer).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            format!("{}\nbank_total,0\n", LedgerExport::CSV_HEADER)
        );
        assert_eq!(ledger.summary().adjusted_pumps, None);
    }
}
