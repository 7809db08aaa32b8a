//! Pop probability tables
//!
//! Tables are plain comma-separated text so investigators can retune them
//! without touching code. A basic table has `size,probability` rows; a risk
//! table has `size,low,medium,high` rows. Sizes start at 1 and are contiguous.
//! Lines starting with `#` are comments and an optional `size,...` header row
//! is skipped. In a risk table a column may stop early (empty trailing cells)
//! once its balloon type can no longer be inflated.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::balloon::{BalloonType, Variant};
use crate::constants::{DEFAULT_BASIC_TABLE, DEFAULT_RISK_TABLE};

/// Reasons a probability source is rejected. Every variant is fatal: the
/// session cannot start without a valid table.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TableError {
    #[error("malformed probability table at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },
    #[error("malformed probability table: {reason}")]
    Malformed { reason: String },
}

impl TableError {
    fn row(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            line,
            reason: reason.into(),
        }
    }

    fn table(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Lookup past the tabulated sizes for a balloon type. The round state
/// machine never asks for these, so hitting one is a caller defect.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("no {balloon_type} pop probability tabulated for size {size} (largest is {max_size})")]
pub struct SizeOutOfRange {
    pub balloon_type: BalloonType,
    pub size: u32,
    pub max_size: u32,
}

/// Non-fatal findings surfaced to the investigator when a table loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableWarning {
    /// Probability decreases as the balloon grows
    NonMonotonic {
        balloon_type: BalloonType,
        size: u32,
        previous: f64,
        current: f64,
    },
    /// A balloon can reach its last inflatable size without a certain pop
    NeverCertain {
        balloon_type: BalloonType,
        last_size: u32,
        probability: f64,
    },
}

impl fmt::Display for TableWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonMonotonic {
                balloon_type,
                size,
                previous,
                current,
            } => write!(
                f,
                "{balloon_type} pop probability drops from {previous} to {current} at size {size}"
            ),
            Self::NeverCertain {
                balloon_type,
                last_size,
                probability,
            } => write!(
                f,
                "{balloon_type} balloons can survive to size {last_size} (pop probability {probability})"
            ),
        }
    }
}

/// Immutable pop probabilities, one curve per balloon type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityTable {
    variant: Variant,
    curves: BTreeMap<BalloonType, Vec<f64>>,
}

/// A validated table together with the warnings raised while loading it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLoad {
    pub table: ProbabilityTable,
    pub warnings: Vec<TableWarning>,
}

impl ProbabilityTable {
    /// Parse and validate a probability source for `variant`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] when a row is not numeric, a probability lies
    /// outside `[0, 1]`, sizes are not contiguous from 1, or a risk column
    /// does not cover its balloon type's inflation cap.
    pub fn load(source: &str, variant: Variant) -> Result<TableLoad, TableError> {
        let types = variant.balloon_types();
        let expected_cells = types.len() + 1;
        let mut curves: Vec<Vec<f64>> = vec![Vec::new(); types.len()];
        let mut ended = vec![false; types.len()];
        let mut rows: u32 = 0;

        for (idx, raw) in source.lines().enumerate() {
            let line = idx + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let cells: Vec<&str> = text.split(',').map(str::trim).collect();
            if rows == 0 && cells[0].eq_ignore_ascii_case("size") {
                if cells.len() != expected_cells {
                    return Err(TableError::row(
                        line,
                        format!(
                            "header has {} columns, {variant} tables need {expected_cells}",
                            cells.len()
                        ),
                    ));
                }
                continue;
            }
            if cells.len() != expected_cells {
                return Err(TableError::row(
                    line,
                    format!("expected {expected_cells} columns, found {}", cells.len()),
                ));
            }

            let size: u32 = cells[0].parse().map_err(|_| {
                TableError::row(line, format!("size `{}` is not a positive integer", cells[0]))
            })?;
            if size != rows + 1 {
                return Err(TableError::row(
                    line,
                    format!("sizes must be contiguous from 1: expected {}, found {size}", rows + 1),
                ));
            }

            let mut any_value = false;
            for (column, cell) in cells[1..].iter().enumerate() {
                let balloon_type = types[column];
                if cell.is_empty() {
                    ended[column] = true;
                    continue;
                }
                if ended[column] {
                    return Err(TableError::row(
                        line,
                        format!("{balloon_type} column resumes at size {size} after ending"),
                    ));
                }
                let probability = parse_probability(cell)
                    .map_err(|reason| TableError::row(line, format!("{balloon_type}: {reason}")))?;
                curves[column].push(probability);
                any_value = true;
            }
            if !any_value {
                return Err(TableError::row(line, "row has no probabilities"));
            }
            rows += 1;
        }

        if rows == 0 {
            return Err(TableError::table("no probability rows found"));
        }

        Self::from_curves(variant, curves)
    }

    /// Convert a legacy "1 in X" odds file.
    ///
    /// Basic files hold one comma-separated line of odds; risk files hold three
    /// lines in `high`, `medium`, `low` order. Entry `i` becomes size `i + 1`
    /// with probability `1 / X`, and a final size with a certain pop is
    /// appended to every curve.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] when a line is missing or an entry is not a
    /// positive integer.
    pub fn from_legacy_odds(source: &str, variant: Variant) -> Result<TableLoad, TableError> {
        let order: &[BalloonType] = match variant {
            Variant::Basic => &[BalloonType::Standard],
            Variant::Risk => &[BalloonType::High, BalloonType::Medium, BalloonType::Low],
        };
        let mut lines = source
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty() && !l.trim_start().starts_with('#'));

        let mut by_type: BTreeMap<BalloonType, Vec<f64>> = BTreeMap::new();
        for balloon_type in order {
            let (idx, text) = lines.next().ok_or_else(|| {
                TableError::table(format!("missing odds line for {balloon_type} balloons"))
            })?;
            let mut curve = Vec::new();
            for cell in text.split(',').map(str::trim) {
                let odds: u32 = cell
                    .parse()
                    .ok()
                    .filter(|x| *x > 0)
                    .ok_or_else(|| {
                        TableError::row(idx + 1, format!("odds `{cell}` must be a positive integer"))
                    })?;
                curve.push(1.0 / f64::from(odds));
            }
            curve.push(1.0);
            by_type.insert(*balloon_type, curve);
        }

        let curves = variant
            .balloon_types()
            .iter()
            .map(|t| by_type.remove(t).unwrap_or_default())
            .collect();
        Self::from_curves(variant, curves)
    }

    /// Compiled-in default table for `variant`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] only if the bundled data was edited into an
    /// invalid state.
    pub fn default_for(variant: Variant) -> Result<TableLoad, TableError> {
        let source = match variant {
            Variant::Basic => DEFAULT_BASIC_TABLE,
            Variant::Risk => DEFAULT_RISK_TABLE,
        };
        Self::load(source, variant)
    }

    fn from_curves(variant: Variant, curves: Vec<Vec<f64>>) -> Result<TableLoad, TableError> {
        let mut map = BTreeMap::new();
        for (balloon_type, curve) in variant.balloon_types().iter().zip(curves) {
            let tabulated = u32::try_from(curve.len()).unwrap_or(u32::MAX);
            if tabulated == 0 {
                return Err(TableError::table(format!(
                    "no {balloon_type} probabilities tabulated"
                )));
            }
            if let Some(cap) = balloon_type.max_inflations()
                && tabulated < cap
            {
                return Err(TableError::table(format!(
                    "{balloon_type} column covers {tabulated} sizes but {balloon_type} balloons inflate up to {cap}"
                )));
            }
            map.insert(*balloon_type, curve);
        }

        let table = Self {
            variant,
            curves: map,
        };
        let warnings = table.audit();
        for warning in &warnings {
            log::warn!("probability table: {warning}");
        }
        Ok(TableLoad { table, warnings })
    }

    fn audit(&self) -> Vec<TableWarning> {
        let mut warnings = Vec::new();
        for (&balloon_type, curve) in &self.curves {
            for (idx, pair) in curve.windows(2).enumerate() {
                if pair[1] < pair[0] {
                    warnings.push(TableWarning::NonMonotonic {
                        balloon_type,
                        size: u32::try_from(idx + 2).unwrap_or(u32::MAX),
                        previous: pair[0],
                        current: pair[1],
                    });
                }
            }
            let last_size = self.inflation_cap(balloon_type);
            if let Ok(probability) = self.probability_of_pop(balloon_type, last_size)
                && probability < 1.0
            {
                warnings.push(TableWarning::NeverCertain {
                    balloon_type,
                    last_size,
                    probability,
                });
            }
        }
        warnings
    }

    #[must_use]
    pub const fn variant(&self) -> Variant {
        self.variant
    }

    /// Pop probability once a balloon of `balloon_type` reaches `size`.
    ///
    /// # Errors
    ///
    /// Returns [`SizeOutOfRange`] when `size` is zero or beyond the largest
    /// tabulated size for that type.
    pub fn probability_of_pop(
        &self,
        balloon_type: BalloonType,
        size: u32,
    ) -> Result<f64, SizeOutOfRange> {
        let curve = self.curve(balloon_type).unwrap_or(&[]);
        let out_of_range = SizeOutOfRange {
            balloon_type,
            size,
            max_size: u32::try_from(curve.len()).unwrap_or(u32::MAX),
        };
        let idx = usize::try_from(size.checked_sub(1).ok_or(out_of_range)?)
            .map_err(|_| out_of_range)?;
        curve.get(idx).copied().ok_or(out_of_range)
    }

    /// Largest tabulated size for `balloon_type`, or zero if it has no curve.
    #[must_use]
    pub fn max_size(&self, balloon_type: BalloonType) -> u32 {
        self.curve(balloon_type)
            .map_or(0, |c| u32::try_from(c.len()).unwrap_or(u32::MAX))
    }

    /// How far a balloon of `balloon_type` may be inflated in a round.
    #[must_use]
    pub fn inflation_cap(&self, balloon_type: BalloonType) -> u32 {
        let tabulated = self.max_size(balloon_type);
        balloon_type
            .max_inflations()
            .map_or(tabulated, |cap| cap.min(tabulated))
    }

    #[must_use]
    pub fn curve(&self, balloon_type: BalloonType) -> Option<&[f64]> {
        self.curves.get(&balloon_type).map(Vec::as_slice)
    }
}

fn parse_probability(cell: &str) -> Result<f64, String> {
    let value: f64 = cell
        .parse()
        .map_err(|_| format!("probability `{cell}` is not numeric"))?;
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(format!("probability {value} is outside [0, 1]"));
    }
    Ok(value)
}
