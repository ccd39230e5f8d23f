//! Point-in-time views over normalized sheets: cumulative totals at a month,
//! the token distribution, and the Overview key figures.

use serde::Serialize;

use econ_core::columns::{display_label, CUMULATIVE_PREFIX, MONTH};
use econ_core::formatting::{percent_text, percentage};
use econ_core::models::{CellValue, Table};
use econ_core::{EconError, Result};

/// Label of the slice that groups emission columns.
pub const TOTAL_EMISSION: &str = "Total Emission";

/// Overview rows shown as whole numbers.
const WHOLE_NUMBER_ENTRIES: &[&str] = &["Annual TIA Reward", "Total Token"];
/// Overview row holding a fraction shown as a percentage.
const TARGET_YIELD: &str = "Target Yield %";

// ── Types ─────────────────────────────────────────────────────────────────────

/// A cumulative column's value at one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativeValue {
    /// Column name without the `Cumulative ` prefix.
    pub label: String,
    pub value: CellValue,
}

/// One slice of the token distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSlice {
    pub label: String,
    pub value: f64,
    /// Share of the distribution total, in percent (one decimal).
    pub share: f64,
}

/// One key figure of the Overview sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewEntry {
    pub name: String,
    pub display: String,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Every `Cumulative ` column at `month`, or at the last row when `month` is
/// `None`.
pub fn cumulative_snapshot(table: &Table, month: Option<i64>) -> Result<Vec<CumulativeValue>> {
    let row = snapshot_row(table, month)?;
    Ok(table
        .columns()
        .iter()
        .filter(|c| c.name.contains(CUMULATIVE_PREFIX))
        .map(|c| CumulativeValue {
            label: display_label(&c.name).to_string(),
            value: c.values[row].clone(),
        })
        .collect())
}

/// Token distribution at `month` (or the last row).
///
/// Non-emission cumulative columns become one slice each. Emission columns
/// are folded into a single [`TOTAL_EMISSION`] slice that is only present
/// when positive. Non-numeric cells count as zero.
pub fn distribution(table: &Table, month: Option<i64>) -> Result<Vec<DistributionSlice>> {
    let row = snapshot_row(table, month)?;

    let mut slices: Vec<(String, f64)> = Vec::new();
    let mut emission = 0.0;
    for column in table
        .columns()
        .iter()
        .filter(|c| c.name.contains(CUMULATIVE_PREFIX))
    {
        let value = column.values[row].as_f64().unwrap_or(0.0);
        if column.name.contains("Emission") {
            emission += value;
        } else if !column.name.contains('%') {
            slices.push((display_label(&column.name).to_string(), value));
        }
    }
    if emission > 0.0 {
        slices.push((TOTAL_EMISSION.to_string(), emission));
    }

    let total: f64 = slices.iter().map(|(_, v)| v).sum();
    Ok(slices
        .into_iter()
        .map(|(label, value)| DistributionSlice {
            share: percentage(value, total, 1),
            label,
            value,
        })
        .collect())
}

/// The Overview sheet as display-ready `(name, value)` pairs, taken from the
/// first two columns.
pub fn overview_entries(table: &Table) -> Result<Vec<OverviewEntry>> {
    let (names, values) = match table.columns() {
        [names, values, ..] => (names, values),
        _ => return Err(EconError::missing_column("Value")),
    };

    Ok(names
        .values
        .iter()
        .zip(&values.values)
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| {
            let name = name.to_string();
            let display = format_overview_value(&name, value);
            OverviewEntry { name, display }
        })
        .collect())
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn snapshot_row(table: &Table, month: Option<i64>) -> Result<usize> {
    if table.is_empty() {
        return Err(EconError::EmptyTable);
    }
    match month {
        None => Ok(table.row_count() - 1),
        Some(m) => {
            if !table.has_column(MONTH) {
                return Err(EconError::missing_column(MONTH));
            }
            table
                .month_row(m)
                .ok_or(EconError::MonthNotFound { month: m })
        }
    }
}

fn format_overview_value(name: &str, value: &CellValue) -> String {
    match value.as_f64() {
        Some(v) if WHOLE_NUMBER_ENTRIES.contains(&name) => format!("{:.0}", v),
        Some(v) if name == TARGET_YIELD => percent_text(v),
        Some(v) => format!("{:.2}%", v),
        None => value.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
