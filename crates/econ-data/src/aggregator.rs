//! Monthly → quarterly → yearly rollups of the model's monthly sheets.

use std::ops::RangeInclusive;

use serde::Serialize;

use econ_core::columns::{ColumnKind, MONTH};
use econ_core::models::{CellValue, Column, Period, Table};
use econ_core::{EconError, Result};

/// Columns read by [`with_issuance_ratio`].
pub const RELATIVE_ISSUANCE: &str = "Relative Issuance %";
pub const ABSOLUTE_ISSUANCE: &str = "Absolute issuance %";
/// Column added by [`with_issuance_ratio`].
pub const ISSUANCE_RATIO: &str = "Issuance Ratio";

// ── AggregatedRow ─────────────────────────────────────────────────────────────

/// One column's rolled-up value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedValue {
    pub column: String,
    pub kind: ColumnKind,
    pub value: CellValue,
}

/// A single reporting period rolled up from monthly rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    pub period: Period,
    /// The requested period index; `None` for the latest period.
    pub index: Option<u32>,
    /// `Month` of the first and last row in the window.
    pub first_month: Option<i64>,
    pub last_month: Option<i64>,
    /// Number of monthly rows in the window.
    pub months: usize,
    /// One entry per source column, in table order.
    pub values: Vec<AggregatedValue>,
}

impl AggregatedRow {
    /// Rolled-up value of column `name`.
    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.values
            .iter()
            .find(|v| v.column == name)
            .map(|v| &v.value)
    }

    /// Numeric rolled-up value of column `name`.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(CellValue::as_f64)
    }

    /// `true` when the window holds fewer months than the period length.
    pub fn is_partial(&self) -> bool {
        self.months < self.period.months() as usize
    }
}

// ── PeriodAggregator ──────────────────────────────────────────────────────────

/// Stateless helper that rolls monthly rows up into periods.
pub struct PeriodAggregator;

impl PeriodAggregator {
    /// Roll up one period of `table`.
    ///
    /// With `index = Some(p)` the window is the `period.months()` rows ending
    /// at the row whose `Month` is `p * period.months()`, clamped at the
    /// first row. With `None` it is the table's trailing rows.
    pub fn aggregate(table: &Table, period: Period, index: Option<u32>) -> Result<AggregatedRow> {
        let window = Self::window(table, period, index)?;
        Ok(Self::rollup(table, period, index, window))
    }

    /// Roll up every period whose anchor month exists in `table`, in month
    /// order.
    pub fn aggregate_all(table: &Table, period: Period) -> Result<Vec<AggregatedRow>> {
        Self::period_indices(table, period)?
            .into_iter()
            .map(|index| Self::aggregate(table, period, Some(index)))
            .collect()
    }

    /// Period indices available in `table`: `month / L` for every month
    /// divisible by the period length.
    pub fn period_indices(table: &Table, period: Period) -> Result<Vec<u32>> {
        let months = table
            .months()
            .ok_or_else(|| EconError::missing_column(MONTH))?;
        let len = i64::from(period.months());
        Ok(months
            .into_iter()
            .flatten()
            .filter(|m| *m >= 0 && m % len == 0)
            .map(|m| (m / len) as u32)
            .collect())
    }

    // ── Private ───────────────────────────────────────────────────────────────

    fn window(table: &Table, period: Period, index: Option<u32>) -> Result<RangeInclusive<usize>> {
        if !table.has_column(MONTH) {
            return Err(EconError::missing_column(MONTH));
        }
        let rows = table.row_count();
        if rows == 0 {
            return Err(EconError::EmptyTable);
        }
        let span = period.months() as usize;

        match index {
            Some(p) => {
                let anchor = i64::from(p) * i64::from(period.months());
                let end = table
                    .month_row(anchor)
                    .ok_or(EconError::PeriodNotFound { period, index: p })?;
                Ok(end.saturating_sub(span - 1)..=end)
            }
            None => Ok(rows.saturating_sub(span)..=rows - 1),
        }
    }

    fn rollup(
        table: &Table,
        period: Period,
        index: Option<u32>,
        window: RangeInclusive<usize>,
    ) -> AggregatedRow {
        let values = table
            .columns()
            .iter()
            .map(|column| {
                let kind = ColumnKind::classify(&column.name);
                let cells = &column.values[window.clone()];
                let value = if kind.takes_last_value() {
                    last_value(cells)
                } else {
                    sum_or_last(cells)
                };
                AggregatedValue {
                    column: column.name.clone(),
                    kind,
                    value,
                }
            })
            .collect();

        let month_at = |row: usize| table.cell(row, MONTH).and_then(CellValue::as_month);
        AggregatedRow {
            period,
            index,
            first_month: month_at(*window.start()),
            last_month: month_at(*window.end()),
            months: window.end() - window.start() + 1,
            values,
        }
    }
}

/// Value of the window's final row.
fn last_value(cells: &[CellValue]) -> CellValue {
    cells.last().cloned().unwrap_or_default()
}

/// Sum of the numeric cells; the final value when there are none.
fn sum_or_last(cells: &[CellValue]) -> CellValue {
    let mut numbers = cells.iter().filter_map(CellValue::as_f64).peekable();
    if numbers.peek().is_none() {
        return last_value(cells);
    }
    CellValue::Number(numbers.sum())
}

// ── Issuance ratio ────────────────────────────────────────────────────────────

/// Copy of `table` with an `Issuance Ratio` column:
/// `Relative Issuance % / Absolute issuance %` per row.
///
/// Zero or non-numeric denominators give `NaN` rather than an error.
pub fn with_issuance_ratio(table: &Table) -> Result<Table> {
    let relative = table
        .column(RELATIVE_ISSUANCE)
        .ok_or_else(|| EconError::missing_column(RELATIVE_ISSUANCE))?;
    let absolute = table
        .column(ABSOLUTE_ISSUANCE)
        .ok_or_else(|| EconError::missing_column(ABSOLUTE_ISSUANCE))?;

    let ratios: Vec<CellValue> = relative
        .values
        .iter()
        .zip(&absolute.values)
        .map(|(rel, abs)| CellValue::Number(safe_ratio(rel.as_f64(), abs.as_f64())))
        .collect();

    let mut result = table.clone();
    result.retain_columns(|c| c.name != ISSUANCE_RATIO);
    result.push_column(Column::new(ISSUANCE_RATIO, ratios))?;
    Ok(result)
}

fn safe_ratio(numerator: Option<f64>, denominator: Option<f64>) -> f64 {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => n / d,
        _ => f64::NAN,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
