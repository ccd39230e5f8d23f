//! Column naming conventions shared by the sheet normalizers and the period
//! aggregator.
//!
//! Workbooks carry no column metadata, so a column's role is inferred from
//! its name. [`ColumnKind::classify`] is the single place that decision is
//! made.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Name of the month-offset column on monthly sheets.
pub const MONTH: &str = "Month";
/// Name of the calendar date column.
pub const DATE: &str = "Date";
/// Prefix given to the running-total twin of a flow column.
pub const CUMULATIVE_PREFIX: &str = "Cumulative ";
/// Marker of the circulating supply percentage column.
pub const CIRCULATING_SUPPLY_PCT: &str = "Circulating Supply %";

/// How a column behaves when monthly rows are rolled up into a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// `Month` / `Date`: re-derived as the period boundary.
    Identifier,
    /// `Cumulative X`: running total of a flow, taken at period end.
    Cumulative,
    /// Percentages and bare running totals, taken at period end.
    Ratio,
    /// Per-month amounts, summed over the period.
    Flow,
}

impl ColumnKind {
    /// Classify a column by its (normalized) name.
    ///
    /// ```
    /// use econ_core::columns::ColumnKind;
    ///
    /// assert_eq!(ColumnKind::classify("Month"), ColumnKind::Identifier);
    /// assert_eq!(ColumnKind::classify("Cumulative Team"), ColumnKind::Cumulative);
    /// assert_eq!(ColumnKind::classify("Cumulative"), ColumnKind::Ratio);
    /// assert_eq!(ColumnKind::classify("Circulating Supply %"), ColumnKind::Ratio);
    /// assert_eq!(ColumnKind::classify("Team"), ColumnKind::Flow);
    /// ```
    pub fn classify(name: &str) -> Self {
        if name == MONTH || is_date_column(name) {
            ColumnKind::Identifier
        } else if name.contains(CIRCULATING_SUPPLY_PCT) || name.contains('%') {
            ColumnKind::Ratio
        } else if name.starts_with(CUMULATIVE_PREFIX) {
            ColumnKind::Cumulative
        } else if is_running_total(name) {
            ColumnKind::Ratio
        } else {
            ColumnKind::Flow
        }
    }

    /// `true` when the period value is the window's last value rather than
    /// a sum.
    pub fn takes_last_value(self) -> bool {
        !matches!(self, ColumnKind::Flow)
    }
}

/// `true` for columns carrying a calendar date (`Date`, `Date.1`, `Unlock Date`).
pub fn is_date_column(name: &str) -> bool {
    name.contains(DATE)
}

/// `true` for a genuine running-total column: the whole word `Cumulative`
/// appears but not in the `Cumulative X` form used for renamed flows.
pub fn is_running_total(name: &str) -> bool {
    static WORD: OnceLock<Regex> = OnceLock::new();
    let re = WORD.get_or_init(|| Regex::new(r"\bCumulative\b").expect("regex is valid"));
    re.is_match(name) && !name.contains(CUMULATIVE_PREFIX)
}

/// Strip the `Cumulative ` prefix for display: `"Cumulative Team"` → `"Team"`.
pub fn display_label(name: &str) -> &str {
    name.strip_prefix(CUMULATIVE_PREFIX).unwrap_or(name)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
