//! Sheet views and their text / JSON rendering.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use comfy_table::{Cell, CellAlignment, Table as TextTable};
use serde::Serialize;

use econ_core::columns::ColumnKind;
use econ_core::formatting::format_number;
use econ_core::models::{CellValue, Period, Table};
use econ_core::{EconError, Result};
use econ_data::aggregator::{with_issuance_ratio, AggregatedRow, PeriodAggregator};
use econ_data::analysis::{
    cumulative_snapshot, distribution, overview_entries, CumulativeValue, DistributionSlice,
    OverviewEntry,
};
use econ_data::normalizer::SheetKind;

/// Options shared by every sheet view.
#[derive(Debug, Clone, Copy)]
pub struct ViewOptions {
    pub period: Period,
    pub index: Option<u32>,
    pub epoch_year: i32,
    /// Add a period summary to monthly sheets.
    pub summarize: bool,
}

/// A rolled-up period with its human label.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodSummary {
    pub label: String,
    #[serde(flatten)]
    pub row: AggregatedRow,
}

/// Everything shown for one sheet.
#[derive(Debug, Clone, Serialize)]
pub struct SheetView {
    pub name: String,
    pub table: Table,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PeriodSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cumulative: Vec<CumulativeValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub distribution: Vec<DistributionSlice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overview: Vec<OverviewEntry>,
}

// ── Building views ────────────────────────────────────────────────────────────

/// Build the view of sheet `name`.
///
/// Issuance sheets gain the `Issuance Ratio` column when both issuance
/// columns are present. Unlock sheets gain their cumulative totals and
/// distribution, and Overview sheets their key figures. Monthly sheets get a
/// period summary when requested.
pub fn sheet_view(name: &str, table: &Table, options: &ViewOptions) -> Result<SheetView> {
    let kind = SheetKind::from_sheet_name(name);

    let table = match kind {
        Some(SheetKind::Issuance) => match with_issuance_ratio(table) {
            Ok(with_ratio) => with_ratio,
            Err(EconError::MissingColumn { column }) => {
                tracing::warn!(
                    "Sheet '{}' has no '{}' column; skipping Issuance Ratio",
                    name,
                    column
                );
                table.clone()
            }
            Err(e) => return Err(e),
        },
        _ => table.clone(),
    };

    let summary = match kind {
        Some(k) if k.is_monthly() && options.summarize => Some(summarize(&table, options)?),
        _ => None,
    };

    let (cumulative, slices) = match kind {
        Some(SheetKind::Unlock) if !table.is_empty() => {
            let month = summary.as_ref().and_then(|s| s.row.last_month);
            (
                cumulative_snapshot(&table, month)?,
                distribution(&table, month)?,
            )
        }
        _ => (Vec::new(), Vec::new()),
    };

    let overview = match kind {
        Some(SheetKind::Overview) => overview_entries(&table)?,
        _ => Vec::new(),
    };

    Ok(SheetView {
        name: name.to_string(),
        table,
        summary,
        cumulative,
        distribution: slices,
        overview,
    })
}

fn summarize(table: &Table, options: &ViewOptions) -> Result<PeriodSummary> {
    let row = PeriodAggregator::aggregate(table, options.period, options.index)?;
    let label = match (options.index, row.last_month) {
        (Some(index), _) => options.period.label(index, options.epoch_year),
        (None, Some(month)) => format!("Latest {} period (through month {})", options.period, month),
        (None, None) => format!("Latest {} period", options.period),
    };
    Ok(PeriodSummary { label, row })
}

// ── Text rendering ────────────────────────────────────────────────────────────

/// Workbook listing for `dir`.
pub fn listing_text(dir: &Path, files: &BTreeMap<String, PathBuf>) -> String {
    if files.is_empty() {
        return format!("No workbooks found in {}", dir.display());
    }
    let mut table = TextTable::new();
    table.set_header(vec!["Workbook", "Path"]);
    for (name, path) in files {
        table.add_row(vec![Cell::new(name), Cell::new(path.display())]);
    }
    format!("Workbooks in {}\n{table}", dir.display())
}

/// Full text rendering of one sheet view.
pub fn sheet_text(view: &SheetView) -> String {
    let mut out = format!("== {} ==\n", view.name);

    if view.overview.is_empty() {
        out.push_str(&table_text(&view.table));
    } else {
        let mut table = TextTable::new();
        table.set_header(vec!["Metric", "Value"]);
        for entry in &view.overview {
            table.add_row(vec![
                Cell::new(&entry.name),
                Cell::new(&entry.display).set_alignment(CellAlignment::Right),
            ]);
        }
        out.push_str(&table.to_string());
    }

    if let Some(summary) = &view.summary {
        let mut table = TextTable::new();
        table.set_header(vec!["Column", "Value"]);
        for value in &summary.row.values {
            if value.kind == ColumnKind::Identifier {
                continue;
            }
            table.add_row(vec![Cell::new(&value.column), value_cell(&value.value)]);
        }
        out.push_str(&format!(
            "\n\n{} ({} months)\n{table}",
            summary.label, summary.row.months
        ));
    }

    if !view.cumulative.is_empty() {
        let mut table = TextTable::new();
        table.set_header(vec!["Allocation", "Cumulative Total"]);
        for item in &view.cumulative {
            table.add_row(vec![Cell::new(&item.label), value_cell(&item.value)]);
        }
        out.push_str(&format!("\n\nCumulative Total\n{table}"));
    }

    if !view.distribution.is_empty() {
        let mut table = TextTable::new();
        table.set_header(vec!["Allocation", "Tokens", "Share"]);
        for slice in &view.distribution {
            table.add_row(vec![
                Cell::new(&slice.label),
                Cell::new(format_number(slice.value, 0)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.1}%", slice.share)).set_alignment(CellAlignment::Right),
            ]);
        }
        out.push_str(&format!("\n\nDistribution\n{table}"));
    }

    out.push('\n');
    out
}

/// Grid of a whole table, numbers right-aligned.
pub fn table_text(table: &Table) -> String {
    if table.column_count() == 0 {
        return "(empty sheet)".to_string();
    }

    let mut grid = TextTable::new();
    grid.set_header(table.column_names());
    for row in 0..table.row_count() {
        grid.add_row(
            table
                .columns()
                .iter()
                .map(|column| value_cell(&column.values[row]))
                .collect::<Vec<_>>(),
        );
    }
    grid.to_string()
}

/// Table cell for a value; numbers are right-aligned.
fn value_cell(value: &CellValue) -> Cell {
    let cell = Cell::new(cell_text(value));
    match value {
        CellValue::Number(_) => cell.set_alignment(CellAlignment::Right),
        _ => cell,
    }
}

/// Display form of a cell: grouped numbers, `NaN` for undefined ratios.
fn cell_text(value: &CellValue) -> String {
    match value {
        CellValue::Number(n) if n.is_nan() => "NaN".to_string(),
        CellValue::Number(n) if n.fract() == 0.0 => format_number(*n, 0),
        CellValue::Number(n) if n.abs() < 1.0 => format!("{:.4}", n),
        CellValue::Number(n) => format_number(*n, 2),
        other => other.to_string(),
    }
}

// ── JSON rendering ────────────────────────────────────────────────────────────

/// Pretty JSON for any view. Non-finite numbers serialize as `null`.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(EconError::from)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
