//! Per-sheet layout normalization.
//!
//! The economic model workbooks keep their real column labels inside the
//! data area, follow them with a units row, and repeat labels for running
//! totals. Each known sheet gets its own set of fixes; [`SheetKind`] picks
//! the right one by sheet name and anything else passes through untouched.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use econ_core::columns::{is_date_column, CUMULATIVE_PREFIX, DATE, MONTH};
use econ_core::formatting::{percent_label, percent_text};
use econ_core::models::{CellValue, Column, RawSheet, Sheet, Table, Workbook};
use econ_core::{EconError, Result};

use crate::dates::to_date_cell;

/// Columns kept from the Supply sheet.
const SUPPLY_COLUMNS: usize = 6;

/// Label given to the second occurrence of a bare `Cumulative` column.
const CUMULATIVE_EMISSION: &str = "Cumulative Emission";

// ── SheetKind ─────────────────────────────────────────────────────────────────

/// The sheet layouts known to the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetKind {
    Unlock,
    Overview,
    Supply,
    Issuance,
    /// `Relative-Yield` and `Absolute-Yield`.
    Yield,
}

impl SheetKind {
    /// Resolve the layout for a workbook sheet name.
    pub fn from_sheet_name(name: &str) -> Option<Self> {
        match name {
            "Unlock" => Some(SheetKind::Unlock),
            "Overview" => Some(SheetKind::Overview),
            "Supply" => Some(SheetKind::Supply),
            "Issuance" => Some(SheetKind::Issuance),
            "Relative-Yield" | "Absolute-Yield" => Some(SheetKind::Yield),
            _ => None,
        }
    }

    /// `true` for sheets indexed by a `Month` column.
    pub fn is_monthly(self) -> bool {
        matches!(
            self,
            SheetKind::Unlock | SheetKind::Supply | SheetKind::Issuance
        )
    }

    /// Apply this layout's fixes to `raw`.
    pub fn normalize(self, raw: &RawSheet) -> Result<Table> {
        let mut table = match self {
            SheetKind::Unlock => normalize_unlock(raw)?,
            SheetKind::Overview => normalize_overview(raw)?,
            SheetKind::Supply => normalize_supply(raw)?,
            SheetKind::Issuance => normalize_issuance(raw)?,
            SheetKind::Yield => normalize_yield(raw)?,
        };
        table.drop_empty_columns();
        table.drop_empty_rows();
        debug!(
            sheet = %raw.name,
            kind = ?self,
            columns = table.column_count(),
            rows = table.row_count(),
            "sheet normalized"
        );
        Ok(table)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Normalize one sheet, dispatching on its name.
pub fn normalize_sheet(raw: &RawSheet) -> Result<Table> {
    match SheetKind::from_sheet_name(&raw.name) {
        Some(kind) => kind.normalize(raw),
        None => {
            debug!(sheet = %raw.name, "no normalizer registered; passing through");
            Ok(passthrough(raw))
        }
    }
}

/// Normalize every sheet of a workbook.
///
/// The first failing sheet aborts the whole workbook; the error names it.
pub fn normalize_workbook(path: &Path, sheets: Vec<RawSheet>) -> Result<Workbook> {
    let mut normalized = Vec::with_capacity(sheets.len());
    for raw in sheets {
        let table = normalize_sheet(&raw).map_err(|e| EconError::SheetLoad {
            sheet: raw.name.clone(),
            source: Box::new(e),
        })?;
        normalized.push(Sheet {
            name: raw.name,
            table,
        });
    }
    info!(
        path = %path.display(),
        sheets = normalized.len(),
        "workbook normalized"
    );
    Ok(Workbook {
        path: path.to_path_buf(),
        sheets: normalized,
    })
}

/// Use the sheet's first physical row as column names and keep every other
/// row as is.
pub fn passthrough(raw: &RawSheet) -> Table {
    let width = raw.width();
    let names = unique_names(header_labels((0..width).map(|c| raw.header_cell(c))));
    build_table(raw, names, (0..width).collect(), 0)
}

// ── Variants ──────────────────────────────────────────────────────────────────

fn normalize_unlock(raw: &RawSheet) -> Result<Table> {
    require_rows(raw, 3)?;
    let width = raw.width();
    let labels = header_labels((0..width).map(|c| raw.cell(0, c)));

    // A repeated label is the running total of the column it repeats.
    let mut seen: HashSet<String> = HashSet::new();
    let mut names: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        if seen.contains(&label) {
            if label == "Cumulative" {
                names.push(CUMULATIVE_EMISSION.to_string());
            } else {
                names.push(format!("{}{}", CUMULATIVE_PREFIX, label));
            }
        } else {
            seen.insert(label.clone());
            names.push(label);
        }
    }

    // Only the first date column survives.
    let mut date_seen = false;
    let mut keep: Vec<usize> = Vec::with_capacity(names.len());
    for (idx, name) in names.iter().enumerate() {
        if is_date_column(name) {
            if date_seen {
                continue;
            }
            date_seen = true;
        }
        keep.push(idx);
    }
    let mut kept: Vec<String> = keep.iter().map(|&i| names[i].clone()).collect();
    rename_first(&mut kept, MONTH);

    let mut table = build_table(raw, unique_names(kept), keep, 2);
    truncate_dates(&mut table, &raw.name)?;
    Ok(table)
}

fn normalize_overview(raw: &RawSheet) -> Result<Table> {
    let width = raw.width();
    if width < 2 {
        return Err(EconError::malformed(
            &raw.name,
            format!("expected at least 2 columns, found {}", width),
        ));
    }
    let mut names = header_labels((0..width).map(|c| raw.header_cell(c)));
    names[1] = "Value".to_string();
    Ok(build_table(raw, unique_names(names), (0..width).collect(), 0))
}

fn normalize_supply(raw: &RawSheet) -> Result<Table> {
    require_rows(raw, 1)?;
    let width = raw.width().min(SUPPLY_COLUMNS);
    let mut names = header_labels((0..width).map(|c| raw.cell(0, c)));
    rename_first(&mut names, MONTH);

    let mut table = build_table(raw, unique_names(names), (0..width).collect(), 2);
    truncate_dates(&mut table, &raw.name)?;
    Ok(table)
}

fn normalize_issuance(raw: &RawSheet) -> Result<Table> {
    require_rows(raw, 1)?;
    let width = raw.width();
    let mut names = header_labels((0..width).map(|c| raw.cell(0, c)));
    rename_first(&mut names, MONTH);
    for name in names.iter_mut() {
        match name.as_str() {
            "Relative Issuance" => *name = "Relative Issuance %".to_string(),
            "Absolute issuance" => *name = "Absolute issuance %".to_string(),
            _ => {}
        }
    }

    let mut table = build_table(raw, unique_names(names), (0..width).collect(), 2);
    truncate_dates(&mut table, &raw.name)?;
    Ok(table)
}

fn normalize_yield(raw: &RawSheet) -> Result<Table> {
    require_rows(raw, 1)?;
    let width = raw.width();
    let header: Vec<&CellValue> = (0..width).map(|c| raw.cell(0, c)).collect();
    let mut names = header_labels(header.iter().copied());

    let mut table = build_table(raw, names.clone(), (0..width).collect(), 1);
    truncate_dates(&mut table, &raw.name)?;

    for (idx, name) in names.iter_mut().enumerate() {
        if name.as_str() == DATE {
            continue;
        }
        let Some(column) = table.column_at_mut(idx) else {
            continue;
        };
        if !is_fractional(column) {
            continue;
        }
        // A numeric header is the yield target itself; otherwise the label
        // comes from the final row.
        let fraction = header[idx]
            .as_f64()
            .or_else(|| column.values.last().and_then(CellValue::as_f64))
            .or_else(|| column.numbers().last());
        if let Some(fraction) = fraction {
            *name = percent_label(fraction);
        }
        for value in column.values.iter_mut() {
            if let CellValue::Number(n) = value {
                *value = CellValue::Text(percent_text(*n));
            }
        }
    }

    let names = unique_names(names);
    for (idx, name) in names.into_iter().enumerate() {
        if let Some(column) = table.column_at_mut(idx) {
            column.name = name;
        }
    }
    Ok(table)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn require_rows(raw: &RawSheet, min: usize) -> Result<()> {
    if raw.row_count() < min {
        return Err(EconError::malformed(
            &raw.name,
            format!("expected at least {} rows, found {}", min, raw.row_count()),
        ));
    }
    Ok(())
}

/// Turn header cells into labels; blank cells become `Unnamed: <index>`.
fn header_labels<'a>(cells: impl Iterator<Item = &'a CellValue>) -> Vec<String> {
    cells
        .enumerate()
        .map(|(idx, cell)| cell.label().unwrap_or_else(|| format!("Unnamed: {}", idx)))
        .collect()
}

fn rename_first(names: &mut [String], to: &str) {
    if let Some(first) = names.first_mut() {
        *first = to.to_string();
    }
}

/// Disambiguate repeated names with a `.<n>` suffix: `Team`, `Team.1`, `Team.2`.
fn unique_names(names: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(names.len());
    let mut result = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = name.clone();
        let mut n = 1;
        while taken.contains(&candidate) {
            candidate = format!("{}.{}", name, n);
            n += 1;
        }
        taken.insert(candidate.clone());
        result.push(candidate);
    }
    result
}

/// Build a table from `raw` using `sources[i]` as the grid column for
/// `names[i]`, starting at data row `first_row`.
fn build_table(raw: &RawSheet, names: Vec<String>, sources: Vec<usize>, first_row: usize) -> Table {
    let rows = raw.row_count().saturating_sub(first_row);
    let columns = names
        .into_iter()
        .zip(sources)
        .map(|(name, col)| {
            let values = (first_row..first_row + rows)
                .map(|row| raw.cell(row, col).clone())
                .collect();
            Column::new(name, values)
        })
        .collect();
    Table::from_columns(columns)
}

/// Truncate the `Date` column, if any, to calendar-date precision.
fn truncate_dates(table: &mut Table, sheet: &str) -> Result<()> {
    let Some(column) = table.column_mut(DATE) else {
        return Ok(());
    };
    for (row, value) in column.values.iter_mut().enumerate() {
        *value = to_date_cell(value)
            .map_err(|reason| EconError::malformed(sheet, format!("row {}: {}", row, reason)))?;
    }
    Ok(())
}

/// All non-empty cells are numbers and at least one has a fractional part.
fn is_fractional(column: &Column) -> bool {
    let mut any_fraction = false;
    for value in &column.values {
        match value {
            CellValue::Number(n) => any_fraction |= n.fract() != 0.0,
            v if v.is_empty() => {}
            _ => return false,
        }
    }
    any_fraction
}

// ── Tests ─────────────────────────────────────────────────────────────────────
