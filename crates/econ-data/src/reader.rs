//! Workbook discovery and reading.
//!
//! Finds spreadsheet files in the model directory and turns every sheet of a
//! workbook into a [`RawSheet`] for the normalizer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use econ_core::models::{CellValue, RawSheet};
use econ_core::{EconError, Result};

use crate::dates::excel_serial_to_datetime;

/// File extensions recognised as workbooks (compared case-insensitively).
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm", "xlsb", "ods"];

// ── SheetSource ───────────────────────────────────────────────────────────────

/// Anything that can produce the raw sheets of a workbook file.
pub trait SheetSource: Send + Sync {
    /// Read every sheet of the workbook at `path`, in workbook order.
    fn read_sheets(&self, path: &Path) -> Result<Vec<RawSheet>>;
}

/// Reads workbooks from disk with `calamine`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalamineSource;

impl SheetSource for CalamineSource {
    fn read_sheets(&self, path: &Path) -> Result<Vec<RawSheet>> {
        read_workbook(path)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// `true` when `path` has a workbook extension.
pub fn is_workbook_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Map every workbook file directly inside `dir` from file name to path.
///
/// A missing directory yields an empty map.
pub fn find_workbooks(dir: &Path) -> BTreeMap<String, PathBuf> {
    if !dir.is_dir() {
        warn!("Workbook directory does not exist: {}", dir.display());
        return BTreeMap::new();
    }

    let files: BTreeMap<String, PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_workbook_file(entry.path()))
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            Some((name, entry.into_path()))
        })
        .collect();

    debug!("Found {} workbooks in {}", files.len(), dir.display());
    files
}

/// Read every sheet of the workbook at `path`.
///
/// The first physical row of each sheet becomes [`RawSheet::header`].
pub fn read_workbook(path: &Path) -> Result<Vec<RawSheet>> {
    if !path.exists() {
        return Err(EconError::FileNotFound(path.to_path_buf()));
    }

    let mut workbook = open_workbook_auto(path).map_err(|e| EconError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| EconError::Workbook {
                path: path.to_path_buf(),
                message: format!("sheet '{}': {}", name, e),
            })?;
        let sheet = range_to_raw_sheet(&name, &range);
        debug!(
            "Read sheet '{}' from {}: {} rows x {} columns",
            name,
            path.display(),
            sheet.row_count(),
            sheet.width()
        );
        sheets.push(sheet);
    }

    Ok(sheets)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Convert a calamine range into a grid anchored at cell A1.
///
/// calamine trims leading blank rows and columns; they are restored so row
/// and column positions match the sheet.
fn range_to_raw_sheet(name: &str, range: &Range<Data>) -> RawSheet {
    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut grid: Vec<Vec<CellValue>> = vec![Vec::new(); start_row];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col];
        cells.extend(row.iter().map(convert_cell));
        grid.push(cells);
    }

    let mut rows = grid.into_iter();
    let header = rows.next().unwrap_or_default();
    RawSheet::new(name, header, rows.collect())
}

/// Map a calamine cell onto the model's cell type.
fn convert_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_iso(s),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        // Formula errors (#DIV/0!, #N/A) read as blanks.
        Data::Error(_) => CellValue::Empty,
    }
}

fn parse_iso(s: &str) -> CellValue {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return CellValue::DateTime(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return CellValue::Date(d);
    }
    CellValue::Text(s.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
