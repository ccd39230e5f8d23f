use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::columns::MONTH;
use crate::error::EconError;
use crate::formatting::format_label_number;

static EMPTY_CELL: CellValue = CellValue::Empty;

// ── CellValue ─────────────────────────────────────────────────────────────────

/// A single typed spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    /// Blank cell.
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    /// Calendar date without a time component.
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Text(String),
}

impl CellValue {
    /// `true` for blank cells and whitespace-only text.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric value, if this is a number cell.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Integral value of a number cell (`3.0` → `3`).
    pub fn as_month(&self) -> Option<i64> {
        match self {
            CellValue::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            _ => None,
        }
    }

    /// Text suitable as a column name; `None` for empty cells.
    pub fn label(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(match self {
            CellValue::Text(s) => s.trim().to_string(),
            other => other.to_string(),
        })
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) => write!(f, "{}", format_label_number(*n)),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

// ── RawSheet ──────────────────────────────────────────────────────────────────

/// A sheet as read from a workbook, before normalization.
///
/// `header` is the sheet's first physical row. Most sheets of the model keep
/// their real labels in the next row, so normalizers decide which of the two
/// to trust.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSheet {
    pub name: String,
    pub header: Vec<CellValue>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, header: Vec<CellValue>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            header,
            rows,
        }
    }

    /// Number of data rows (the header row excluded).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row, header included.
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }

    /// Cell at `(row, col)`; missing cells of ragged rows read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Header cell at `col`.
    pub fn header_cell(&self, col: usize) -> &CellValue {
        self.header.get(col).unwrap_or(&EMPTY_CELL)
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// A named column of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// `true` when every cell is empty.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(CellValue::is_empty)
    }

    /// Numeric cells, skipping anything that is not a number.
    pub fn numbers(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().filter_map(CellValue::as_f64)
    }
}

/// A normalized sheet: ordered, uniquely named columns of equal length.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Build a table from columns, padding shorter columns with empty cells.
    pub fn from_columns(mut columns: Vec<Column>) -> Self {
        let rows = columns.iter().map(|c| c.values.len()).max().unwrap_or(0);
        for column in &mut columns {
            column.values.resize(rows, CellValue::Empty);
        }
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Cell at `row` of column `name`.
    pub fn cell(&self, row: usize, name: &str) -> Option<&CellValue> {
        self.column(name).and_then(|c| c.values.get(row))
    }

    /// Append a column. Returns an error when the name already exists or the
    /// length does not match the table.
    pub fn push_column(&mut self, column: Column) -> crate::error::Result<()> {
        if self.has_column(&column.name) {
            return Err(EconError::Config(format!(
                "duplicate column name: {}",
                column.name
            )));
        }
        if !self.columns.is_empty() && column.values.len() != self.row_count() {
            return Err(EconError::Config(format!(
                "column '{}' has {} rows, table has {}",
                column.name,
                column.values.len(),
                self.row_count()
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Rename column `from` to `to`. Returns `false` when `from` is absent.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.columns.iter_mut().find(|c| c.name == from) {
            Some(column) => {
                column.name = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Mutable access to the column at `index`.
    pub fn column_at_mut(&mut self, index: usize) -> Option<&mut Column> {
        self.columns.get_mut(index)
    }

    /// Mutable access to column `name`.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Keep only the columns for which `keep` returns `true`.
    pub fn retain_columns(&mut self, mut keep: impl FnMut(&Column) -> bool) {
        self.columns.retain(|c| keep(c));
    }

    /// Remove columns whose every cell is empty.
    pub fn drop_empty_columns(&mut self) {
        self.columns.retain(|c| !c.is_empty());
    }

    /// Remove rows whose every cell is empty.
    pub fn drop_empty_rows(&mut self) {
        let keep: Vec<bool> = (0..self.row_count())
            .map(|row| {
                self.columns
                    .iter()
                    .any(|c| !c.values[row].is_empty())
            })
            .collect();
        for column in &mut self.columns {
            let mut flags = keep.iter();
            column.values.retain(|_| *flags.next().unwrap_or(&true));
        }
    }

    /// Values of the `Month` column as integers (non-integral cells → `None`).
    pub fn months(&self) -> Option<Vec<Option<i64>>> {
        self.column(MONTH)
            .map(|c| c.values.iter().map(CellValue::as_month).collect())
    }

    /// Row index whose `Month` equals `month`.
    pub fn month_row(&self, month: i64) -> Option<usize> {
        self.column(MONTH)?
            .values
            .iter()
            .position(|v| v.as_month() == Some(month))
    }
}

// ── Workbook ──────────────────────────────────────────────────────────────────

/// One normalized sheet of a workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub table: Table,
}

/// Every sheet of one workbook file, in workbook order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Workbook {
    pub path: PathBuf,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Table> {
        self.sheets.iter().find(|s| s.name == name).map(|s| &s.table)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

// ── Period ────────────────────────────────────────────────────────────────────

/// Reporting granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Monthly,
    Quarterly,
    Yearly,
}

impl Period {
    /// Number of months in one period.
    pub fn months(self) -> u32 {
        match self {
            Period::Monthly => 1,
            Period::Quarterly => 3,
            Period::Yearly => 12,
        }
    }

    /// Human label for period `index`.
    ///
    /// ```
    /// use econ_core::models::Period;
    ///
    /// assert_eq!(Period::Monthly.label(7, 2023), "Month 7");
    /// assert_eq!(Period::Quarterly.label(3, 2023), "Q3");
    /// assert_eq!(Period::Yearly.label(2, 2023), "2025");
    /// ```
    pub fn label(self, index: u32, epoch_year: i32) -> String {
        match self {
            Period::Monthly => format!("Month {}", index),
            Period::Quarterly => format!("Q{}", index),
            Period::Yearly => format!("{}", epoch_year + index as i32),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Period::Monthly => "monthly",
            Period::Quarterly => "quarterly",
            Period::Yearly => "yearly",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Period {
    type Err = EconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "month" | "m" => Ok(Period::Monthly),
            "quarterly" | "quarter" | "q" => Ok(Period::Quarterly),
            "yearly" | "year" | "annual" | "y" => Ok(Period::Yearly),
            other => Err(EconError::Config(format!("unknown period: {}", other))),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
