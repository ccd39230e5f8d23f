//! Date coercion for the `Date` columns of the model sheets.

use chrono::{NaiveDate, NaiveDateTime};

use econ_core::models::CellValue;

/// Formats accepted for dates stored as text.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d"];

/// Convert an Excel serial date (days since 1899-12-30, fractional part is
/// the time of day) into a timestamp.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    base.checked_add_signed(chrono::Duration::milliseconds(millis))
}

/// Parse a date or timestamp written as text.
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        })
}

/// Truncate a cell to calendar-date precision.
///
/// Empty cells stay empty. `Err` carries a description of a cell that cannot
/// be read as a date.
pub fn to_date_cell(cell: &CellValue) -> Result<CellValue, String> {
    match cell {
        CellValue::Empty => Ok(CellValue::Empty),
        CellValue::Date(d) => Ok(CellValue::Date(*d)),
        CellValue::DateTime(dt) => Ok(CellValue::Date(dt.date())),
        CellValue::Number(n) => excel_serial_to_datetime(*n)
            .map(|dt| CellValue::Date(dt.date()))
            .ok_or_else(|| format!("{} is not a valid date serial", n)),
        CellValue::Text(s) if s.trim().is_empty() => Ok(CellValue::Empty),
        CellValue::Text(s) => parse_date_text(s)
            .map(CellValue::Date)
            .ok_or_else(|| format!("'{}' is not a date", s)),
        CellValue::Bool(b) => Err(format!("{} is not a date", b)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
