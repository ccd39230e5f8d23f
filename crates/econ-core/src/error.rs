use std::path::PathBuf;
use thiserror::Error;

use crate::models::Period;

/// All errors produced by the economic model crates.
#[derive(Error, Debug)]
pub enum EconError {
    /// A workbook file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The configured workbook directory does not exist.
    #[error("Directory not found: {0}")]
    DirectoryAbsent(PathBuf),

    /// The spreadsheet reader could not open or read a workbook.
    #[error("Failed to read workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },

    /// A sheet's layout does not match what its normalizer expects.
    #[error("Malformed sheet '{sheet}': {reason}")]
    MalformedSheet { sheet: String, reason: String },

    /// A sheet failed while loading a whole workbook.
    #[error("Failed to load sheet '{sheet}': {source}")]
    SheetLoad {
        sheet: String,
        #[source]
        source: Box<EconError>,
    },

    /// A column required by a computation is absent.
    #[error("Missing column: {column}")]
    MissingColumn { column: String },

    /// The requested month/quarter/year has no row in the table.
    #[error("No data for {period} period {index}")]
    PeriodNotFound { period: Period, index: u32 },

    /// A point-in-time view asked for a month the table does not contain.
    #[error("No row for month {month}")]
    MonthNotFound { month: i64 },

    /// An aggregation was requested over a table without rows.
    #[error("Table has no rows")]
    EmptyTable,

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A JSON document could not be produced.
    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EconError {
    /// Build a [`EconError::MalformedSheet`] for `sheet`.
    pub fn malformed(sheet: &str, reason: impl Into<String>) -> Self {
        EconError::MalformedSheet {
            sheet: sheet.to_string(),
            reason: reason.into(),
        }
    }

    /// Build a [`EconError::MissingColumn`].
    pub fn missing_column(column: impl Into<String>) -> Self {
        EconError::MissingColumn {
            column: column.into(),
        }
    }

    /// Name of the sheet this error is attributed to, if any.
    pub fn sheet(&self) -> Option<&str> {
        match self {
            EconError::MalformedSheet { sheet, .. } | EconError::SheetLoad { sheet, .. } => {
                Some(sheet)
            }
            _ => None,
        }
    }
}

/// Convenience alias used throughout the economic model crates.
pub type Result<T> = std::result::Result<T, EconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_not_found() {
        let err = EconError::FileNotFound(PathBuf::from("/data/model.xlsx"));
        assert_eq!(err.to_string(), "File not found: /data/model.xlsx");
    }

    #[test]
    fn test_error_display_directory_absent() {
        let err = EconError::DirectoryAbsent(PathBuf::from("excels"));
        assert_eq!(err.to_string(), "Directory not found: excels");
    }

    #[test]
    fn test_error_display_malformed_sheet() {
        let err = EconError::malformed("Unlock", "expected at least 3 rows, found 2");
        assert_eq!(
            err.to_string(),
            "Malformed sheet 'Unlock': expected at least 3 rows, found 2"
        );
        assert_eq!(err.sheet(), Some("Unlock"));
    }

    #[test]
    fn test_error_display_sheet_load_wraps_source() {
        let inner = EconError::malformed("Supply", "missing header row");
        let err = EconError::SheetLoad {
            sheet: "Supply".to_string(),
            source: Box::new(inner),
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to load sheet 'Supply'"));
        assert!(msg.contains("missing header row"));
        assert_eq!(err.sheet(), Some("Supply"));
    }

    #[test]
    fn test_error_display_period_not_found() {
        let err = EconError::PeriodNotFound {
            period: Period::Quarterly,
            index: 9,
        };
        assert_eq!(err.to_string(), "No data for quarterly period 9");
    }

    #[test]
    fn test_error_display_missing_column() {
        let err = EconError::missing_column("Month");
        assert_eq!(err.to_string(), "Missing column: Month");
        assert!(err.sheet().is_none());
    }

    #[test]
    fn test_error_display_workbook() {
        let err = EconError::Workbook {
            path: PathBuf::from("broken.xlsx"),
            message: "invalid zip header".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to read workbook broken.xlsx: invalid zip header"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: EconError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_display_config() {
        let err = EconError::Config("unknown period: weekly".to_string());
        assert_eq!(err.to_string(), "Configuration error: unknown period: weekly");
    }
}
