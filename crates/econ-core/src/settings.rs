use clap::Parser;
use std::path::PathBuf;

use crate::error::{EconError, Result};
use crate::models::Period;

/// Default directory scanned for workbook files.
pub const DEFAULT_WORKBOOK_DIR: &str = "excels";

/// Calendar year of month 0 in the model.
pub const DEFAULT_EPOCH_YEAR: i32 = 2023;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Economic model dashboard over spreadsheet workbooks
#[derive(Parser, Debug, Clone)]
#[command(
    name = "econ-model",
    about = "Economic model dashboard over spreadsheet workbooks",
    version
)]
pub struct Settings {
    /// Directory containing workbook files
    #[arg(long, env = "ECON_MODEL_DIR", default_value = DEFAULT_WORKBOOK_DIR)]
    pub dir: PathBuf,

    /// Workbook file name inside the directory (lists workbooks when absent)
    #[arg(long)]
    pub file: Option<String>,

    /// Sheet to display (all sheets when absent)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Reporting period for summaries
    #[arg(long, default_value = "monthly", value_parser = ["monthly", "quarterly", "yearly"])]
    pub period: String,

    /// Period index (month, quarter or year offset); latest period when absent
    #[arg(long)]
    pub index: Option<u32>,

    /// Calendar year of month 0
    #[arg(long, default_value_t = DEFAULT_EPOCH_YEAR)]
    pub epoch_year: i32,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments and apply derived values.
    pub fn load() -> Self {
        Self::parse().resolve()
    }

    /// Same as [`Settings::load`] over an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(args).resolve()
    }

    /// `--debug` overrides the log level.
    fn resolve(mut self) -> Self {
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }

    /// The requested reporting period.
    pub fn period(&self) -> Result<Period> {
        self.period.parse()
    }

    /// `true` when JSON output was requested.
    pub fn json_output(&self) -> bool {
        self.format == "json"
    }

    /// The selected workbook file name, if one was given.
    pub fn workbook_name(&self) -> Result<Option<&str>> {
        match self.file.as_deref().map(str::trim) {
            None => Ok(None),
            Some("") => Err(EconError::Config("--file must not be empty".to_string())),
            Some(name) => Ok(Some(name)),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
