mod bootstrap;
mod render;

use anyhow::{bail, Context, Result};
use econ_core::settings::Settings;
use econ_data::reader::SheetSource;
use econ_runtime::workbook_loader::WorkbookLoader;

use render::{SheetView, ViewOptions};

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("econ-model v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Workbook directory: {}", settings.dir.display());

    let loader = WorkbookLoader::new();
    let output = run(&settings, &loader)?;
    println!("{}", output.trim_end());
    Ok(())
}

/// Produce the full output for one invocation.
///
/// Without `--file` this lists the workbooks; with `--file` it renders every
/// sheet, or only `--sheet` with its period summary.
fn run<S: SheetSource>(settings: &Settings, loader: &WorkbookLoader<S>) -> Result<String> {
    let json = settings.json_output();

    let Some(name) = settings.workbook_name()? else {
        let files = loader.list_workbooks(&settings.dir);
        return Ok(if json {
            render::to_json(&files.keys().collect::<Vec<_>>())?
        } else {
            render::listing_text(&settings.dir, &files)
        });
    };

    let path = loader.resolve(&settings.dir, name)?;
    let workbook = loader
        .load(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    let options = ViewOptions {
        period: settings.period()?,
        index: settings.index,
        epoch_year: settings.epoch_year,
        summarize: settings.sheet.is_some(),
    };

    let views: Vec<SheetView> = match settings.sheet.as_deref() {
        Some(sheet) => {
            let Some(table) = workbook.sheet(sheet) else {
                bail!(
                    "Sheet '{}' not found in {}. Available sheets: {}",
                    sheet,
                    name,
                    workbook.sheet_names().join(", ")
                );
            };
            vec![render::sheet_view(sheet, table, &options)?]
        }
        None => workbook
            .sheets
            .iter()
            .map(|s| render::sheet_view(&s.name, &s.table, &options))
            .collect::<econ_core::Result<_>>()?,
    };

    if json {
        return Ok(render::to_json(&views)?);
    }
    Ok(views
        .iter()
        .map(render::sheet_text)
        .collect::<Vec<_>>()
        .join("\n"))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use econ_core::models::{CellValue, RawSheet};
    use econ_core::EconError;
    use std::path::Path;
    use tempfile::TempDir;

    fn text(s: &str) -> CellValue {
        CellValue::from(s)
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    /// Serves a fixed Unlock + Issuance workbook for any path.
    struct FixtureSource;

    impl SheetSource for FixtureSource {
        fn read_sheets(&self, _path: &Path) -> econ_core::Result<Vec<RawSheet>> {
            let mut unlock_rows = vec![
                vec![text("Month"), text("Team"), text("Team")],
                vec![CellValue::Empty, text("TIA"), text("TIA")],
            ];
            for month in 0..13 {
                unlock_rows.push(vec![
                    num(month as f64),
                    num(10.0),
                    num(10.0 * (month + 1) as f64),
                ]);
            }
            let issuance_rows = vec![
                vec![text("Month"), text("Relative Issuance"), text("Absolute issuance")],
                vec![CellValue::Empty, CellValue::Empty, CellValue::Empty],
                vec![num(0.0), num(0.05), num(0.02)],
            ];
            Ok(vec![
                RawSheet::new("Unlock", vec![text("Unlock schedule")], unlock_rows),
                RawSheet::new("Issuance", vec![text("Issuance")], issuance_rows),
            ])
        }
    }

    fn workspace() -> (TempDir, WorkbookLoader<FixtureSource>) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("model.xlsx"), b"").unwrap();
        (dir, WorkbookLoader::with_source(FixtureSource))
    }

    fn settings(dir: &TempDir, extra: &[&str]) -> Settings {
        let dir_arg = dir.path().to_string_lossy().to_string();
        let mut args = vec!["econ-model".to_string(), "--dir".to_string(), dir_arg];
        args.extend(extra.iter().map(|s| s.to_string()));
        Settings::load_from_args(args)
    }

    #[test]
    fn test_run_lists_workbooks() {
        let (dir, loader) = workspace();
        let output = run(&settings(&dir, &[]), &loader).unwrap();
        assert!(output.contains("model.xlsx"));
    }

    #[test]
    fn test_run_yearly_summary() {
        let (dir, loader) = workspace();
        let args = [
            "--file", "model.xlsx", "--sheet", "Unlock", "--period", "yearly", "--index", "1",
        ];
        let output = run(&settings(&dir, &args), &loader).unwrap();
        assert!(output.contains("2024 (12 months)"), "{output}");
        assert!(
            output
                .lines()
                .any(|l| l.starts_with("| Team ") && l.ends_with(" 120 |")),
            "{output}"
        );
    }

    #[test]
    fn test_run_json_includes_issuance_ratio() {
        let (dir, loader) = workspace();
        let args = ["--file", "model.xlsx", "--format", "json"];
        let output = run(&settings(&dir, &args), &loader).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let sheets = parsed.as_array().unwrap();
        assert_eq!(sheets.len(), 2);
        assert!(output.contains("Issuance Ratio"));
    }

    #[test]
    fn test_run_renders_issuance_without_ratio_operands() {
        struct PlainIssuance;

        impl SheetSource for PlainIssuance {
            fn read_sheets(&self, path: &Path) -> econ_core::Result<Vec<RawSheet>> {
                let rows = vec![
                    vec![text("Month"), text("Total Issuance")],
                    vec![CellValue::Empty, text("TIA")],
                    vec![num(0.0), num(100.0)],
                ];
                let mut sheets = FixtureSource.read_sheets(path)?;
                sheets.retain(|s| s.name == "Unlock");
                sheets.push(RawSheet::new("Issuance", vec![text("Issuance")], rows));
                Ok(sheets)
            }
        }

        let (dir, _) = workspace();
        let loader = WorkbookLoader::with_source(PlainIssuance);
        let output = run(&settings(&dir, &["--file", "model.xlsx"]), &loader).unwrap();
        assert!(output.contains("== Unlock =="), "{output}");
        assert!(output.contains("Total Issuance"), "{output}");
        assert!(!output.contains("Issuance Ratio"), "{output}");
    }

    #[test]
    fn test_run_unknown_sheet() {
        let (dir, loader) = workspace();
        let args = ["--file", "model.xlsx", "--sheet", "Budget"];
        let err = run(&settings(&dir, &args), &loader).unwrap_err();
        assert!(err.to_string().contains("Available sheets: Unlock, Issuance"));
    }

    #[test]
    fn test_run_missing_directory() {
        let (dir, loader) = workspace();
        let mut settings = settings(&dir, &["--file", "model.xlsx"]);
        settings.dir = dir.path().join("absent");
        let err = run(&settings, &loader).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EconError>(),
            Some(EconError::DirectoryAbsent(_))
        ));
    }
}
