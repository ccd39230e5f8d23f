//! Cached workbook loader for the model runtime.
//!
//! Wraps [`SheetSource`] + [`normalize_workbook`] with a per-path cache.
//! Callers use [`WorkbookLoader::load`] to obtain a shared, fully normalized
//! [`Workbook`]; the loader re-reads the file only when it has never been
//! loaded, was invalidated, or changed on disk since the last load.
//!
//! Loads of the same path are single-flight: concurrent callers wait for the
//! first one and share its result. Loads of different paths do not block
//! each other.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime};

use econ_core::models::Workbook;
use econ_core::{EconError, Result};
use econ_data::normalizer::normalize_workbook;
use econ_data::reader::{find_workbooks, CalamineSource, SheetSource};

// ── Cache slots ───────────────────────────────────────────────────────────────

/// A successfully loaded workbook and the file state it was read from.
struct CachedEntry {
    /// File modification time at load; `None` when the source has no file.
    modified: Option<SystemTime>,
    workbook: Arc<Workbook>,
    loaded_at: Instant,
}

/// Per-path slot. Its lock is held for the whole load, which makes loads of
/// one path single-flight.
type Slot = Arc<Mutex<Option<CachedEntry>>>;

/// Lock a mutex, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Modification time of `path`, if it can be read.
fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

// ── WorkbookLoader ────────────────────────────────────────────────────────────

/// Loads and caches normalized workbooks, keyed by path.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use econ_runtime::workbook_loader::WorkbookLoader;
///
/// let loader = WorkbookLoader::new();
/// let workbook = loader.load(Path::new("excels/model.xlsx")).unwrap();
/// println!("sheets: {:?}", workbook.sheet_names());
/// ```
pub struct WorkbookLoader<S: SheetSource = CalamineSource> {
    source: S,
    slots: Mutex<HashMap<PathBuf, Slot>>,
}

impl WorkbookLoader<CalamineSource> {
    /// Loader that reads workbooks from disk.
    pub fn new() -> Self {
        Self::with_source(CalamineSource)
    }
}

impl Default for WorkbookLoader<CalamineSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SheetSource> WorkbookLoader<S> {
    /// Loader backed by a custom sheet source.
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            slots: Mutex::new(HashMap::new()),
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Workbook files directly inside `dir`, by file name.
    ///
    /// An absent directory gives an empty listing.
    pub fn list_workbooks(&self, dir: &Path) -> BTreeMap<String, PathBuf> {
        find_workbooks(dir)
    }

    /// Path of workbook `name` inside `dir`.
    ///
    /// Returns [`EconError::DirectoryAbsent`] when `dir` does not exist and
    /// [`EconError::FileNotFound`] when the file is not there.
    pub fn resolve(&self, dir: &Path, name: &str) -> Result<PathBuf> {
        if !dir.is_dir() {
            return Err(EconError::DirectoryAbsent(dir.to_path_buf()));
        }
        let path = dir.join(name);
        if !path.is_file() {
            return Err(EconError::FileNotFound(path));
        }
        Ok(path)
    }

    /// Load the workbook at `path`, normalizing every sheet.
    ///
    /// Returns the cached workbook when the file is unchanged since the last
    /// successful load. The first failing sheet aborts the load; failures
    /// are never cached.
    pub fn load(&self, path: &Path) -> Result<Arc<Workbook>> {
        let slot = self.slot(path);
        let mut entry = lock(&slot);

        let modified = modified_time(path);
        if let Some(cached) = entry.as_ref() {
            if cached.modified == modified {
                tracing::debug!(path = %path.display(), "workbook cache hit");
                return Ok(Arc::clone(&cached.workbook));
            }
            tracing::debug!(path = %path.display(), "workbook changed on disk; reloading");
        }

        let started = Instant::now();
        let result = self
            .source
            .read_sheets(path)
            .and_then(|sheets| normalize_workbook(path, sheets));

        match result {
            Ok(workbook) => {
                let workbook = Arc::new(workbook);
                tracing::info!(
                    path = %path.display(),
                    sheets = workbook.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "workbook loaded"
                );
                *entry = Some(CachedEntry {
                    modified,
                    workbook: Arc::clone(&workbook),
                    loaded_at: Instant::now(),
                });
                Ok(workbook)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "workbook load failed");
                *entry = None;
                Err(e)
            }
        }
    }

    /// Drop the cached entry for `path`, forcing the next [`load`] to re-read.
    ///
    /// [`load`]: WorkbookLoader::load
    pub fn invalidate(&self, path: &Path) {
        if lock(&self.slots).remove(path).is_some() {
            tracing::debug!(path = %path.display(), "workbook cache invalidated");
        }
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        lock(&self.slots).clear();
        tracing::debug!("workbook cache cleared");
    }

    /// `true` when a loaded workbook is cached for `path`.
    ///
    /// Does not wait for a load in progress on that path.
    pub fn is_cached(&self, path: &Path) -> bool {
        let slot = match lock(&self.slots).get(path) {
            Some(slot) => Arc::clone(slot),
            None => return false,
        };
        let cached = match slot.try_lock() {
            Ok(entry) => entry.is_some(),
            Err(std::sync::TryLockError::Poisoned(p)) => p.into_inner().is_some(),
            Err(std::sync::TryLockError::WouldBlock) => false,
        };
        cached
    }

    /// Paths with a cached workbook, sorted.
    pub fn cached_paths(&self) -> Vec<PathBuf> {
        let paths: Vec<PathBuf> = lock(&self.slots).keys().cloned().collect();
        let mut cached: Vec<PathBuf> = paths.into_iter().filter(|p| self.is_cached(p)).collect();
        cached.sort();
        cached
    }

    /// Time since the cached workbook for `path` was loaded.
    pub fn cache_age(&self, path: &Path) -> Option<Duration> {
        let slot = lock(&self.slots).get(path).map(Arc::clone)?;
        let entry = lock(&slot);
        entry.as_ref().map(|e| e.loaded_at.elapsed())
    }

    // ── Private helpers ───────────────────────────────────────────────────

    /// Find or create the slot for `path`. The map lock is released before
    /// the caller locks the slot.
    fn slot(&self, path: &Path) -> Slot {
        let mut slots = lock(&self.slots);
        Arc::clone(slots.entry(path.to_path_buf()).or_default())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use econ_core::models::{CellValue, RawSheet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use tempfile::TempDir;

    fn text(s: &str) -> CellValue {
        CellValue::from(s)
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    /// Supply sheet: structural header, label row, units row, then two
    /// months.
    fn supply_sheet() -> RawSheet {
        RawSheet::new(
            "Supply",
            vec![text("Supply model")],
            vec![
                vec![text("Month"), text("Minted"), text("Burned")],
                vec![CellValue::Empty, text("TIA"), text("TIA")],
                vec![num(0.0), num(100.0), num(1.0)],
                vec![num(1.0), num(110.0), num(2.0)],
            ],
        )
    }

    /// Overview sheet with a single label column, which cannot normalize.
    fn broken_overview() -> RawSheet {
        RawSheet::new(
            "Overview",
            vec![text("Metric")],
            vec![vec![text("Total Token")]],
        )
    }

    /// In-memory source that counts reads.
    struct CountingSource {
        reads: AtomicUsize,
        sheets: Vec<RawSheet>,
        delay: Duration,
    }

    impl CountingSource {
        fn new(sheets: Vec<RawSheet>) -> Self {
            Self {
                reads: AtomicUsize::new(0),
                sheets,
                delay: Duration::ZERO,
            }
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl SheetSource for CountingSource {
        fn read_sheets(&self, _path: &Path) -> Result<Vec<RawSheet>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            Ok(self.sheets.clone())
        }
    }

    // ── load ──────────────────────────────────────────────────────────────

    #[test]
    fn test_load_normalizes_every_sheet() {
        let loader = WorkbookLoader::with_source(CountingSource::new(vec![supply_sheet()]));
        let workbook = loader.load(Path::new("model.xlsx")).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Supply"]);
        let supply = workbook.sheet("Supply").unwrap();
        assert_eq!(supply.column_names(), vec!["Month", "Minted", "Burned"]);
        assert_eq!(supply.row_count(), 2);
    }

    #[test]
    fn test_second_load_is_cached() {
        let loader = WorkbookLoader::with_source(CountingSource::new(vec![supply_sheet()]));
        let path = Path::new("model.xlsx");
        let first = loader.load(path).unwrap();
        let second = loader.load(path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.source.reads(), 1);
        assert!(loader.is_cached(path));
        assert!(loader.cache_age(path).is_some());
    }

    #[test]
    fn test_paths_are_cached_separately() {
        let loader = WorkbookLoader::with_source(CountingSource::new(vec![supply_sheet()]));
        loader.load(Path::new("b.xlsx")).unwrap();
        loader.load(Path::new("a.xlsx")).unwrap();
        assert_eq!(loader.source.reads(), 2);
        assert_eq!(
            loader.cached_paths(),
            vec![PathBuf::from("a.xlsx"), PathBuf::from("b.xlsx")]
        );
    }

    #[test]
    fn test_failed_sheet_aborts_load_and_is_not_cached() {
        let loader = WorkbookLoader::with_source(CountingSource::new(vec![
            supply_sheet(),
            broken_overview(),
        ]));
        let path = Path::new("model.xlsx");

        let err = loader.load(path).unwrap_err();
        assert_eq!(err.sheet(), Some("Overview"));
        assert!(!loader.is_cached(path));

        assert!(loader.load(path).is_err());
        assert_eq!(loader.source.reads(), 2);
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let loader = WorkbookLoader::with_source(CountingSource::new(vec![supply_sheet()]));
        let path = Path::new("model.xlsx");
        let first = loader.load(path).unwrap();
        loader.invalidate(path);
        assert!(!loader.is_cached(path));

        let second = loader.load(path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
        assert_eq!(loader.source.reads(), 2);
    }

    #[test]
    fn test_clear_empties_cache() {
        let loader = WorkbookLoader::with_source(CountingSource::new(vec![supply_sheet()]));
        loader.load(Path::new("a.xlsx")).unwrap();
        loader.load(Path::new("b.xlsx")).unwrap();
        loader.clear();
        assert!(loader.cached_paths().is_empty());
    }

    #[test]
    fn test_modified_file_is_reloaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.xlsx");
        std::fs::write(&path, b"v1").unwrap();

        let loader = WorkbookLoader::with_source(CountingSource::new(vec![supply_sheet()]));
        loader.load(&path).unwrap();
        loader.load(&path).unwrap();
        assert_eq!(loader.source.reads(), 1);

        let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        let later = SystemTime::now() + Duration::from_secs(60);
        file.set_modified(later).unwrap();
        drop(file);

        loader.load(&path).unwrap();
        assert_eq!(loader.source.reads(), 2);
    }

    #[test]
    fn test_concurrent_loads_parse_once() {
        let mut source = CountingSource::new(vec![supply_sheet()]);
        source.delay = Duration::from_millis(50);
        let loader = Arc::new(WorkbookLoader::with_source(source));
        let path = PathBuf::from("model.xlsx");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let loader = Arc::clone(&loader);
                let path = path.clone();
                thread::spawn(move || loader.load(&path).unwrap())
            })
            .collect();
        let results: Vec<Arc<Workbook>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(loader.source.reads(), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    /// Source that holds the load of `slow.xlsx` until released.
    struct GatedSource {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl SheetSource for GatedSource {
        fn read_sheets(&self, path: &Path) -> Result<Vec<RawSheet>> {
            if path == Path::new("slow.xlsx") {
                let _ = lock(&self.entered).send(());
                let _ = lock(&self.release).recv_timeout(Duration::from_secs(10));
            }
            Ok(vec![supply_sheet()])
        }
    }

    #[test]
    fn test_cached_path_does_not_wait_for_other_load() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let loader = Arc::new(WorkbookLoader::with_source(GatedSource {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        }));
        let fast = PathBuf::from("fast.xlsx");
        let cached = loader.load(&fast).unwrap();

        let slow = {
            let loader = Arc::clone(&loader);
            thread::spawn(move || loader.load(Path::new("slow.xlsx")).map(|_| ()))
        };
        entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("slow load started");

        let (done_tx, done_rx) = mpsc::channel();
        {
            let loader = Arc::clone(&loader);
            let fast = fast.clone();
            thread::spawn(move || {
                let _ = done_tx.send(loader.load(&fast).map(|wb| Arc::ptr_eq(&wb, &cached)));
            });
        }
        let fast_result = done_rx.recv_timeout(Duration::from_secs(2));

        release_tx.send(()).unwrap();
        slow.join().unwrap().unwrap();

        let same = fast_result
            .expect("cached load returned while another path was loading")
            .unwrap();
        assert!(same);
        assert!(loader.is_cached(Path::new("slow.xlsx")));
    }

    // ── list_workbooks / resolve ──────────────────────────────────────────

    #[test]
    fn test_list_workbooks() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("model.xlsx"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let loader = WorkbookLoader::new();
        let files = loader.list_workbooks(dir.path());
        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["model.xlsx"]);
        assert!(loader.list_workbooks(&dir.path().join("absent")).is_empty());
    }

    #[test]
    fn test_resolve_errors() {
        let dir = TempDir::new().unwrap();
        let loader = WorkbookLoader::new();
        assert!(matches!(
            loader.resolve(&dir.path().join("absent"), "model.xlsx"),
            Err(EconError::DirectoryAbsent(_))
        ));
        assert!(matches!(
            loader.resolve(dir.path(), "model.xlsx"),
            Err(EconError::FileNotFound(_))
        ));

        std::fs::write(dir.path().join("model.xlsx"), b"").unwrap();
        assert_eq!(
            loader.resolve(dir.path(), "model.xlsx").unwrap(),
            dir.path().join("model.xlsx")
        );
    }

    #[test]
    fn test_missing_file_from_disk_source() {
        let dir = TempDir::new().unwrap();
        let loader = WorkbookLoader::new();
        let err = loader.load(&dir.path().join("absent.xlsx")).unwrap_err();
        assert!(matches!(err, EconError::FileNotFound(_)));
    }
}
