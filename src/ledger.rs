use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::Deserialize;

use crate::error::LedgerError;

/// Where the ledger lives unless configured otherwise.
pub const DEFAULT_LOG_FILE: &str = "logs/erasure_log.csv";

/// Used when the configured location cannot be created.
pub const FALLBACK_LOG_FILE: &str = "erasure_log.csv";

pub const HEADER: [&str; 5] = ["Timestamp", "File Path", "Passes", "Success", "File Size"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Size of a file at the moment it was erased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSize {
    Known(u64),
    /// The file vanished or could not be measured.
    Unavailable,
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(bytes) => write!(f, "{bytes}"),
            Self::Unavailable => f.write_str("N/A"),
        }
    }
}

impl FromStr for FileSize {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "N/A" => Ok(Self::Unavailable),
            n => n.parse().map(Self::Known),
        }
    }
}

/// One persisted row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub timestamp: NaiveDateTime,
    /// The path as the caller supplied it, never canonicalized.
    pub path: String,
    pub passes: u32,
    pub success: bool,
    pub size: FileSize,
}

impl LedgerEntry {
    /// Stamp an outcome with the current local time, at the ledger's one-second resolution.
    pub fn now(path: &Path, passes: u32, success: bool, size: FileSize) -> Self {
        Self {
            timestamp: Local::now().naive_local().trunc_subsecs(0),
            path: path.to_string_lossy().into_owned(),
            passes,
            success,
            size,
        }
    }

    fn to_record(&self) -> [String; 5] {
        [
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.path.clone(),
            self.passes.to_string(),
            yes_no(self.success).to_string(),
            self.size.to_string(),
        ]
    }
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[LOG] {} | File: {} | Passes: {} | Success: {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.path,
            self.passes,
            yes_no(self.success)
        )
    }
}

fn yes_no(success: bool) -> &'static str {
    if success {
        "Yes"
    } else {
        "No"
    }
}

/// Raw row as read back from disk, before validation.
#[derive(Deserialize)]
struct LedgerRow {
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "File Path")]
    path: String,
    #[serde(rename = "Passes")]
    passes: u32,
    #[serde(rename = "Success")]
    success: String,
    #[serde(rename = "File Size")]
    size: String,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = String;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        let timestamp = NaiveDateTime::parse_from_str(row.timestamp.trim(), TIMESTAMP_FORMAT)
            .map_err(|e| format!("bad timestamp '{}': {e}", row.timestamp))?;
        let success = match row.success.trim().to_ascii_lowercase().as_str() {
            "yes" => true,
            "no" => false,
            other => return Err(format!("bad success flag '{other}'")),
        };
        let size = row
            .size
            .parse()
            .map_err(|e| format!("bad file size '{}': {e}", row.size))?;
        Ok(Self {
            timestamp,
            path: row.path,
            passes: row.passes,
            success,
            size,
        })
    }
}

/// Aggregate over every well-formed ledger entry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl Summary {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        entries.into_iter().fold(Self::default(), |mut acc, entry| {
            acc.total += 1;
            if entry.success {
                acc.successful += 1;
            } else {
                acc.failed += 1;
            }
            acc
        })
    }
}

/// Append-only CSV record of every file erasure.
///
/// Writes never fail from the caller's point of view: a ledger that cannot
/// be written degrades to a warning, because the erasure already happened.
pub struct Ledger {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl Ledger {
    /// Open (or create with a header) the ledger at `path`, falling back to
    /// `./erasure_log.csv` if that location cannot be prepared.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::open_with_fallback(path, FALLBACK_LOG_FILE)
    }

    pub fn open_with_fallback(path: impl Into<PathBuf>, fallback: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let path = match prepare(&path) {
            Ok(()) => path,
            Err(e) => {
                let fallback = fallback.into();
                log::warn!(
                    "could not initialize ledger, falling back to {}: {e}",
                    fallback.display()
                );
                if let Err(e) = prepare(&fallback) {
                    log::warn!("could not initialize fallback ledger: {e}");
                }
                fallback
            }
        };

        Self {
            path,
            append_lock: Mutex::new(()),
        }
    }

    /// The file actually in use, after any fallback.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one erasure outcome, stamped now.
    pub fn record(&self, path: &Path, passes: u32, success: bool, size: FileSize) -> LedgerEntry {
        let entry = LedgerEntry::now(path, passes, success, size);
        self.append(&entry);
        entry
    }

    /// Append a prepared entry. Failures are logged, never returned.
    pub fn append(&self, entry: &LedgerEntry) {
        if let Err(e) = self.try_append(entry) {
            log::warn!("could not write to ledger: {e}");
        }
        log::info!("{entry}");
    }

    fn try_append(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let _guard = self
            .append_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let file = open_for_append(&self.path)?;
        let fresh = file.metadata().map(|m| m.len() == 0).unwrap_or(false);

        let mut writer = csv::Writer::from_writer(&file);
        if fresh {
            writer.write_record(HEADER).map_err(|e| self.csv_err(e))?;
        }
        writer
            .write_record(entry.to_record())
            .map_err(|e| self.csv_err(e))?;
        writer.flush().map_err(|e| self.io_err(e))?;
        drop(writer);

        file.sync_data().map_err(|e| self.io_err(e))
    }

    /// Every well-formed entry, in file order. Malformed rows are skipped.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                log::warn!("could not read ledger {}: {e}", self.path.display());
                return Vec::new();
            }
        };

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
        let mut entries = Vec::new();

        for (idx, row) in reader.deserialize::<LedgerRow>().enumerate() {
            let parsed = row
                .map_err(|e| e.to_string())
                .and_then(LedgerEntry::try_from);
            match parsed {
                Ok(entry) => entries.push(entry),
                Err(e) => log::debug!("skipping ledger row {}: {e}", idx + 1),
            }
        }

        entries
    }

    /// Re-read the whole ledger and aggregate it.
    pub fn summary(&self) -> Summary {
        Summary::from_entries(&self.entries())
    }

    fn io_err(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_err(&self, source: csv::Error) -> LedgerError {
        LedgerError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

fn open_for_append(path: &Path) -> Result<File, LedgerError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Make sure the parent directory exists and the file starts with a header.
fn prepare(path: &Path) -> Result<(), LedgerError> {
    let io_err = |source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let empty = match fs::metadata(path) {
        Ok(meta) => meta.len() == 0,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => return Err(io_err(e)),
    };

    if !empty {
        warn_on_foreign_header(path);
        return Ok(());
    }

    let file = open_for_append(path)?;
    let mut writer = csv::Writer::from_writer(&file);
    writer
        .write_record(HEADER)
        .map_err(|source| LedgerError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    writer.flush().map_err(io_err)?;
    Ok(())
}

fn warn_on_foreign_header(path: &Path) {
    let Ok(mut reader) = csv::Reader::from_path(path) else {
        return;
    };
    match reader.headers() {
        Ok(headers) if headers.iter().eq(HEADER) => {}
        Ok(headers) => log::warn!(
            "ledger {} has unexpected header {:?}; appending anyway",
            path.display(),
            headers
        ),
        Err(e) => log::warn!("ledger {} header unreadable: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn creates_file_with_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/erasure_log.csv");

        let ledger = Ledger::open(&path);

        assert_eq!(ledger.path(), path);
        assert_eq!(
            read_lines(&path),
            vec!["Timestamp,File Path,Passes,Success,File Size"]
        );
    }

    #[test]
    fn reopening_reuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");

        Ledger::open(&path).record(Path::new("/a.txt"), 3, true, FileSize::Known(10));
        Ledger::open(&path).record(Path::new("/b.txt"), 3, false, FileSize::Unavailable);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Timestamp,"));
        assert!(lines[1].ends_with(",/a.txt,3,Yes,10"));
        assert!(lines[2].ends_with(",/b.txt,3,No,N/A"));
    }

    #[test]
    fn empty_existing_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        File::create(&path).unwrap();

        let ledger = Ledger::open(&path);
        ledger.record(Path::new("x"), 1, true, FileSize::Known(0));

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], HEADER.join(","));
    }

    #[test]
    fn recorded_entry_reads_back() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::open(dir.path().join("log.csv"));

        let written = ledger.record(Path::new("/test/file.txt"), 3, true, FileSize::Known(1024));
        let read = ledger.entries();

        assert_eq!(read, vec![written]);
    }

    #[test]
    fn paths_with_commas_stay_one_column() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::open(dir.path().join("log.csv"));

        ledger.record(Path::new("/tmp/a, b.txt"), 2, true, FileSize::Known(5));

        let entries = ledger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/tmp/a, b.txt");
    }

    #[test]
    fn summary_counts_success_and_failure() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::open(dir.path().join("log.csv"));

        ledger.record(Path::new("/file1.txt"), 3, true, FileSize::Known(1));
        ledger.record(Path::new("/file2.txt"), 1, false, FileSize::Unavailable);
        ledger.record(Path::new("/file3.txt"), 2, true, FileSize::Known(3));

        assert_eq!(
            ledger.summary(),
            Summary {
                total: 3,
                successful: 2,
                failed: 1
            }
        );
    }

    #[test]
    fn summary_of_missing_store_is_zero() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        let ledger = Ledger::open(&path);
        fs::remove_file(&path).unwrap();

        assert_eq!(ledger.summary(), Summary::default());
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        let ledger = Ledger::open(&path);
        ledger.record(Path::new("/ok.txt"), 1, true, FileSize::Known(4));

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "garbage").unwrap();
        writeln!(file, "2024-01-01 00:00:00,/x,notanumber,Yes,4").unwrap();
        writeln!(file, "2024-01-01 00:00:00,/y,1,Maybe,4").unwrap();
        writeln!(file, "2024-01-01 00:00:00,/z,1,No,N/A").unwrap();
        drop(file);

        let summary = ledger.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn falls_back_when_directory_cannot_be_made() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        File::create(&blocker).unwrap();
        let fallback = dir.path().join("fallback.csv");

        let ledger = Ledger::open_with_fallback(blocker.join("log.csv"), &fallback);

        assert_eq!(ledger.path(), fallback);
        ledger.record(Path::new("/a"), 1, true, FileSize::Known(1));
        assert_eq!(ledger.summary().total, 1);
    }

    #[test]
    fn unwritable_ledger_degrades_to_warning() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        File::create(&blocker).unwrap();

        let ledger =
            Ledger::open_with_fallback(blocker.join("a.csv"), blocker.join("b.csv"));
        let entry = ledger.record(Path::new("/gone"), 2, true, FileSize::Known(7));

        assert!(entry.success);
        assert_eq!(ledger.summary(), Summary::default());
    }

    #[test]
    fn file_size_text_form() {
        assert_eq!(FileSize::Known(11).to_string(), "11");
        assert_eq!(FileSize::Unavailable.to_string(), "N/A");
        assert_eq!("N/A".parse::<FileSize>().unwrap(), FileSize::Unavailable);
        assert_eq!("42".parse::<FileSize>().unwrap(), FileSize::Known(42));
        assert!("-1".parse::<FileSize>().is_err());
    }
}
