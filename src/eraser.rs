use std::cmp::Ordering;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::EraseError;
use crate::ledger::{FileSize, Ledger};
use crate::progress::Progress;
use crate::shredder;

/// Terminal result of erasing one file. Handed to the ledger, then dropped.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub passes: u32,
    pub size: FileSize,
    pub result: Result<(), EraseError>,
}

impl FileOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Success count over a number of attempted items.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub succeeded: usize,
    pub total: usize,
}

impl Tally {
    pub fn record(&mut self, ok: bool) {
        self.total += 1;
        if ok {
            self.succeeded += 1;
        }
    }

    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }
}

type ProgressFn<'a> = Box<dyn FnMut(&Progress<'_>) + 'a>;

/// Overwrites and unlinks files, walking directories bottom-up.
///
/// Every file that reaches a terminal state produces exactly one ledger entry.
/// Nothing here returns an error: failures become `false` plus a ledger row,
/// and directory-removal problems are only reported.
pub struct Eraser<'a> {
    ledger: &'a Ledger,
    progress: ProgressFn<'a>,
}

impl<'a> Eraser<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self {
            ledger,
            progress: Box::new(|_| {}),
        }
    }

    /// Install a callback that receives every progress event.
    pub fn with_progress(mut self, progress: impl FnMut(&Progress<'_>) + 'a) -> Self {
        self.progress = Box::new(progress);
        self
    }

    fn emit(&mut self, event: Progress<'_>) {
        (self.progress)(&event);
    }

    /// Overwrite `path` in place `passes` times, then unlink it.
    pub fn erase_file(&mut self, path: &Path, passes: NonZeroU32) -> bool {
        self.erase_file_outcome(path, passes).succeeded()
    }

    /// Like [`erase_file`](Self::erase_file) but keeps the error kind.
    pub fn erase_file_outcome(&mut self, path: &Path, passes: NonZeroU32) -> FileOutcome {
        let (size, result) = self.shred(path, passes);

        match &result {
            Ok(()) => self.emit(Progress::Erased(path)),
            Err(err) => self.emit(Progress::Failed(path, err)),
        }
        self.ledger.record(path, passes.get(), result.is_ok(), size);

        FileOutcome {
            path: path.to_path_buf(),
            passes: passes.get(),
            size,
            result,
        }
    }

    fn shred(&mut self, path: &Path, passes: NonZeroU32) -> (FileSize, Result<(), EraseError>) {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return (FileSize::Unavailable, Err(EraseError::PathMissing))
            }
            Err(e) => {
                return (
                    FileSize::Unavailable,
                    Err(EraseError::from_io(e, EraseError::Metadata)),
                )
            }
        };

        if !meta.file_type().is_file() {
            return (FileSize::Unavailable, Err(EraseError::NotARegularFile));
        }

        let size = meta.len();
        if is_same_file(&meta, path, self.ledger.path()) {
            return (FileSize::Known(size), Err(EraseError::LedgerFile));
        }
        if size == 0 {
            self.emit(Progress::EmptyFile(path));
            return (FileSize::Known(0), unlink(path));
        }

        self.emit(Progress::Overwriting {
            path,
            size,
            passes: passes.get(),
        });

        let result = open_in_place(path).and_then(|mut file| {
            let progress = &mut self.progress;
            shredder::overwrite_in_place(&mut file, size, passes, &mut |pass| {
                progress(&Progress::PassComplete {
                    path,
                    pass,
                    passes: passes.get(),
                })
            })
        });

        (FileSize::Known(size), result.and_then(|()| unlink(path)))
    }

    /// Erase a single file, or every file under a directory and then the
    /// directories themselves. True only if every file was erased.
    pub fn erase_path(&mut self, path: &Path, passes: NonZeroU32) -> bool {
        self.erase_path_tally(path, passes).all_succeeded()
    }

    /// Per-file tally for one target. A plain file counts as one item.
    pub fn erase_path_tally(&mut self, path: &Path, passes: NonZeroU32) -> Tally {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => self.erase_dir(path, passes),
            // Missing paths and odd file types still get their one failed ledger row.
            _ => {
                let mut tally = Tally::default();
                tally.record(self.erase_file(path, passes));
                tally
            }
        }
    }

    /// Run `erase_path` over every target in order; the tally counts targets.
    pub fn erase_all<P: AsRef<Path>>(&mut self, paths: &[P], passes: NonZeroU32) -> Tally {
        let mut tally = Tally::default();
        for path in paths {
            tally.record(self.erase_path(path.as_ref(), passes));
        }
        tally
    }

    fn erase_dir(&mut self, root: &Path, passes: NonZeroU32) -> Tally {
        self.emit(Progress::EnterDirectory(root));
        let mut tally = Tally::default();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .contents_first(true)
            .sort_by(files_first);

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => self.remove_dir(entry.path()),
                Ok(entry) => tally.record(self.erase_file(entry.path(), passes)),
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    let err = EraseError::Walk(e);
                    log::warn!("cannot traverse {}: {err}", path.display());
                    self.emit(Progress::Failed(&path, &err));
                    tally.record(false);
                }
            }
        }

        self.remove_dir(root);
        self.emit(Progress::DirectoryDone {
            path: root,
            succeeded: tally.succeeded,
            total: tally.total,
        });
        tally
    }

    fn remove_dir(&mut self, path: &Path) {
        match fs::remove_dir(path) {
            Ok(()) => self.emit(Progress::DirectoryRemoved(path)),
            Err(e) => {
                let err = EraseError::from_rmdir(e);
                log::warn!("keeping directory {}: {err}", path.display());
                self.emit(Progress::DirectoryKept(path, &err));
            }
        }
    }
}

/// Within one directory, files come before subdirectories, each group by name.
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Whether `path` (already stat'ed as `meta`) is the same file as `other`.
#[cfg(unix)]
fn is_same_file(meta: &fs::Metadata, _path: &Path, other: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(other).is_ok_and(|o| o.dev() == meta.dev() && o.ino() == meta.ino())
}

#[cfg(not(unix))]
fn is_same_file(_meta: &fs::Metadata, path: &Path, other: &Path) -> bool {
    match (fs::canonicalize(path), fs::canonicalize(other)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Open for in-place read/write: no create, no truncate, no following symlinks.
fn open_in_place(path: &Path) -> Result<File, EraseError> {
    let mut options = OpenOptions::new();
    options.read(true).write(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_NOFOLLOW);
    }

    let file = options
        .open(path)
        .map_err(|e| EraseError::from_io(e, EraseError::Open))?;

    match file.metadata() {
        Ok(meta) if meta.is_file() => Ok(file),
        Ok(_) => Err(EraseError::NotARegularFile),
        Err(e) => Err(EraseError::from_io(e, EraseError::Metadata)),
    }
}

fn unlink(path: &Path) -> Result<(), EraseError> {
    fs::remove_file(path).map_err(|e| EraseError::from_io(e, EraseError::UnlinkFailed))
}
