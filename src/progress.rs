use std::fmt;
use std::path::Path;

use crate::error::EraseError;
use crate::utils::format_size;

/// Advisory events emitted while erasing. Rendering is up to the caller.
#[derive(Debug)]
pub enum Progress<'a> {
    /// About to overwrite a non-empty file.
    Overwriting {
        path: &'a Path,
        size: u64,
        passes: u32,
    },
    PassComplete {
        path: &'a Path,
        pass: u32,
        passes: u32,
    },
    /// A zero-length file is unlinked without overwriting.
    EmptyFile(&'a Path),
    Erased(&'a Path),
    /// A file could not be erased; counted as a failure.
    Failed(&'a Path, &'a EraseError),
    EnterDirectory(&'a Path),
    DirectoryRemoved(&'a Path),
    /// Soft warning: the directory stays behind but nothing is counted.
    DirectoryKept(&'a Path, &'a EraseError),
    DirectoryDone {
        path: &'a Path,
        succeeded: usize,
        total: usize,
    },
}

impl Progress<'_> {
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::DirectoryKept(..))
    }
}

impl fmt::Display for Progress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwriting { path, size, passes } => write!(
                f,
                "Overwriting {} ({}) with {passes} passes",
                path.display(),
                format_size(*size)
            ),
            Self::PassComplete { pass, passes, .. } => write!(f, "Pass {pass}/{passes} complete"),
            Self::EmptyFile(path) => write!(f, "File is empty, just deleting: {}", path.display()),
            Self::Erased(path) => write!(f, "Securely erased: {}", path.display()),
            Self::Failed(path, err) => match err {
                EraseError::PathMissing => write!(f, "File does not exist: {}", path.display()),
                EraseError::NotARegularFile => {
                    write!(f, "Skipping (not a file): {}", path.display())
                }
                err => write!(f, "Failed to erase {}: {err}", path.display()),
            },
            Self::EnterDirectory(path) => write!(f, "Processing directory: {}", path.display()),
            Self::DirectoryRemoved(path) => write!(f, "Removed directory: {}", path.display()),
            Self::DirectoryKept(path, err) => {
                write!(f, "Could not remove directory {}: {err}", path.display())
            }
            Self::DirectoryDone {
                path,
                succeeded,
                total,
            } => write!(
                f,
                "Directory {} complete: {succeeded}/{total} files erased",
                path.display()
            ),
        }
    }
}
