use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a single erasure step did not complete.
///
/// File-level kinds are hard failures and count against the tally.
/// Directory-removal kinds are soft: surfaced to the operator, never counted.
#[derive(Debug, Error)]
pub enum EraseError {
    #[error("path does not exist")]
    PathMissing,

    #[error("not a regular file")]
    NotARegularFile,

    #[error("refusing to erase the erasure log itself")]
    LedgerFile,

    #[error("permission denied: {0}")]
    PermissionDenied(#[source] io::Error),

    #[error("cannot read metadata: {0}")]
    Metadata(#[source] io::Error),

    #[error("cannot open for overwrite: {0}")]
    Open(#[source] io::Error),

    #[error("file length changed from {expected} to {actual} bytes before pass {pass}")]
    SizeChanged { pass: u32, expected: u64, actual: u64 },

    #[error("I/O error during pass {pass}: {source}")]
    PassFailed {
        pass: u32,
        #[source]
        source: io::Error,
    },

    #[error("overwritten but could not unlink: {0}")]
    UnlinkFailed(#[source] io::Error),

    #[error("directory not empty")]
    DirectoryNotEmpty,

    #[error("cannot remove directory: {0}")]
    DirectoryRemoval(#[source] io::Error),

    #[error("cannot read directory entry: {0}")]
    Walk(#[from] walkdir::Error),
}

impl EraseError {
    /// Soft errors are reported but never counted as failed erasures.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::DirectoryNotEmpty | Self::DirectoryRemoval(_))
    }

    /// Short category label used in console failure lines.
    pub fn category(&self) -> &'static str {
        match self {
            Self::PathMissing => "missing",
            Self::NotARegularFile => "not a file",
            Self::LedgerFile => "erasure log",
            Self::PermissionDenied(_) => "permission denied",
            Self::Metadata(_) | Self::Open(_) => "I/O error",
            Self::SizeChanged { .. } => "size changed",
            Self::PassFailed { .. } => "I/O error during pass",
            Self::UnlinkFailed(_) => "unlink failed",
            Self::DirectoryNotEmpty => "directory not empty",
            Self::DirectoryRemoval(_) => "directory removal failed",
            Self::Walk(_) => "traversal error",
        }
    }

    /// Route permission errors to their own kind, everything else through `other`.
    pub(crate) fn from_io(err: io::Error, other: impl FnOnce(io::Error) -> Self) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied(err)
        } else {
            other(err)
        }
    }

    /// Classify a failed `remove_dir`.
    pub(crate) fn from_rmdir(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::DirectoryNotEmpty || is_not_empty_errno(&err) {
            Self::DirectoryNotEmpty
        } else {
            Self::DirectoryRemoval(err)
        }
    }
}

// Some platforms report a non-empty rmdir as EEXIST.
#[cfg(unix)]
fn is_not_empty_errno(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(libc::ENOTEMPTY) | Some(libc::EEXIST))
}

#[cfg(not(unix))]
fn is_not_empty_errno(_: &io::Error) -> bool {
    false
}

/// A ledger append or read that failed. Never escapes `Ledger::record`.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ledger CSV on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Rejected configuration, caught before any file is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("pass count must be a whole number, got '{0}'")]
    InvalidPasses(String),

    #[error("pass count must be between 1 and {max}, got {0}", max = u32::MAX)]
    PassesOutOfRange(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_directory_kinds_are_soft() {
        assert!(EraseError::DirectoryNotEmpty.is_soft());
        assert!(EraseError::DirectoryRemoval(io::Error::other("busy")).is_soft());
        assert!(!EraseError::PathMissing.is_soft());
        assert!(!EraseError::UnlinkFailed(io::Error::other("busy")).is_soft());
    }

    #[test]
    fn permission_denied_gets_its_own_kind() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(
            EraseError::from_io(denied, EraseError::Open),
            EraseError::PermissionDenied(_)
        ));

        let other = io::Error::from(io::ErrorKind::NotFound);
        assert!(matches!(
            EraseError::from_io(other, EraseError::Open),
            EraseError::Open(_)
        ));
    }

    #[test]
    fn rmdir_not_empty_is_classified() {
        let err = io::Error::from(io::ErrorKind::DirectoryNotEmpty);
        assert!(matches!(
            EraseError::from_rmdir(err),
            EraseError::DirectoryNotEmpty
        ));
    }
}
