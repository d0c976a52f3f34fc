//! Multi-pass in-place file shredding with a CSV audit ledger.
//!
//! [`Eraser`] overwrites each file with fresh random bytes, syncs after every
//! pass, unlinks it and walks directories bottom-up. Each file outcome is
//! appended to the [`Ledger`], which can be summarised later.

pub mod cli;
pub mod config;
pub mod eraser;
pub mod error;
pub mod ledger;
pub mod output;
pub mod progress;
pub mod shredder;
pub mod utils;

pub use eraser::{Eraser, FileOutcome, Tally};
pub use error::{ConfigError, EraseError, LedgerError};
pub use ledger::{FileSize, Ledger, LedgerEntry, Summary};
pub use progress::Progress;
