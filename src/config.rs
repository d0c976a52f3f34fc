use std::num::NonZeroU32;
use std::path::PathBuf;

use crate::cli::Cli;
use crate::error::ConfigError;

pub const DEFAULT_PASSES: NonZeroU32 = match NonZeroU32::new(3) {
    Some(n) => n,
    None => unreachable!(),
};

/// Settings for one run, fixed before any file is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub passes: NonZeroU32,
    pub log_file: PathBuf,
    pub show_summary: bool,
    pub assume_yes: bool,
}

impl Config {
    /// Build from parsed arguments. `ask_passes` is consulted only when
    /// neither `--passes` nor `SECURE_ERASE_PASSES` supplied a count.
    pub fn resolve(cli: &Cli, ask_passes: impl FnOnce() -> NonZeroU32) -> Result<Self, ConfigError> {
        let passes = match cli.passes {
            Some(n) => passes_from_int(n)?,
            None => ask_passes(),
        };

        Ok(Self {
            passes,
            log_file: cli.log_file.clone(),
            show_summary: cli.summary,
            assume_yes: cli.yes,
        })
    }
}

/// Parse a pass count typed by the operator.
pub fn parse_passes(raw: &str) -> Result<NonZeroU32, ConfigError> {
    let raw = raw.trim();
    let n: i64 = raw
        .parse()
        .map_err(|_| ConfigError::InvalidPasses(raw.to_string()))?;
    passes_from_int(n)
}

pub fn passes_from_int(n: i64) -> Result<NonZeroU32, ConfigError> {
    u32::try_from(n)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(ConfigError::PassesOutOfRange(n))
}
