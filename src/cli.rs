use std::io::{self, BufRead, Write};
use std::num::NonZeroU32;
use std::path::PathBuf;

use clap::Parser;

use crate::config::{self, DEFAULT_PASSES};
use crate::ledger::DEFAULT_LOG_FILE;

#[derive(Parser, Debug)]
#[command(
    name = "secure-erase",
    about = "Overwrite files with random data before deleting them, keeping a CSV audit log",
    version
)]
pub struct Cli {
    /// Files or folders to erase. Prompted for when omitted.
    pub paths: Vec<PathBuf>,

    /// Number of overwrite passes. Prompted for when omitted (default 3).
    #[arg(short, long, env = "SECURE_ERASE_PASSES", allow_negative_numbers = true)]
    pub passes: Option<i64>,

    /// Where to append the erasure log
    #[arg(long, env = "SECURE_ERASE_LOG", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Print a summary of the whole log after erasing
    #[arg(long)]
    pub summary: bool,

    /// Do not ask for confirmation before erasing
    #[arg(short, long)]
    pub yes: bool,
}

/// Split a comma-separated list of paths, dropping blanks.
pub fn split_paths(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn read_answer<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> io::Result<Option<String>> {
    write!(output, "{prompt}")?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Ask for one line of comma-separated paths.
pub fn prompt_paths<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> io::Result<Vec<PathBuf>> {
    writeln!(output, "No file paths provided. Let's collect them now.")?;
    let answer = read_answer(
        input,
        output,
        "Enter one or more file/folder paths (separated by commas): ",
    )?;
    Ok(answer.map(|a| split_paths(&a)).unwrap_or_default())
}

/// Ask for a pass count until a valid one is given. Blank input or EOF means the default.
pub fn prompt_passes<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> io::Result<NonZeroU32> {
    let prompt = format!("Number of overwrite passes (default is {DEFAULT_PASSES}): ");
    loop {
        let Some(answer) = read_answer(input, output, &prompt)? else {
            return Ok(DEFAULT_PASSES);
        };
        if answer.is_empty() {
            return Ok(DEFAULT_PASSES);
        }
        match config::parse_passes(&answer) {
            Ok(passes) => return Ok(passes),
            Err(e) => writeln!(output, "Invalid input: {e}. Try again.")?,
        }
    }
}

/// Yes/no confirmation; anything but `y`/`yes` declines.
pub fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> io::Result<bool> {
    let answer = read_answer(input, output, &format!("{question} [y/N]: "))?;
    Ok(matches!(
        answer.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("y" | "yes")
    ))
}
