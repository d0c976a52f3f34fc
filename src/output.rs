use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::eraser::Tally;
use crate::ledger::Summary;
use crate::progress::Progress;
use crate::utils::display_path;

pub fn print_banner() {
    println!(
        "{}",
        concat!("secure-erase v", env!("CARGO_PKG_VERSION"))
            .bold()
            .cyan()
    );
    println!();
}

/// Render one eraser event as a console line, tagged and colored by kind.
pub fn print_progress(event: &Progress<'_>) {
    let line = event.to_string();
    match event {
        Progress::PassComplete { .. } => println!("  {}", format!("→ {line}").dimmed()),
        Progress::Erased(_) | Progress::DirectoryRemoved(_) => {
            println!("{} {line}", "[✓]".green().bold())
        }
        Progress::Failed(_, err) => println!(
            "{} {} {}",
            "[X]".red().bold(),
            format!("({})", err.category()).red().bold(),
            line.red()
        ),
        _ if event.is_warning() => println!("{} {}", "[!]".yellow().bold(), line.yellow()),
        Progress::EmptyFile(_) | Progress::DirectoryDone { .. } => {
            println!("{} {line}", "[i]".cyan().bold())
        }
        _ => println!("{} {line}", "[→]".cyan().bold()),
    }
}

/// List what is about to be destroyed.
pub fn print_targets(paths: &[PathBuf], passes: u32) {
    println!(
        "{}",
        format!("About to erase with {passes} passes:").bold().white()
    );
    for path in paths {
        println!("  {}", display_path(path).yellow());
    }
    println!();
}

pub fn print_tally(tally: &Tally) {
    println!();
    let line = format!(
        "{}/{} processed successfully",
        tally.succeeded, tally.total
    );
    if tally.all_succeeded() {
        println!("{}", line.green().bold());
    } else {
        println!("{}", line.red().bold());
    }
}

pub fn print_summary(summary: &Summary, ledger: &Path) {
    println!();
    println!("{}", "=== Erasure log summary ===".bold().white());
    println!("  {:<12} {}", "Log file:", ledger.display().to_string().dimmed());
    println!("  {:<12} {}", "Total:", summary.total);
    println!("  {:<12} {}", "Successful:", summary.successful.to_string().green());
    println!("  {:<12} {}", "Failed:", summary.failed.to_string().red());
}

pub fn print_warning(msg: &str) {
    println!("{} {}", "Warning:".red().bold(), msg.red());
}

pub fn print_info(msg: &str) {
    println!("{} {}", "Info:".cyan().bold(), msg);
}
