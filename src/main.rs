use std::io::{self, IsTerminal};
use std::num::NonZeroU32;
use std::process::ExitCode;

use clap::Parser;

use secure_erase::cli::{self, Cli};
use secure_erase::config::{Config, DEFAULT_PASSES};
use secure_erase::{output, Eraser, Ledger};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let interactive = io::stdin().is_terminal();

    let paths = if cli.paths.is_empty() && interactive {
        println!("\n[Interactive Mode]");
        match cli::prompt_paths(&mut io::stdin().lock(), &mut io::stdout()) {
            Ok(paths) => paths,
            Err(e) => {
                output::print_warning(&format!("Could not read paths: {e}"));
                return ExitCode::from(2);
            }
        }
    } else {
        cli.paths.clone()
    };

    if paths.is_empty() {
        output::print_warning("No paths given, nothing to erase.");
        return ExitCode::from(2);
    }

    let config = match Config::resolve(&cli, || ask_passes(interactive)) {
        Ok(config) => config,
        Err(e) => {
            output::print_warning(&e.to_string());
            return ExitCode::from(2);
        }
    };

    output::print_banner();

    if interactive && !config.assume_yes {
        output::print_targets(&paths, config.passes.get());
        match cli::confirm(
            &mut io::stdin().lock(),
            &mut io::stdout(),
            "Data will be unrecoverable. Continue?",
        ) {
            Ok(true) => {}
            Ok(false) => {
                output::print_info("Aborted, nothing was erased.");
                return ExitCode::SUCCESS;
            }
            Err(e) => {
                output::print_warning(&format!("Could not read confirmation: {e}"));
                return ExitCode::from(2);
            }
        }
    }

    let ledger = Ledger::open(&config.log_file);
    log::debug!("ledger at {}", ledger.path().display());

    let mut eraser = Eraser::new(&ledger).with_progress(output::print_progress);
    let tally = eraser.erase_all(&paths, config.passes);
    output::print_tally(&tally);

    if config.show_summary {
        output::print_summary(&ledger.summary(), ledger.path());
    }

    if tally.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn ask_passes(interactive: bool) -> NonZeroU32 {
    if !interactive {
        return DEFAULT_PASSES;
    }
    cli::prompt_passes(&mut io::stdin().lock(), &mut io::stdout()).unwrap_or_else(|e| {
        log::warn!("could not read pass count, using {DEFAULT_PASSES}: {e}");
        DEFAULT_PASSES
    })
}
