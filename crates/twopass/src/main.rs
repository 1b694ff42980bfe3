//! twopass: list and render page templates from the command line.
//!
//! ```bash
//! twopass --root site/tmpl list
//! twopass --root site/tmpl render docs/intro --title "Intro"
//! twopass --config twopass.yaml render / --raw
//! ```

mod cli;

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Outcome};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut stdout = std::io::stdout().lock();
    let outcome = cli.run(&mut stdout)?;
    stdout.flush()?;

    match outcome {
        Outcome::Success => Ok(ExitCode::SUCCESS),
        Outcome::PageError(message) => {
            eprintln!("twopass: {}", message);
            Ok(ExitCode::FAILURE)
        }
    }
}
