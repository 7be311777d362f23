mod commands;
mod config;
mod utils;

use crate::commands::Cli;
use clap::Parser;
use std::process::ExitCode;
use yansi::{Condition, Paint};

fn main() -> ExitCode {
    yansi::whenever(Condition::STDERR_IS_TTY);
    let cli = Cli::parse();

    match cli.run() {
        Err(err) => {
            let root = err.root_cause();

            eprintln!("{}", format!("Error: {}", err).red());
            eprintln!();
            eprintln!("{}", "Caused by:".red());
            eprintln!("{}", format!("  {}", root).red());
            ExitCode::from(1)
        }
        Ok(_) => ExitCode::from(0),
    }
}
