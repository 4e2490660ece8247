//! triagectl - one-shot network incident triage
//!
//! Collects reachability evidence, classifies it and optionally walks the
//! remediation steps. Every run leaves a session directory behind.

use clap::Parser;
use owo_colors::OwoColorize;
use triagectl::cli::{Cli, Commands};
use triagectl::commands::{self, EXIT_GENERAL_ERROR};
use triagectl::logging;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Diagnose { fix, yes, session } => commands::diagnose(fix, yes, session),
        Commands::Fix { yes, session } => commands::fix(yes, session),
        Commands::Classify { evidence } => commands::classify_command(&evidence),
        Commands::Steps => commands::steps(),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "error:".bright_red().bold(), e);
            std::process::exit(EXIT_GENERAL_ERROR);
        }
    }
}
