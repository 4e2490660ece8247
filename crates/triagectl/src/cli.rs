//! CLI - Command-line argument parsing
//!
//! Defines the CLI structure using clap. Execution lives in `commands`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// nettriage CLI
#[derive(Parser, Debug)]
#[command(name = "triagectl")]
#[command(about = "One-shot network incident triage and gated remediation", long_about = None)]
#[command(version = env!("TRIAGE_VERSION"))]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Increase diagnostic output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by commands that open a session directory
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Parent directory for the session folder (overrides config)
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Config file (overrides $NETTRIAGE_CONFIG and the default path)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Do not wait for Enter before exiting
    #[arg(long)]
    pub no_pause: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect evidence, classify reachability, optionally remediate
    Diagnose {
        /// Offer remediation after classification
        #[arg(long)]
        fix: bool,

        /// Run every remediation step without asking
        #[arg(long, short = 'y')]
        yes: bool,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Run the remediation pipeline on its own
    Fix {
        /// Run every remediation step without asking
        #[arg(long, short = 'y')]
        yes: bool,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Classify a saved evidence record (JSON)
    Classify {
        /// Path to the evidence file, e.g. <session>/raw/evidence.txt
        evidence: PathBuf,
    },

    /// List the remediation steps in execution order
    Steps,
}
