//! nettriage common - evidence, classification and remediation
//!
//! One-shot network incident triage: collect reachability evidence,
//! classify it into a verdict, and run gated remediation steps with every
//! action logged to a per-run session directory.

pub mod classifier;
pub mod collector;
pub mod command;
pub mod config;
pub mod confirm;
pub mod error;
pub mod evidence;
pub mod remediation;
pub mod session;

pub use classifier::{classify, classify_and_record, classify_with, Classification, Issue, Verdict};
pub use collector::{Collector, Probe, SystemCollector};
pub use command::{CommandRunner, CommandSpec, SystemRunner};
pub use config::TriageConfig;
pub use confirm::{CancelToken, Confirm};
pub use error::{ActionError, Result, TriageError};
pub use evidence::EvidenceRecord;
pub use remediation::{
    default_steps, RemediationOutcome, RemediationPipeline, RemediationStep, StepReport,
};
pub use session::{SessionContext, SessionLog};
