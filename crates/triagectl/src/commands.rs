//! Command handlers and the session orchestrator
//!
//! Collector -> classifier -> (optional) remediation, strictly in sequence.
//! The orchestrator owns the session directory and is the only writer of
//! `summary.txt`.

use crate::cli::SessionArgs;
use crate::elevation::is_elevated;
use crate::output;
use crate::prompt::ConsoleConfirm;
use std::io::{BufRead, Write};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use triage_common::remediation::RemediationTally;
use triage_common::{
    classify, classify_and_record, default_steps, CancelToken, Classification, Collector,
    CommandRunner, Confirm, EvidenceRecord, RemediationPipeline, RemediationStep, SessionContext,
    SessionLog, StepReport, SystemCollector, SystemRunner, TriageConfig,
};

/// Exit code when the verdict is OK or remediation finished cleanly
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for orchestration errors
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Exit code when classification raised issues or a step failed
pub const EXIT_ISSUES_FOUND: i32 = 2;

/// How remediation is gated for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationMode {
    Off,
    Prompt,
    AutoConfirm,
}

impl RemediationMode {
    pub fn from_flags(fix: bool, yes: bool) -> Self {
        match (fix, yes) {
            (false, _) => RemediationMode::Off,
            (true, false) => RemediationMode::Prompt,
            (true, true) => RemediationMode::AutoConfirm,
        }
    }
}

/// Everything one diagnostic pass produced
#[derive(Debug, Clone)]
pub struct DiagnosisOutcome {
    pub evidence: EvidenceRecord,
    pub classification: Classification,
    pub remediation: Option<Vec<StepReport>>,
}

impl DiagnosisOutcome {
    pub fn exit_code(&self) -> i32 {
        let step_failed = self.remediation.as_ref().is_some_and(|reports| {
            RemediationTally::from_reports(reports).failed > 0
        });
        if self.classification.verdict.is_ok() && !step_failed {
            EXIT_SUCCESS
        } else {
            EXIT_ISSUES_FOUND
        }
    }
}

fn summary(session: &SessionContext, message: &str) -> Result<()> {
    session
        .log(SessionLog::Summary, message)
        .with_context(|| format!("writing {}", session.log_path(SessionLog::Summary).display()))
}

/// Create summary.txt with the session start line
pub fn begin_session(session: &SessionContext, kind: &str) -> Result<()> {
    summary(session, &format!("Session {} started ({})", session.id(), kind))?;
    summary(session, &format!("Session directory: {}", session.root().display()))
}

/// One full pass against a session opened with [`begin_session`]
pub fn run_diagnosis(
    session: &SessionContext,
    collector: &dyn Collector,
    runner: &dyn CommandRunner,
    steps: &[RemediationStep],
    mode: RemediationMode,
    confirm: &mut dyn Confirm,
    cancel: CancelToken,
) -> Result<DiagnosisOutcome> {
    summary(session, "Collecting evidence")?;
    let evidence = collector.collect(session);
    summary(session, "Evidence collected")?;

    summary(session, "Classifying reachability")?;
    let classification = classify_and_record(&evidence, session)
        .context("writing reachability log")?;
    for issue in &classification.issues {
        summary(session, &format!("Issue: {}", issue))?;
    }

    let remediation = match mode {
        RemediationMode::Off => None,
        RemediationMode::Prompt | RemediationMode::AutoConfirm => {
            let reports = run_remediation_steps(
                session,
                runner,
                steps,
                mode == RemediationMode::AutoConfirm,
                confirm,
                cancel,
            )?;
            Some(reports)
        }
    };

    summary(session, "Session finished")?;
    info!(
        verdict = classification.verdict.label(),
        remediated = remediation.is_some(),
        "diagnosis finished"
    );

    Ok(DiagnosisOutcome {
        evidence,
        classification,
        remediation,
    })
}

/// Remediation with summary bookkeeping
pub fn run_remediation_steps(
    session: &SessionContext,
    runner: &dyn CommandRunner,
    steps: &[RemediationStep],
    auto_confirm: bool,
    confirm: &mut dyn Confirm,
    cancel: CancelToken,
) -> Result<Vec<StepReport>> {
    summary(
        session,
        &format!(
            "Remediation started ({})",
            if auto_confirm { "auto-confirm" } else { "per-step confirmation" }
        ),
    )?;

    let reports = RemediationPipeline::new(runner, session)
        .with_cancel(cancel)
        .run(steps, auto_confirm, confirm);

    summary(
        session,
        &format!(
            "Remediation finished: {}",
            RemediationTally::from_reports(&reports).format()
        ),
    )?;
    Ok(reports)
}

// =============================================================================
// CLI entry points
// =============================================================================

fn load_config(args: &SessionArgs) -> Result<TriageConfig> {
    TriageConfig::load(args.config.as_deref()).context("loading configuration")
}

fn open_session(args: &SessionArgs, config: &TriageConfig) -> Result<SessionContext> {
    let root: PathBuf = args
        .out
        .clone()
        .unwrap_or_else(|| config.session.resolved_output_root());
    SessionContext::create(&root)
        .with_context(|| format!("creating session directory under {}", root.display()))
}

fn check_elevation(session: &SessionContext, remediating: bool) -> Result<()> {
    if !is_elevated() {
        let message = "Not running elevated; remediation steps will likely fail";
        if remediating {
            output::display_warning(message);
        }
        summary(session, message)?;
    }
    Ok(())
}

fn finish<R: BufRead, W: Write>(console: &mut ConsoleConfirm<R, W>, no_pause: bool) {
    if !no_pause {
        console.pause();
    }
}

pub fn diagnose(fix: bool, yes: bool, args: SessionArgs) -> Result<i32> {
    let config = load_config(&args)?;
    let session = open_session(&args, &config)?;
    let mode = RemediationMode::from_flags(fix, yes);

    output::display_header("Network triage");
    output::display_session(session.root());
    begin_session(&session, "diagnose")?;
    check_elevation(&session, mode != RemediationMode::Off)?;

    let runner = SystemRunner;
    let collector = SystemCollector::new(&runner, config.probes.clone());
    let cancel = CancelToken::new();
    let mut confirm = ConsoleConfirm::stdio(cancel.clone());

    println!("Collecting evidence...");
    let outcome = run_diagnosis(
        &session,
        &collector,
        &runner,
        &default_steps(),
        mode,
        &mut confirm,
        cancel,
    )?;

    println!();
    println!("{}", output::format_evidence(&outcome.evidence));
    println!();
    println!("{}", output::format_classification(&outcome.classification));

    if let Some(ref reports) = outcome.remediation {
        println!();
        println!("{}", output::format_step_reports(reports));
    } else if !outcome.classification.verdict.is_ok() {
        println!();
        println!("Rerun with --fix to try remediation steps.");
    }

    finish(&mut confirm, args.no_pause);
    Ok(outcome.exit_code())
}

pub fn fix(yes: bool, args: SessionArgs) -> Result<i32> {
    let config = load_config(&args)?;
    let session = open_session(&args, &config)?;

    output::display_header("Network remediation");
    output::display_session(session.root());
    begin_session(&session, "remediation only")?;
    check_elevation(&session, true)?;

    let cancel = CancelToken::new();
    let mut confirm = ConsoleConfirm::stdio(cancel.clone());
    let reports = run_remediation_steps(
        &session,
        &SystemRunner,
        &default_steps(),
        yes,
        &mut confirm,
        cancel,
    )?;
    summary(&session, "Session finished")?;

    println!();
    println!("{}", output::format_step_reports(&reports));

    finish(&mut confirm, args.no_pause);
    let failed = RemediationTally::from_reports(&reports).failed;
    Ok(if failed > 0 { EXIT_ISSUES_FOUND } else { EXIT_SUCCESS })
}

/// Classify a saved evidence file without opening a session
pub fn classify_file(path: &Path) -> Result<(EvidenceRecord, Classification)> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading evidence file {}", path.display()))?;
    let evidence: EvidenceRecord = serde_json::from_str(&content)
        .with_context(|| format!("parsing evidence file {}", path.display()))?;

    for field in evidence.invariant_violations() {
        output::display_warning(&format!(
            "{} is inconsistent with its precondition field",
            field
        ));
    }

    let classification = classify(&evidence);
    Ok((evidence, classification))
}

pub fn classify_command(path: &Path) -> Result<i32> {
    let (evidence, classification) = classify_file(path)?;
    println!("{}", output::format_evidence(&evidence));
    println!();
    println!("{}", output::format_classification(&classification));
    Ok(if classification.verdict.is_ok() {
        EXIT_SUCCESS
    } else {
        EXIT_ISSUES_FOUND
    })
}

pub fn steps() -> Result<i32> {
    println!("{}", output::format_catalog(&default_steps()));
    Ok(EXIT_SUCCESS)
}
