//! Remediation pipeline
//!
//! Features:
//! - Static step catalog, cheapest and least disruptive first
//! - Per-step confirmation (or auto-confirm), a declined step never stops
//!   the steps after it
//! - Full output or error detail captured to `raw/<key>.txt` per step
//! - One `fix.txt` line per step with what ran and how it ended
//! - Cooperative cancellation honored at step boundaries
//!
//! There is no retry and no early exit on failure. A step is
//! `Pending -> Skipped | ExecutedSuccess | ExecutedFailure`.

use crate::command::{CommandRunner, CommandSpec};
use crate::confirm::{CancelToken, Confirm};
use crate::session::{SessionContext, SessionLog};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Pause between disabling and re-enabling adapters
pub const ADAPTER_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Per-user proxy settings key. HKCU is the hive of the account running
/// triagectl, which differs from the desktop user under "run as other admin".
const USER_PROXY_KEY: &str = r"HKCU:\Software\Microsoft\Windows\CurrentVersion\Internet Settings";

// =============================================================================
// Step definitions
// =============================================================================

/// One unit of work inside a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubAction {
    Run(CommandSpec),
    Pause(Duration),
}

impl SubAction {
    pub fn describe(&self) -> String {
        match self {
            SubAction::Run(spec) => spec.display(),
            SubAction::Pause(d) => format!("wait {}s", d.as_secs()),
        }
    }
}

/// A gated remediation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationStep {
    pub name: String,
    /// Operator-facing confirmation text
    pub prompt: String,
    pub actions: Vec<SubAction>,
    /// Raw artifact name under `raw/`
    pub raw_output_key: String,
}

impl RemediationStep {
    pub fn new(name: &str, prompt: &str, raw_output_key: &str) -> Self {
        Self {
            name: name.to_string(),
            prompt: prompt.to_string(),
            actions: Vec::new(),
            raw_output_key: raw_output_key.to_string(),
        }
    }

    pub fn run(mut self, spec: CommandSpec) -> Self {
        self.actions.push(SubAction::Run(spec));
        self
    }

    pub fn pause(mut self, duration: Duration) -> Self {
        self.actions.push(SubAction::Pause(duration));
        self
    }

    /// Commands this step runs, joined for the log line
    pub fn describe_actions(&self) -> String {
        self.actions
            .iter()
            .map(SubAction::describe)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// The fixed remediation catalog, in execution order. Later steps are more
/// disruptive; the order must not change.
pub fn default_steps() -> Vec<RemediationStep> {
    vec![
        RemediationStep::new("Flush DNS cache", "Flush DNS cache", "fix_flushdns")
            .run(CommandSpec::new("ipconfig", &["/flushdns"])),
        RemediationStep::new("Register DNS", "Register DNS", "fix_registerdns")
            .run(CommandSpec::new("ipconfig", &["/registerdns"])),
        RemediationStep::new(
            "Release and renew IP",
            "Release and renew IP (will drop connection briefly)",
            "fix_release_renew",
        )
        .run(CommandSpec::new("ipconfig", &["/release"]))
        .run(CommandSpec::new("ipconfig", &["/renew"])),
        RemediationStep::new(
            "Reset Winsock catalog",
            "Reset Winsock (reboot recommended after)",
            "fix_winsock_reset",
        )
        .run(CommandSpec::new("netsh", &["winsock", "reset"])),
        RemediationStep::new(
            "Reset IP stack",
            "Reset IP stack (reboot recommended after)",
            "fix_ip_reset",
        )
        .run(CommandSpec::new("netsh", &["int", "ip", "reset"])),
        RemediationStep::new(
            "Restart all network adapters",
            "Restart all network adapters",
            "fix_restart_adapters",
        )
        .run(CommandSpec::powershell(
            "Get-NetAdapter | Restart-NetAdapter -Confirm:$false",
        )),
        RemediationStep::new(
            "Disable then re-enable all network adapters",
            "Disable then enable all network adapters",
            "fix_toggle_adapters",
        )
        .run(CommandSpec::powershell(
            "Get-NetAdapter | Disable-NetAdapter -Confirm:$false",
        ))
        .pause(ADAPTER_SETTLE_DELAY)
        .run(CommandSpec::powershell(
            "Get-NetAdapter | Enable-NetAdapter -Confirm:$false",
        )),
        RemediationStep::new(
            "Restart DNS resolver service",
            "Restart DNS Client service (Dnscache)",
            "fix_restart_dnscache",
        )
        .run(CommandSpec::powershell("Restart-Service -Name Dnscache -Force")),
        RemediationStep::new(
            "Clear proxy configuration",
            "Clear WinHTTP and user proxy settings",
            "fix_clear_proxy",
        )
        .run(CommandSpec::new("netsh", &["winhttp", "reset", "proxy"]))
        .run(CommandSpec::powershell(&format!(
            "Set-ItemProperty -Path '{key}' -Name ProxyEnable -Value 0; \
             Remove-ItemProperty -Path '{key}' -Name ProxyServer,AutoConfigURL -ErrorAction SilentlyContinue",
            key = USER_PROXY_KEY
        ))),
    ]
}

// =============================================================================
// Outcomes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationOutcome {
    Skipped,
    ExecutedSuccess,
    ExecutedFailure,
}

impl RemediationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemediationOutcome::Skipped => "SKIPPED",
            RemediationOutcome::ExecutedSuccess => "OK",
            RemediationOutcome::ExecutedFailure => "FAILED",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            RemediationOutcome::Skipped => "[SKIP]",
            RemediationOutcome::ExecutedSuccess => "[OK]",
            RemediationOutcome::ExecutedFailure => "[FAIL]",
        }
    }

    pub fn executed(&self) -> bool {
        !matches!(self, RemediationOutcome::Skipped)
    }
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub name: String,
    pub outcome: RemediationOutcome,
    /// Raw artifact path, present only when the step ran
    pub artifact: Option<PathBuf>,
    /// First line of the error, for failed steps
    pub error: Option<String>,
}

/// Counts over a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemediationTally {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RemediationTally {
    pub fn from_reports(reports: &[StepReport]) -> Self {
        let mut tally = Self::default();
        for report in reports {
            match report.outcome {
                RemediationOutcome::Skipped => tally.skipped += 1,
                RemediationOutcome::ExecutedSuccess => tally.succeeded += 1,
                RemediationOutcome::ExecutedFailure => tally.failed += 1,
            }
        }
        tally
    }

    pub fn format(&self) -> String {
        format!(
            "{} succeeded, {} failed, {} skipped",
            self.succeeded, self.failed, self.skipped
        )
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Sequential walk over a step list
pub struct RemediationPipeline<'a> {
    runner: &'a dyn CommandRunner,
    session: &'a SessionContext,
    cancel: CancelToken,
}

impl<'a> RemediationPipeline<'a> {
    pub fn new(runner: &'a dyn CommandRunner, session: &'a SessionContext) -> Self {
        Self {
            runner,
            session,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run every step in order. Always returns one report per step.
    pub fn run(
        &self,
        steps: &[RemediationStep],
        auto_confirm: bool,
        confirm: &mut dyn Confirm,
    ) -> Vec<StepReport> {
        self.session.note(
            SessionLog::Fix,
            &format!(
                "Remediation started ({} steps, auto-confirm: {})",
                steps.len(),
                if auto_confirm { "yes" } else { "no" }
            ),
        );
        info!(steps = steps.len(), auto_confirm, "remediation started");

        let mut reports = Vec::with_capacity(steps.len());
        for step in steps {
            reports.push(self.run_step(step, auto_confirm, confirm));
        }

        let tally = RemediationTally::from_reports(&reports);
        self.session.note(
            SessionLog::Fix,
            &format!("Remediation finished: {}", tally.format()),
        );
        info!(
            succeeded = tally.succeeded,
            failed = tally.failed,
            skipped = tally.skipped,
            "remediation finished"
        );

        reports
    }

    fn run_step(
        &self,
        step: &RemediationStep,
        auto_confirm: bool,
        confirm: &mut dyn Confirm,
    ) -> StepReport {
        if self.cancel.is_cancelled() {
            self.session
                .note(SessionLog::Fix, &format!("Skipped: {} (cancelled)", step.name));
            return skipped(step);
        }

        if !auto_confirm && !confirm.confirm(&step.prompt) {
            let reason = if self.cancel.is_cancelled() {
                "cancelled"
            } else {
                "declined"
            };
            self.session
                .note(SessionLog::Fix, &format!("Skipped: {} ({})", step.name, reason));
            info!(step = %step.name, reason, "step skipped");
            return skipped(step);
        }

        let (transcript, error) = self.execute(step);

        let artifact = match self.session.write_raw(&step.raw_output_key, &transcript) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(step = %step.name, error = %e, "could not write raw artifact");
                None
            }
        };

        let outcome = if error.is_some() {
            RemediationOutcome::ExecutedFailure
        } else {
            RemediationOutcome::ExecutedSuccess
        };

        let mut line = format!(
            "Ran: {} [{}] -> {}",
            step.name,
            step.describe_actions(),
            outcome.as_str()
        );
        if let Some(ref err) = error {
            line.push_str(&format!(": {}", err));
            warn!(step = %step.name, error = %err, "step failed");
        } else {
            info!(step = %step.name, "step succeeded");
        }
        self.session.note(SessionLog::Fix, &line);

        StepReport {
            name: step.name.clone(),
            outcome,
            artifact,
            error,
        }
    }

    /// Run every sub-action, even after one fails, so a paired action
    /// (release/renew, disable/enable) always gets its second half. Returns
    /// the full transcript and the first one-line error, if any.
    fn execute(&self, step: &RemediationStep) -> (String, Option<String>) {
        let mut transcript = String::new();
        let mut errors: Vec<String> = Vec::new();

        for action in &step.actions {
            match action {
                SubAction::Pause(duration) => {
                    self.runner.pause(*duration);
                    transcript.push_str(&format!("(waited {}s)\n", duration.as_secs()));
                }
                SubAction::Run(spec) => {
                    match self.runner.run(spec).and_then(|c| c.into_result()) {
                        Ok(capture) => transcript.push_str(&capture.render()),
                        Err(e) => {
                            transcript.push_str(&e.detail());
                            transcript.push('\n');
                            errors.push(e.to_string());
                        }
                    }
                }
            }
        }

        let error = match errors.len() {
            0 => None,
            1 => errors.pop(),
            n => Some(format!("{} (+{} more)", errors[0], n - 1)),
        };
        (transcript, error)
    }
}

fn skipped(step: &RemediationStep) -> StepReport {
    StepReport {
        name: step.name.clone(),
        outcome: RemediationOutcome::Skipped,
        artifact: None,
        error: None,
    }
}
