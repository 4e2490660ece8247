//! Reachability classifier
//!
//! Turns an [`EvidenceRecord`] into an ordered issue list and one verdict.
//!
//! Issue rules are independent: every rule that matches fires, in table
//! order. Verdict rules form a priority ladder: the first match wins. When
//! no ladder rule matches, the verdict is `SeeIssues` if any issue fired and
//! `Ok` otherwise, so a non-empty issue list never pairs with `Ok`.
//!
//! Both tables are plain data so tests can substitute fixtures through
//! [`classify_with`].

use crate::error::Result;
use crate::evidence::EvidenceRecord;
use crate::session::{SessionContext, SessionLog};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

// =============================================================================
// Issues
// =============================================================================

/// An opaque diagnostic finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Issue(String);

impl Issue {
    pub fn new(text: &str) -> Self {
        Self(text.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const ISSUE_NO_GATEWAY: &str = "no default gateway";
pub const ISSUE_GATEWAY_UNREACHABLE: &str = "default gateway unreachable";
pub const ISSUE_EXTERNAL_IP_UNREACHABLE: &str = "cannot reach external IP";
pub const ISSUE_EXTERNAL_DNS_FAILED: &str = "external DNS resolution failed";
pub const ISSUE_INTERNAL_DNS_FAILED: &str = "internal DNS resolution failed";
pub const ISSUE_UPSTREAM_BLOCK: &str = "possible upstream/outbound block";
pub const ISSUE_LIKELY_DNS: &str = "likely DNS issue";

/// Predicate over the evidence snapshot
pub type EvidencePredicate = fn(&EvidenceRecord) -> bool;

/// One independent issue rule
#[derive(Debug, Clone, Copy)]
pub struct IssueRule {
    pub id: &'static str,
    pub issue: &'static str,
    pub matches: EvidencePredicate,
}

/// Issue rules in report order
pub const ISSUE_RULES: &[IssueRule] = &[
    IssueRule {
        id: "no_gateway",
        issue: ISSUE_NO_GATEWAY,
        matches: |e| !e.has_gateway(),
    },
    IssueRule {
        id: "gateway_unreachable",
        issue: ISSUE_GATEWAY_UNREACHABLE,
        matches: |e| e.gateway_unreachable(),
    },
    IssueRule {
        id: "external_ip_unreachable",
        issue: ISSUE_EXTERNAL_IP_UNREACHABLE,
        matches: |e| e.external_ip_unreachable(),
    },
    // Both resolver targets must fail; one success means a flaky target.
    IssueRule {
        id: "external_dns_failed",
        issue: ISSUE_EXTERNAL_DNS_FAILED,
        matches: |e| e.external_dns_failed() && e.ncsi_dns_failed(),
    },
    IssueRule {
        id: "internal_dns_failed",
        issue: ISSUE_INTERNAL_DNS_FAILED,
        matches: |e| e.internal_dns_failed(),
    },
    IssueRule {
        id: "upstream_block",
        issue: ISSUE_UPSTREAM_BLOCK,
        matches: |e| e.gateway_reachable() && e.external_ip_unreachable(),
    },
    IssueRule {
        id: "likely_dns",
        issue: ISSUE_LIKELY_DNS,
        matches: |e| e.external_ip_reachable() && e.external_dns_failed(),
    },
];

// =============================================================================
// Verdicts
// =============================================================================

/// Single headline for the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Ok,
    NoDefaultGateway,
    GatewayUnreachable,
    UpstreamOrOutboundBlock,
    DnsResolutionIssue,
    InternalDnsResolutionIssue,
    SeeIssues,
}

impl Verdict {
    /// Label used in the `Verdict: <label>` log line
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Ok => "OK",
            Verdict::NoDefaultGateway => "No default gateway",
            Verdict::GatewayUnreachable => "Gateway unreachable",
            Verdict::UpstreamOrOutboundBlock => "Upstream or outbound block",
            Verdict::DnsResolutionIssue => "DNS resolution issue",
            Verdict::InternalDnsResolutionIssue => "Internal DNS resolution issue",
            Verdict::SeeIssues => "See issues",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Verdict::Ok)
    }

    pub fn log_line(&self) -> String {
        format!("Verdict: {}", self.label())
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One rung of the verdict ladder
#[derive(Debug, Clone, Copy)]
pub struct VerdictRule {
    pub verdict: Verdict,
    pub matches: EvidencePredicate,
}

/// Verdict ladder, highest precedence first
pub const VERDICT_RULES: &[VerdictRule] = &[
    VerdictRule {
        verdict: Verdict::NoDefaultGateway,
        matches: |e| !e.has_gateway(),
    },
    VerdictRule {
        verdict: Verdict::GatewayUnreachable,
        matches: |e| e.gateway_unreachable(),
    },
    VerdictRule {
        verdict: Verdict::UpstreamOrOutboundBlock,
        matches: |e| e.external_ip_unreachable() && e.gateway_reachable(),
    },
    VerdictRule {
        verdict: Verdict::DnsResolutionIssue,
        matches: |e| e.external_ip_reachable() && e.external_dns_failed() && e.ncsi_dns_failed(),
    },
    VerdictRule {
        verdict: Verdict::InternalDnsResolutionIssue,
        matches: |e| e.internal_dns_failed(),
    },
];

// =============================================================================
// Classification
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub issues: Vec<Issue>,
    pub verdict: Verdict,
}

/// Classify with the built-in rule tables
pub fn classify(evidence: &EvidenceRecord) -> Classification {
    classify_with(evidence, ISSUE_RULES, VERDICT_RULES)
}

/// Classify with caller-supplied rule tables
pub fn classify_with(
    evidence: &EvidenceRecord,
    issue_rules: &[IssueRule],
    verdict_rules: &[VerdictRule],
) -> Classification {
    let issues: Vec<Issue> = issue_rules
        .iter()
        .filter(|rule| (rule.matches)(evidence))
        .map(|rule| Issue::new(rule.issue))
        .collect();

    let verdict = verdict_rules
        .iter()
        .find(|rule| (rule.matches)(evidence))
        .map(|rule| rule.verdict)
        .unwrap_or(if issues.is_empty() {
            Verdict::Ok
        } else {
            Verdict::SeeIssues
        });

    // A ladder rule can match without any issue rule firing when the tables
    // are substituted; the headline still stands. The reverse is not allowed.
    let verdict = if verdict.is_ok() && !issues.is_empty() {
        Verdict::SeeIssues
    } else {
        verdict
    };

    Classification { issues, verdict }
}

/// Classify and write the reachability log: evidence, every issue, then
/// the verdict line (mirrored into the summary when it exists)
pub fn classify_and_record(
    evidence: &EvidenceRecord,
    session: &SessionContext,
) -> Result<Classification> {
    let classification = classify(evidence);

    session.log(SessionLog::Reachability, "Reachability evidence:")?;
    for line in evidence.format_lines() {
        session.log(SessionLog::Reachability, &format!("  {}", line))?;
    }

    if classification.issues.is_empty() {
        session.log(SessionLog::Reachability, "No issues found")?;
    } else {
        for issue in &classification.issues {
            session.log(SessionLog::Reachability, &format!("Issue: {}", issue))?;
        }
    }
    session.record_verdict(classification.verdict)?;

    info!(
        verdict = classification.verdict.label(),
        issues = classification.issues.len(),
        "classification recorded"
    );
    Ok(classification)
}
