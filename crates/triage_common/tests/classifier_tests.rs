//! Tests for classifier.rs

use triage_common::classifier::{
    classify, classify_and_record, Issue, Verdict, ISSUE_EXTERNAL_DNS_FAILED,
    ISSUE_EXTERNAL_IP_UNREACHABLE, ISSUE_GATEWAY_UNREACHABLE, ISSUE_LIKELY_DNS,
    ISSUE_NO_GATEWAY, ISSUE_UPSTREAM_BLOCK,
};
use triage_common::{EvidenceRecord, SessionContext, SessionLog};

fn healthy() -> EvidenceRecord {
    EvidenceRecord {
        gateway: Some("192.168.1.1".to_string()),
        gateway_reachable: Some(true),
        dns_servers: vec!["192.168.1.1".to_string()],
        dns_server_reachable: Some(true),
        external_ip_reachable: Some(true),
        external_dns_resolvable: Some(true),
        ncsi_dns_resolvable: Some(true),
        internal_domain: Some("corp.example".to_string()),
        internal_dns_resolvable: Some(true),
    }
}

fn issue_texts(evidence: &EvidenceRecord) -> Vec<String> {
    classify(evidence)
        .issues
        .iter()
        .map(|i| i.as_str().to_string())
        .collect()
}

const TRI: [Option<bool>; 3] = [None, Some(false), Some(true)];

/// Every combination of the probe signals, with and without gateway/domain
fn all_records() -> Vec<EvidenceRecord> {
    let mut records = Vec::new();
    for has_gateway in [false, true] {
        for gw in TRI {
            for ext_ip in TRI {
                for ext_dns in TRI {
                    for ncsi in TRI {
                        for has_domain in [false, true] {
                            for internal in TRI {
                                records.push(EvidenceRecord {
                                    gateway: has_gateway.then(|| "10.0.0.1".to_string()),
                                    gateway_reachable: gw,
                                    dns_servers: Vec::new(),
                                    dns_server_reachable: None,
                                    external_ip_reachable: ext_ip,
                                    external_dns_resolvable: ext_dns,
                                    ncsi_dns_resolvable: ncsi,
                                    internal_domain: has_domain
                                        .then(|| "corp.example".to_string()),
                                    internal_dns_resolvable: internal,
                                });
                            }
                        }
                    }
                }
            }
        }
    }
    records
}

#[test]
fn test_no_gateway_always_wins() {
    for mut record in all_records() {
        record.gateway = None;
        let result = classify(&record);
        assert_eq!(result.verdict, Verdict::NoDefaultGateway);
        assert_eq!(result.issues[0], Issue::new(ISSUE_NO_GATEWAY));
    }
}

#[test]
fn test_gateway_unreachable_beats_dns() {
    let mut e = healthy();
    e.gateway_reachable = Some(false);
    e.external_ip_reachable = Some(false);
    e.external_dns_resolvable = Some(false);
    e.ncsi_dns_resolvable = Some(false);
    e.internal_dns_resolvable = Some(false);

    let result = classify(&e);
    assert_eq!(result.verdict, Verdict::GatewayUnreachable);
    assert_eq!(result.issues[0], Issue::new(ISSUE_GATEWAY_UNREACHABLE));
    assert!(result.issues.contains(&Issue::new(ISSUE_EXTERNAL_DNS_FAILED)));
}

#[test]
fn test_upstream_block() {
    let mut e = healthy();
    e.external_ip_reachable = Some(false);

    let result = classify(&e);
    assert_eq!(result.verdict, Verdict::UpstreamOrOutboundBlock);
    assert_eq!(
        issue_texts(&e),
        vec![ISSUE_EXTERNAL_IP_UNREACHABLE, ISSUE_UPSTREAM_BLOCK]
    );
}

#[test]
fn test_ncsi_success_suppresses_external_dns_issue() {
    let mut e = healthy();
    e.external_dns_resolvable = Some(false);
    e.ncsi_dns_resolvable = Some(true);

    let result = classify(&e);
    assert_eq!(issue_texts(&e), vec![ISSUE_LIKELY_DNS]);
    assert_eq!(result.verdict, Verdict::SeeIssues);
}

#[test]
fn test_both_dns_probes_failing_is_dns_verdict() {
    let mut e = healthy();
    e.external_dns_resolvable = Some(false);
    e.ncsi_dns_resolvable = Some(false);

    let result = classify(&e);
    assert_eq!(
        issue_texts(&e),
        vec![ISSUE_EXTERNAL_DNS_FAILED, ISSUE_LIKELY_DNS]
    );
    assert_eq!(result.verdict, Verdict::DnsResolutionIssue);
}

#[test]
fn test_dns_failure_with_external_ip_down_is_upstream() {
    let mut e = healthy();
    e.external_ip_reachable = Some(false);
    e.external_dns_resolvable = Some(false);
    e.ncsi_dns_resolvable = Some(false);

    let result = classify(&e);
    assert_eq!(result.verdict, Verdict::UpstreamOrOutboundBlock);
    assert!(!issue_texts(&e).contains(&ISSUE_LIKELY_DNS.to_string()));
}

#[test]
fn test_fully_healthy_is_ok() {
    let result = classify(&healthy());
    assert!(result.issues.is_empty());
    assert_eq!(result.verdict, Verdict::Ok);

    let mut no_domain = healthy();
    no_domain.internal_domain = None;
    no_domain.internal_dns_resolvable = None;
    assert_eq!(classify(&no_domain).verdict, Verdict::Ok);
}

#[test]
fn test_issues_never_pair_with_ok() {
    for record in all_records() {
        let result = classify(&record);
        if !result.issues.is_empty() {
            assert_ne!(result.verdict, Verdict::Ok, "record: {:?}", record);
        } else {
            assert_eq!(result.verdict, Verdict::Ok, "record: {:?}", record);
        }
    }
}

#[test]
fn test_classification_is_deterministic() {
    for record in all_records().into_iter().step_by(7) {
        assert_eq!(classify(&record), classify(&record));
    }
}

#[test]
fn test_classify_and_record_writes_reachability_log() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionContext::open(dir.path()).unwrap();

    let mut e = healthy();
    e.external_ip_reachable = Some(false);
    let result = classify_and_record(&e, &session).unwrap();
    assert_eq!(result.verdict, Verdict::UpstreamOrOutboundBlock);

    let log = std::fs::read_to_string(session.log_path(SessionLog::Reachability)).unwrap();
    assert!(log.contains("Issue: cannot reach external IP"));
    assert!(log.contains("Issue: possible upstream/outbound block"));
    let last = log.lines().last().unwrap();
    assert!(last.ends_with("] Verdict: Upstream or outbound block"));

    // No summary yet, so the verdict is not mirrored
    assert!(!session.log_path(SessionLog::Summary).exists());
}

#[test]
fn test_verdict_mirrored_into_existing_summary() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionContext::open(dir.path()).unwrap();
    session.log(SessionLog::Summary, "Session started").unwrap();

    classify_and_record(&healthy(), &session).unwrap();

    let summary = std::fs::read_to_string(session.log_path(SessionLog::Summary)).unwrap();
    assert!(summary.lines().any(|l| l.ends_with("] Verdict: OK")));
}
