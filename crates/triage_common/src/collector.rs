//! Evidence collector
//!
//! Reads gateway, DNS servers and internal domain from the OS, then runs the
//! ICMP and name-resolution probes. Collection never fails: a probe that
//! cannot run counts as a failed probe, and a read that fails leaves the
//! field empty. Each such failure gets one line in `collect.txt`.

use crate::command::{CommandRunner, CommandSpec};
use crate::config::ProbeTargets;
use crate::evidence::EvidenceRecord;
use crate::session::{SessionContext, SessionLog};
use std::net::ToSocketAddrs;
use tracing::{debug, info, warn};

/// Name of the raw capture holding the evidence record as JSON
pub const EVIDENCE_RAW_NAME: &str = "evidence";

/// Produces one evidence record per session
pub trait Collector {
    fn collect(&self, session: &SessionContext) -> EvidenceRecord;
}

/// Reachability and resolution probes
pub trait Probe {
    fn ping(&self, host: &str) -> bool;
    fn resolve(&self, name: &str) -> bool;
}

/// Configuration read from the OS before probing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaselineFacts {
    pub gateway: Option<String>,
    pub dns_servers: Vec<String>,
    pub internal_domain: Option<String>,
}

/// Run every probe whose precondition holds and build the record.
/// Probes with a missing precondition stay `None`.
pub fn probe_evidence(
    facts: &BaselineFacts,
    probe: &dyn Probe,
    targets: &ProbeTargets,
    session: &SessionContext,
) -> EvidenceRecord {
    let log = |msg: String| session.note(SessionLog::Collect, &msg);

    let gateway_reachable = match facts.gateway {
        Some(ref gw) => {
            let ok = probe.ping(gw);
            log(format!("Ping gateway {}: {}", gw, status(ok)));
            Some(ok)
        }
        None => {
            log("No default gateway configured".to_string());
            None
        }
    };

    let dns_server_reachable = match facts.dns_servers.first() {
        Some(server) => {
            let ok = probe.ping(server);
            log(format!("Ping DNS server {}: {}", server, status(ok)));
            Some(ok)
        }
        None => {
            log("No DNS servers configured".to_string());
            None
        }
    };

    let external_ip_reachable = probe.ping(&targets.external_ip);
    log(format!(
        "Ping external IP {}: {}",
        targets.external_ip,
        status(external_ip_reachable)
    ));

    let external_dns_resolvable = probe.resolve(&targets.external_host);
    log(format!(
        "Resolve {}: {}",
        targets.external_host,
        status(external_dns_resolvable)
    ));

    let ncsi_dns_resolvable = probe.resolve(&targets.ncsi_host);
    log(format!(
        "Resolve {}: {}",
        targets.ncsi_host,
        status(ncsi_dns_resolvable)
    ));

    let internal_dns_resolvable = facts.internal_domain.as_ref().map(|domain| {
        let ok = probe.resolve(domain);
        log(format!("Resolve internal domain {}: {}", domain, status(ok)));
        ok
    });

    EvidenceRecord {
        gateway: facts.gateway.clone(),
        gateway_reachable,
        dns_servers: facts.dns_servers.clone(),
        dns_server_reachable,
        external_ip_reachable: Some(external_ip_reachable),
        external_dns_resolvable: Some(external_dns_resolvable),
        ncsi_dns_resolvable: Some(ncsi_dns_resolvable),
        internal_domain: facts.internal_domain.clone(),
        internal_dns_resolvable,
    }
}

fn status(ok: bool) -> &'static str {
    if ok {
        "OK"
    } else {
        "FAILED"
    }
}

// =============================================================================
// System collector
// =============================================================================

/// Collector backed by OS commands and the system resolver
pub struct SystemCollector<'a> {
    runner: &'a dyn CommandRunner,
    targets: ProbeTargets,
}

impl<'a> SystemCollector<'a> {
    pub fn new(runner: &'a dyn CommandRunner, targets: ProbeTargets) -> Self {
        Self { runner, targets }
    }

    /// Store baseline snapshots under `raw/`
    fn capture_baseline(&self, session: &SessionContext) {
        for (name, spec) in baseline_commands() {
            match self.runner.run(&spec) {
                Ok(capture) => {
                    if !capture.success() {
                        session.note(
                            SessionLog::Collect,
                            &format!("Capture {} exited with code {}", name, capture.exit_code),
                        );
                    }
                    if let Err(e) = session.write_raw(name, &capture.render()) {
                        warn!(capture = name, error = %e, "raw capture not saved");
                    }
                }
                Err(e) => {
                    session.note(SessionLog::Collect, &format!("Capture {} failed: {}", name, e));
                }
            }
        }
    }

    fn read_facts(&self, session: &SessionContext) -> BaselineFacts {
        let facts = read_platform_facts(self.runner, session);
        debug!(?facts, "baseline facts read");
        facts
    }
}

impl Collector for SystemCollector<'_> {
    fn collect(&self, session: &SessionContext) -> EvidenceRecord {
        session.note(SessionLog::Collect, "Collection started");
        self.capture_baseline(session);

        let facts = self.read_facts(session);
        session.note(
            SessionLog::Collect,
            &format!(
                "Gateway: {}; DNS servers: {}; internal domain: {}",
                facts.gateway.as_deref().unwrap_or("(none)"),
                if facts.dns_servers.is_empty() {
                    "(none)".to_string()
                } else {
                    facts.dns_servers.join(", ")
                },
                facts.internal_domain.as_deref().unwrap_or("(none)")
            ),
        );

        let evidence = probe_evidence(&facts, self, &self.targets, session);

        match serde_json::to_string_pretty(&evidence) {
            Ok(json) => {
                if let Err(e) = session.write_raw(EVIDENCE_RAW_NAME, &json) {
                    warn!(error = %e, "evidence archive not saved");
                }
            }
            Err(e) => warn!(error = %e, "evidence not serializable"),
        }

        session.note(SessionLog::Collect, "Collection finished");
        info!(gateway = ?evidence.gateway, "evidence collected");
        evidence
    }
}

impl Probe for SystemCollector<'_> {
    fn ping(&self, host: &str) -> bool {
        let spec = ping_command(host, &self.targets);
        match self.runner.run(&spec) {
            Ok(capture) => capture.success() && ping_reply_seen(&capture.stdout),
            Err(e) => {
                debug!(host, error = %e, "ping could not run");
                false
            }
        }
    }

    fn resolve(&self, name: &str) -> bool {
        match (name, 0u16).to_socket_addrs() {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(e) => {
                debug!(name, error = %e, "resolution failed");
                false
            }
        }
    }
}

#[cfg(windows)]
fn ping_command(host: &str, targets: &ProbeTargets) -> CommandSpec {
    CommandSpec::new(
        "ping",
        &[
            "-n",
            &targets.ping_count.to_string(),
            "-w",
            &targets.ping_timeout_ms.to_string(),
            host,
        ],
    )
}

#[cfg(not(windows))]
fn ping_command(host: &str, targets: &ProbeTargets) -> CommandSpec {
    // -W takes whole seconds here
    let timeout_secs = targets.ping_timeout_ms.div_ceil(1000).max(1);
    CommandSpec::new(
        "ping",
        &[
            "-c",
            &targets.ping_count.to_string(),
            "-W",
            &timeout_secs.to_string(),
            host,
        ],
    )
}

/// Windows ping exits 0 on "Destination host unreachable"; only an echo
/// reply carries a TTL.
pub fn ping_reply_seen(stdout: &str) -> bool {
    stdout.to_ascii_lowercase().contains("ttl=")
}

// =============================================================================
// Platform readers
// =============================================================================

#[cfg(windows)]
fn baseline_commands() -> Vec<(&'static str, CommandSpec)> {
    vec![
        ("ipconfig_all", CommandSpec::new("ipconfig", &["/all"])),
        ("route_print", CommandSpec::new("route", &["print"])),
        (
            "firewall_profiles",
            CommandSpec::new("netsh", &["advfirewall", "show", "allprofiles"]),
        ),
        (
            "net_adapters",
            CommandSpec::powershell("Get-NetAdapter | Format-Table -AutoSize | Out-String -Width 200"),
        ),
    ]
}

#[cfg(not(windows))]
fn baseline_commands() -> Vec<(&'static str, CommandSpec)> {
    vec![
        ("ip_addr", CommandSpec::new("ip", &["addr", "show"])),
        ("ip_route", CommandSpec::new("ip", &["route", "show"])),
        ("resolv_conf", CommandSpec::new("cat", &["/etc/resolv.conf"])),
    ]
}

#[cfg(windows)]
fn read_platform_facts(runner: &dyn CommandRunner, session: &SessionContext) -> BaselineFacts {
    let gateway = run_for_stdout(
        runner,
        session,
        "default gateway",
        &CommandSpec::powershell(
            "Get-NetRoute -DestinationPrefix '0.0.0.0/0' | Sort-Object RouteMetric | \
             Select-Object -First 1 -ExpandProperty NextHop",
        ),
    )
    .and_then(|out| parse_gateway_line(&out));

    let dns_servers = run_for_stdout(
        runner,
        session,
        "DNS servers",
        &CommandSpec::powershell(
            "Get-DnsClientServerAddress -AddressFamily IPv4 | \
             Select-Object -ExpandProperty ServerAddresses",
        ),
    )
    .map(|out| parse_line_list(&out))
    .unwrap_or_default();

    let internal_domain = std::env::var("USERDNSDOMAIN")
        .ok()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    BaselineFacts {
        gateway,
        dns_servers,
        internal_domain,
    }
}

#[cfg(not(windows))]
fn read_platform_facts(runner: &dyn CommandRunner, session: &SessionContext) -> BaselineFacts {
    let gateway = run_for_stdout(
        runner,
        session,
        "default gateway",
        &CommandSpec::new("ip", &["route", "show", "default"]),
    )
    .and_then(|out| parse_ip_route_default(&out));

    let (dns_servers, internal_domain) = match std::fs::read_to_string("/etc/resolv.conf") {
        Ok(content) => parse_resolv_conf(&content),
        Err(e) => {
            session.note(
                SessionLog::Collect,
                &format!("Read DNS servers failed: {}", e),
            );
            (Vec::new(), None)
        }
    };

    BaselineFacts {
        gateway,
        dns_servers,
        internal_domain,
    }
}

/// Run a query command and return stdout, logging a note on failure
fn run_for_stdout(
    runner: &dyn CommandRunner,
    session: &SessionContext,
    what: &str,
    spec: &CommandSpec,
) -> Option<String> {
    match runner.run(spec).and_then(|c| c.into_result()) {
        Ok(capture) => Some(capture.stdout),
        Err(e) => {
            session.note(SessionLog::Collect, &format!("Read {} failed: {}", what, e));
            None
        }
    }
}

// =============================================================================
// Parsers
// =============================================================================

/// Gateway from `ip route show` output (`default via <gw> dev ...`)
pub fn parse_ip_route_default(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        if parts.next() == Some("default") && parts.next() == Some("via") {
            parts.next().map(|gw| gw.to_string())
        } else {
            None
        }
    })
}

/// First non-empty line as a gateway, ignoring the on-link `0.0.0.0`
pub fn parse_gateway_line(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .filter(|l| *l != "0.0.0.0" && *l != "::")
        .map(|l| l.to_string())
}

/// One value per line, trimmed, de-duplicated, order kept
pub fn parse_line_list(output: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if !line.is_empty() && !values.iter().any(|v| v == line) {
            values.push(line.to_string());
        }
    }
    values
}

/// Nameservers and domain from resolv.conf. `domain` wins over the first
/// `search` entry.
pub fn parse_resolv_conf(content: &str) -> (Vec<String>, Option<String>) {
    let mut servers: Vec<String> = Vec::new();
    let mut domain = None;
    let mut search = None;

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("nameserver") => {
                if let Some(server) = parts.next() {
                    if !servers.iter().any(|s| s == server) {
                        servers.push(server.to_string());
                    }
                }
            }
            Some("domain") => domain = parts.next().map(|d| d.to_string()),
            Some("search") => {
                if search.is_none() {
                    search = parts.next().map(|d| d.to_string());
                }
            }
            _ => {}
        }
    }

    // A bare "." search entry means no domain
    let domain = domain.or(search).filter(|d| d != ".");
    (servers, domain)
}
