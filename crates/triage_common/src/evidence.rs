//! Evidence record
//!
//! Flat snapshot of network state produced once per session by the
//! collector. Optional booleans are `None` only when the precondition for
//! the probe is missing (no gateway, no DNS servers, no domain). A probe
//! that ran and failed is `Some(false)`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Next hop of the default route
    pub gateway: Option<String>,
    pub gateway_reachable: Option<bool>,

    /// Configured resolvers, in adapter order
    #[serde(default)]
    pub dns_servers: Vec<String>,
    /// Reachability of `dns_servers[0]`
    pub dns_server_reachable: Option<bool>,

    pub external_ip_reachable: Option<bool>,
    pub external_dns_resolvable: Option<bool>,
    /// Secondary external DNS signal (connectivity-check hostname)
    pub ncsi_dns_resolvable: Option<bool>,

    pub internal_domain: Option<String>,
    pub internal_dns_resolvable: Option<bool>,
}

impl EvidenceRecord {
    pub fn has_gateway(&self) -> bool {
        self.gateway.is_some()
    }

    pub fn gateway_reachable(&self) -> bool {
        self.has_gateway() && self.gateway_reachable == Some(true)
    }

    pub fn gateway_unreachable(&self) -> bool {
        self.has_gateway() && self.gateway_reachable == Some(false)
    }

    pub fn external_ip_reachable(&self) -> bool {
        self.external_ip_reachable == Some(true)
    }

    pub fn external_ip_unreachable(&self) -> bool {
        self.external_ip_reachable == Some(false)
    }

    pub fn external_dns_failed(&self) -> bool {
        self.external_dns_resolvable == Some(false)
    }

    pub fn ncsi_dns_failed(&self) -> bool {
        self.ncsi_dns_resolvable == Some(false)
    }

    pub fn internal_dns_failed(&self) -> bool {
        self.internal_domain.is_some() && self.internal_dns_resolvable == Some(false)
    }

    /// Check the `None`-iff-precondition-missing invariant. Returns the
    /// names of fields that violate it.
    pub fn invariant_violations(&self) -> Vec<&'static str> {
        let mut bad = Vec::new();
        if self.gateway.is_some() != self.gateway_reachable.is_some() {
            bad.push("gateway_reachable");
        }
        if self.dns_servers.is_empty() != self.dns_server_reachable.is_none() {
            bad.push("dns_server_reachable");
        }
        if self.internal_domain.is_some() != self.internal_dns_resolvable.is_some() {
            bad.push("internal_dns_resolvable");
        }
        bad
    }

    /// Multi-line human-readable rendering for the collect log
    pub fn format_lines(&self) -> Vec<String> {
        vec![
            format!("Gateway: {}", self.gateway.as_deref().unwrap_or("(none)")),
            format!("Gateway reachable: {}", fmt_probe(self.gateway_reachable)),
            format!(
                "DNS servers: {}",
                if self.dns_servers.is_empty() {
                    "(none)".to_string()
                } else {
                    self.dns_servers.join(", ")
                }
            ),
            format!(
                "Primary DNS server reachable: {}",
                fmt_probe(self.dns_server_reachable)
            ),
            format!(
                "External IP reachable: {}",
                fmt_probe(self.external_ip_reachable)
            ),
            format!(
                "External DNS resolvable: {}",
                fmt_probe(self.external_dns_resolvable)
            ),
            format!("NCSI DNS resolvable: {}", fmt_probe(self.ncsi_dns_resolvable)),
            format!(
                "Internal domain: {}",
                self.internal_domain.as_deref().unwrap_or("(none)")
            ),
            format!(
                "Internal DNS resolvable: {}",
                fmt_probe(self.internal_dns_resolvable)
            ),
        ]
    }
}

fn fmt_probe(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "NO",
        None => "n/a",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record_is_consistent() {
        let record = EvidenceRecord::default();
        assert!(record.invariant_violations().is_empty());
        assert!(!record.has_gateway());
        assert!(!record.gateway_unreachable());
    }

    #[test]
    fn test_invariant_violations() {
        let record = EvidenceRecord {
            gateway: Some("10.0.0.1".to_string()),
            gateway_reachable: None,
            dns_servers: vec![],
            dns_server_reachable: Some(true),
            ..Default::default()
        };
        assert_eq!(
            record.invariant_violations(),
            vec!["gateway_reachable", "dns_server_reachable"]
        );
    }

    #[test]
    fn test_internal_dns_failed_requires_domain() {
        let mut record = EvidenceRecord {
            internal_dns_resolvable: Some(false),
            ..Default::default()
        };
        assert!(!record.internal_dns_failed());
        record.internal_domain = Some("corp.example".to_string());
        assert!(record.internal_dns_failed());
    }

    #[test]
    fn test_json_roundtrip_uses_snake_case() {
        let record = EvidenceRecord {
            gateway: Some("192.168.1.1".to_string()),
            gateway_reachable: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"gateway_reachable\":true"));
        let back: EvidenceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_missing_dns_servers_defaults_empty() {
        let record: EvidenceRecord = serde_json::from_str(r#"{"gateway":null}"#).unwrap();
        assert!(record.dns_servers.is_empty());
        assert_eq!(record.gateway_reachable, None);
    }

    #[test]
    fn test_format_lines() {
        let record = EvidenceRecord {
            gateway: Some("192.168.1.1".to_string()),
            gateway_reachable: Some(false),
            ..Default::default()
        };
        let lines = record.format_lines();
        assert_eq!(lines[0], "Gateway: 192.168.1.1");
        assert_eq!(lines[1], "Gateway reachable: NO");
        assert_eq!(lines[2], "DNS servers: (none)");
        assert_eq!(lines[3], "Primary DNS server reachable: n/a");
    }
}
