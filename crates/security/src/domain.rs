//! Domain allowlisting and SSRF-safe private-address rejection.
//!
//! Two checks feed the connector plane's domain validation: exact-match
//! host allowlisting (no wildcards, no subdomain matching — a connector
//! manifest declares exactly the hosts it talks to) and CIDR-precise
//! private/loopback/link-local address rejection for GenericREST
//! endpoint construction.

use ipnet::IpNet;
use std::net::IpAddr;
use std::str::FromStr;

/// Result of a domain/endpoint allowlist check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainCheckResult {
    Allowed,
    Denied { host: String, reason: String },
}

impl DomainCheckResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Extract the host portion of a URL (scheme and path/query stripped,
/// port dropped). Returns `None` if the URL has no recognizable host.
pub fn extract_host(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let host_and_rest = rest.split('/').next().unwrap_or(rest);
    let host = if let Some(stripped) = host_and_rest.strip_prefix('[') {
        // IPv6 literal: "[::1]:8080" -> "::1"
        stripped.split(']').next().unwrap_or(stripped).to_string()
    } else {
        host_and_rest.split(':').next().unwrap_or(host_and_rest).to_string()
    };
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

/// `is_domain_allowed(url, allowlist) ⇔ host(url) ∈ allowlist` — exact
/// match only, no wildcards or subdomain expansion.
pub fn is_domain_allowed(url: &str, allowlist: &[String]) -> bool {
    match extract_host(url) {
        Some(host) => allowlist.iter().any(|allowed| allowed.to_lowercase() == host),
        None => false,
    }
}

pub fn check_domain(url: &str, allowlist: &[String]) -> DomainCheckResult {
    match extract_host(url) {
        None => DomainCheckResult::Denied {
            host: url.into(),
            reason: "URL has no recognizable host".into(),
        },
        Some(host) => {
            if allowlist.iter().any(|allowed| allowed.to_lowercase() == host) {
                DomainCheckResult::Allowed
            } else {
                DomainCheckResult::Denied {
                    host,
                    reason: "host is not in the connector's allowlist".into(),
                }
            }
        }
    }
}

const PRIVATE_CIDRS: &[&str] = &[
    "127.0.0.0/8",
    "10.0.0.0/8",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "169.254.0.0/16",
    "::1/128",
    "fc00::/7",
    "fe80::/10",
];

/// True if `host` is a loopback, private, or link-local address, or the
/// literal string `"localhost"`. Used to reject GenericREST endpoints
/// that would let a configured connector reach internal infrastructure.
pub fn is_private_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    let Ok(ip) = IpAddr::from_str(host) else {
        return false;
    };
    PRIVATE_CIDRS.iter().any(|cidr| {
        IpNet::from_str(cidr)
            .map(|net| net.contains(&ip))
            .unwrap_or(false)
    })
}

/// True if the URL's host is private per [`is_private_host`]. Construction-time
/// check for GenericREST endpoint declarations (`https://127.0.0.1/api` must
/// be rejected).
pub fn is_private_url(url: &str) -> bool {
    match extract_host(url) {
        Some(host) => is_private_host(&host),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_host_without_port() {
        assert_eq!(extract_host("https://slack.com/api/chat"), Some("slack.com".into()));
        assert_eq!(extract_host("https://api.telegram.org:443/bot"), Some("api.telegram.org".into()));
    }

    #[test]
    fn exact_match_required_no_subdomains() {
        let allowlist = vec!["slack.com".to_string()];
        assert!(is_domain_allowed("https://slack.com/api/chat.postMessage", &allowlist));
        assert!(!is_domain_allowed("https://evil.slack.com/api", &allowlist));
        assert!(!is_domain_allowed("https://notslack.com/api", &allowlist));
    }

    #[test]
    fn check_domain_reports_host_on_denial() {
        let allowlist = vec!["slack.com".to_string()];
        let result = check_domain("https://evil.com/x", &allowlist);
        match result {
            DomainCheckResult::Denied { host, .. } => assert_eq!(host, "evil.com"),
            _ => panic!("expected denied"),
        }
    }

    #[test]
    fn loopback_is_private() {
        assert!(is_private_host("127.0.0.1"));
        assert!(is_private_host("localhost"));
        assert!(is_private_host("::1"));
    }

    #[test]
    fn rfc1918_ranges_are_private() {
        assert!(is_private_host("10.0.0.1"));
        assert!(is_private_host("192.168.1.1"));
        assert!(is_private_host("172.16.0.1"));
        assert!(is_private_host("172.31.255.255"));
    }

    #[test]
    fn adjacent_172_addresses_are_not_misclassified() {
        // 172.32.0.0/12 range ends at 172.31 — 172.32.x.x and 172.2.x.x
        // style string-prefix bugs must not cause false positives.
        assert!(!is_private_host("172.32.0.1"));
        assert!(!is_private_host("172.2.0.1"));
        assert!(is_private_host("172.20.0.1"));
    }

    #[test]
    fn link_local_and_metadata_address_are_private() {
        assert!(is_private_host("169.254.169.254"));
    }

    #[test]
    fn public_address_is_not_private() {
        assert!(!is_private_host("8.8.8.8"));
        assert!(!is_private_host("93.184.216.34"));
    }

    #[test]
    fn genericrest_localhost_endpoint_rejected() {
        assert!(is_private_url("https://127.0.0.1/api"));
    }
}
