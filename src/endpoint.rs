//! Chat endpoint validation.
//!
//! The chat request carries a bearer credential, so the configured endpoint
//! must:
//! - parse as an absolute `http`/`https` URL with a host
//! - use HTTPS unless the host is loopback (local mocks and proxies)

use std::net::Ipv6Addr;
use url::{Host, Url};

/// Reasons a configured chat endpoint is rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// URL is malformed or cannot be parsed
    InvalidUrl(String),
    /// Scheme is neither http nor https
    UnsupportedScheme(String),
    /// Plain HTTP to a non-loopback host
    InsecureRemote(String),
}

impl std::fmt::Display for EndpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            EndpointError::UnsupportedScheme(scheme) => {
                write!(f, "Unsupported scheme: {}", scheme)
            }
            EndpointError::InsecureRemote(host) => {
                write!(f, "HTTPS is required for remote host: {}", host)
            }
        }
    }
}

impl std::error::Error for EndpointError {}

fn is_loopback_ipv6(ip: &Ipv6Addr) -> bool {
    ip.is_loopback()
        || ip
            .to_ipv4_mapped()
            .map(|v4| v4.is_loopback())
            .unwrap_or(false)
}

/// Check if a URL host refers to the local machine
fn is_loopback_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(name) => {
            let lower = name.to_lowercase();
            lower == "localhost" || lower.ends_with(".localhost")
        }
        Host::Ipv4(ip) => ip.is_loopback(),
        Host::Ipv6(ip) => is_loopback_ipv6(ip),
    }
}

/// Validate the chat completions endpoint.
///
/// Does no DNS resolution; the check is purely syntactic so it can run at
/// startup without network access.
pub fn validate_endpoint(url_str: &str) -> Result<Url, EndpointError> {
    let url = Url::parse(url_str).map_err(|e| EndpointError::InvalidUrl(e.to_string()))?;

    let host = url
        .host()
        .ok_or_else(|| EndpointError::InvalidUrl("No host in URL".to_string()))?;

    match url.scheme() {
        "https" => {}
        "http" => {
            if !is_loopback_host(&host) {
                return Err(EndpointError::InsecureRemote(host.to_string()));
            }
        }
        other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
    }

    Ok(url)
}
