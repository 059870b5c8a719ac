//! Device/context fingerprinting for new sessions.
//!
//! Best-effort parsing of the client-supplied user agent. Every field is
//! display-only: user agents are untrusted and must never feed an
//! authorization decision.

use serde::Serialize;
use std::net::{IpAddr, SocketAddr};

/// Marker for anything that could not be derived.
pub const UNKNOWN: &str = "Unknown";

/// Raw request metadata captured by the HTTP layer at login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub user_agent: Option<String>,
    pub remote_addr: Option<String>,
}

impl RequestContext {
    pub fn new(user_agent: Option<String>, remote_addr: Option<String>) -> Self {
        Self {
            user_agent,
            remote_addr,
        }
    }

    /// End-user address, from a bare IP or a socket address.
    pub fn client_ip(&self) -> Option<IpAddr> {
        let raw = self.remote_addr.as_deref().map(str::trim)?;
        raw.parse::<IpAddr>()
            .ok()
            .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
    }
}

/// Descriptive metadata stored on a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fingerprint {
    pub device_name: String,
    pub browser: String,
    pub os: String,
    pub ip_address: String,
}

impl Fingerprint {
    pub fn unknown() -> Self {
        Self {
            device_name: UNKNOWN.to_string(),
            browser: UNKNOWN.to_string(),
            os: UNKNOWN.to_string(),
            ip_address: UNKNOWN.to_string(),
        }
    }
}

/// Derive a fingerprint. Pure: the same context always yields the same result.
pub fn fingerprint(context: &RequestContext) -> Fingerprint {
    let user_agent = context
        .user_agent
        .as_deref()
        .map(str::trim)
        .filter(|ua| !ua.is_empty());

    let browser = user_agent.and_then(detect_browser);
    let os = user_agent.and_then(detect_os);
    let device_name = device_name(browser, os);

    Fingerprint {
        device_name,
        browser: browser.unwrap_or(UNKNOWN).to_string(),
        os: os.unwrap_or(UNKNOWN).to_string(),
        ip_address: normalize_ip(context),
    }
}

/// Order matters: Chromium derivatives also advertise Chrome and Safari.
fn detect_browser(ua: &str) -> Option<&'static str> {
    if ua.contains("Edg/") || ua.contains("Edge/") {
        return Some("Edge");
    }
    if ua.contains("OPR/") || ua.contains("Opera/") {
        return Some("Opera");
    }
    if ua.contains("Chrome/") || ua.contains("CriOS/") {
        return Some("Chrome");
    }
    if ua.contains("Firefox/") || ua.contains("FxiOS/") {
        return Some("Firefox");
    }
    if ua.contains("Safari/") {
        return Some("Safari");
    }
    if ua.contains("MSIE") || ua.contains("Trident/") {
        return Some("Internet Explorer");
    }
    None
}

/// iOS before macOS: iOS agents contain "like Mac OS X". Android before Linux.
fn detect_os(ua: &str) -> Option<&'static str> {
    if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod") {
        return Some("iOS");
    }
    if ua.contains("Windows") {
        return Some("Windows");
    }
    if ua.contains("Macintosh") || ua.contains("Mac OS X") {
        return Some("macOS");
    }
    if ua.contains("Android") {
        return Some("Android");
    }
    if ua.contains("CrOS") {
        return Some("Chrome OS");
    }
    if ua.contains("Linux") {
        return Some("Linux");
    }
    None
}

fn device_name(browser: Option<&str>, os: Option<&str>) -> String {
    match (browser, os) {
        (Some(b), Some(o)) => format!("{b} on {o}"),
        (Some(b), None) => b.to_string(),
        (None, Some(o)) => o.to_string(),
        (None, None) => UNKNOWN.to_string(),
    }
}

fn normalize_ip(context: &RequestContext) -> String {
    context
        .client_ip()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}
