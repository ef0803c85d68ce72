//! Normalization of scraped list lines into bare endpoints

use crate::proxy::lists;
use crate::proxy::models::{Endpoint, Scheme};
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Dotted-quad endpoints buried in markup; octets are range-checked after matching
static EMBEDDED_ENDPOINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,3}(?:\.\d{1,3}){3}):(\d{1,5})\b").expect("endpoint pattern compiles")
});

/// Parser turning raw list text into endpoints
pub struct EndpointParser;

impl EndpointParser {
    /// Strip every known scheme prefix from the start of `line`
    ///
    /// Prefixes are tried in probe order, so `http://https://x` becomes `x`.
    pub fn strip_prefix(line: &str) -> &str {
        Scheme::ALL
            .iter()
            .fold(line, |rest, scheme| rest.strip_prefix(scheme.prefix()).unwrap_or(rest))
    }

    /// Normalize a single line
    ///
    /// Supports:
    /// - IP:PORT
    /// - scheme://IP:PORT
    /// - IP:PORT followed by whitespace-separated annotations
    pub fn parse_line(line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let token = line.split_whitespace().next()?;
        let bare = Self::strip_prefix(token).trim_end_matches('/');
        if bare.is_empty() || !Self::looks_like_endpoint(bare) {
            return None;
        }

        Some(bare.to_string())
    }

    /// `host:port` with a numeric port; the host itself is checked later
    fn looks_like_endpoint(candidate: &str) -> bool {
        match candidate.rsplit_once(':') {
            Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
            None => false,
        }
    }

    /// Normalize a whole body, falling back to regex extraction when no line
    /// has the shape of an endpoint (e.g. an HTML page)
    pub fn parse_string(content: &str) -> Vec<String> {
        let lines: Vec<String> = content.lines().filter_map(Self::parse_line).collect();
        if !lines.is_empty() {
            return lines;
        }
        Self::extract_with_regex(content)
    }

    /// Extract IPv4:PORT tokens from free-form text
    fn extract_with_regex(content: &str) -> Vec<String> {
        EMBEDDED_ENDPOINT
            .captures_iter(content)
            .filter_map(|cap| {
                let host = cap.get(1)?.as_str();
                let port: u16 = cap.get(2)?.as_str().parse().ok()?;
                if port == 0 || host.parse::<std::net::Ipv4Addr>().is_err() {
                    return None;
                }
                Some(format!("{}:{}", host, port))
            })
            .collect()
    }

    /// Turn already-split lines into the deduplicated endpoint set
    ///
    /// Blank lines are dropped, prefixes stripped, then duplicates removed
    /// keeping the first occurrence.
    pub fn normalize(lines: Vec<String>) -> Vec<Endpoint> {
        let stripped = lines
            .iter()
            .filter_map(|line| Self::parse_line(line))
            .collect();
        lists::remove_duplicates(lists::remove_empty(stripped))
            .into_iter()
            .map(Endpoint::new)
            .collect()
    }

    /// Read a list file into normalized endpoint strings; a missing file is empty
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        Ok(content.lines().filter_map(Self::parse_line).collect())
    }
}
