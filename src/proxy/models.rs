//! Proxy data models

use std::fmt;

/// Proxy scheme a candidate endpoint is probed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scheme {
    Http,
    Https,
    Socks4,
    Socks5,
}

impl Scheme {
    /// Every candidate scheme, in probe order
    pub const ALL: [Scheme; 4] = [Scheme::Http, Scheme::Https, Scheme::Socks4, Scheme::Socks5];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Socks4 => "socks4",
            Scheme::Socks5 => "socks5",
        }
    }

    /// The `scheme://` prefix used in proxy URLs
    pub fn prefix(&self) -> &'static str {
        match self {
            Scheme::Http => "http://",
            Scheme::Https => "https://",
            Scheme::Socks4 => "socks4://",
            Scheme::Socks5 => "socks5://",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bare `host:port` candidate with no scheme
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Attach a scheme to form a proxy URL
    pub fn qualify(&self, scheme: Scheme) -> ProxyUrl {
        ProxyUrl {
            scheme,
            endpoint: self.clone(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scheme-qualified endpoint, e.g. `socks5://1.2.3.4:1080`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyUrl {
    pub scheme: Scheme,
    pub endpoint: Endpoint,
}

impl ProxyUrl {
    pub fn url(&self) -> String {
        format!("{}{}", self.scheme.prefix(), self.endpoint)
    }
}

impl fmt::Display for ProxyUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.scheme.prefix(), self.endpoint)
    }
}

/// Outcome of probing one endpoint with every candidate scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub endpoint: Endpoint,
    /// Schemes that passed every reachability target, in probe order
    pub schemes: Vec<Scheme>,
}

impl ProbeReport {
    pub fn new(endpoint: Endpoint, schemes: Vec<Scheme>) -> Self {
        Self { endpoint, schemes }
    }

    pub fn is_working(&self) -> bool {
        !self.schemes.is_empty()
    }

    /// Proxy URLs for the working schemes; only the first unless `all` is set
    pub fn proxy_urls(&self, all: bool) -> Vec<ProxyUrl> {
        let take = if all { self.schemes.len() } else { 1 };
        self.schemes
            .iter()
            .take(take)
            .map(|scheme| self.endpoint.qualify(*scheme))
            .collect()
    }
}
