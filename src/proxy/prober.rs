//! Protocol detection for candidate endpoints
//!
//! An endpoint is routed through as a forward proxy once per candidate
//! scheme. A scheme counts as working only when every reachability target
//! answers `200 OK` through it; the first failure disqualifies the scheme.

use crate::proxy::models::{Endpoint, ProbeReport, ProxyUrl, Scheme};
use crate::Result;
use anyhow::anyhow;
use reqwest::{Client, Proxy as ReqwestProxy, StatusCode};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default per-request timeout in seconds
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 180;

/// Default reachability targets
pub const DEFAULT_PROBE_TARGETS: [&str; 3] = [
    "https://aws.amazon.com",
    "https://cloud.google.com",
    "https://azure.microsoft.com",
];

/// A client routed through one proxy URL
pub trait ProxiedClient: Send + Sync {
    /// GET `target` through the proxy and return the response status
    fn get_status(&self, target: &str) -> impl Future<Output = Result<StatusCode>> + Send;
}

/// Builds clients that route through a given proxy
pub trait ProbeTransport: Send + Sync + 'static {
    type Client: ProxiedClient;

    fn connect(&self, proxy: &ProxyUrl) -> Result<Self::Client>;
}

/// Anything that can tell which schemes an endpoint speaks
pub trait Probe: Send + Sync + 'static {
    fn detect(&self, endpoint: &Endpoint) -> impl Future<Output = ProbeReport> + Send;
}

/// Configuration for the protocol prober
#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// Timeout for each request through the proxy
    pub timeout: Duration,
    /// URLs every working scheme must reach
    pub targets: Vec<String>,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            targets: DEFAULT_PROBE_TARGETS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl ProberConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        self.targets = targets;
        self
    }
}

/// reqwest-backed transport
///
/// Certificate verification is off: only the proxy's forwarding is under
/// test, not its TLS identity.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// reqwest client bound to one proxy
pub struct ReqwestProxiedClient {
    client: Client,
    timeout: Duration,
}

impl ProxiedClient for ReqwestProxiedClient {
    async fn get_status(&self, target: &str) -> Result<StatusCode> {
        let response = tokio::time::timeout(self.timeout, self.client.get(target).send())
            .await
            .map_err(|_| anyhow!("timed out after {:?}", self.timeout))??;
        Ok(response.status())
    }
}

impl ProbeTransport for ReqwestTransport {
    type Client = ReqwestProxiedClient;

    fn connect(&self, proxy: &ProxyUrl) -> Result<ReqwestProxiedClient> {
        let client = Client::builder()
            .proxy(ReqwestProxy::all(proxy.url())?)
            .danger_accept_invalid_certs(true)
            .timeout(self.timeout)
            .build()?;

        Ok(ReqwestProxiedClient {
            client,
            timeout: self.timeout,
        })
    }
}

/// Detects the working schemes of an endpoint
pub struct ProtocolProber<T: ProbeTransport> {
    transport: Arc<T>,
    targets: Arc<[String]>,
}

impl ProtocolProber<ReqwestTransport> {
    /// Create a prober that issues real requests
    pub fn with_config(config: ProberConfig) -> Self {
        Self::with_transport(ReqwestTransport::new(config.timeout), config.targets)
    }
}

impl<T: ProbeTransport> ProtocolProber<T> {
    pub fn with_transport(transport: T, targets: Vec<String>) -> Self {
        Self {
            transport: Arc::new(transport),
            targets: targets.into(),
        }
    }

    /// Check one scheme; any error along the way means the scheme fails
    pub async fn check_scheme(&self, proxy: &ProxyUrl) -> bool {
        let client = match self.transport.connect(proxy) {
            Ok(client) => client,
            Err(e) => {
                debug!(proxy = %proxy, error = %e, "could not build proxied client");
                return false;
            }
        };

        for target in self.targets.iter() {
            match client.get_status(target).await {
                Ok(StatusCode::OK) => {}
                Ok(status) => {
                    debug!(proxy = %proxy, target = %target, %status, "unexpected status");
                    return false;
                }
                Err(e) => {
                    debug!(proxy = %proxy, target = %target, error = %e, "request failed");
                    return false;
                }
            }
        }

        true
    }

    /// Probe every candidate scheme in order and collect those that pass
    pub async fn detect_schemes(&self, endpoint: &Endpoint) -> Vec<Scheme> {
        let mut working = Vec::new();
        for scheme in Scheme::ALL {
            if self.check_scheme(&endpoint.qualify(scheme)).await {
                working.push(scheme);
            }
        }
        working
    }
}

impl<T: ProbeTransport> Probe for ProtocolProber<T> {
    async fn detect(&self, endpoint: &Endpoint) -> ProbeReport {
        ProbeReport::new(endpoint.clone(), self.detect_schemes(endpoint).await)
    }
}

impl<T: ProbeTransport> Clone for ProtocolProber<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            targets: Arc::clone(&self.targets),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// What a stub proxy does for a given target
    #[derive(Clone, Copy)]
    enum Reply {
        Status(u16),
        Timeout,
    }

    /// Scripted transport keyed by scheme; records every request made
    #[derive(Default)]
    struct StubTransport {
        replies: HashMap<Scheme, Vec<Reply>>,
        refuse: Vec<Scheme>,
        calls: Arc<Mutex<Vec<(Scheme, String)>>>,
    }

    impl StubTransport {
        fn reply(mut self, scheme: Scheme, replies: Vec<Reply>) -> Self {
            self.replies.insert(scheme, replies);
            self
        }
    }

    struct StubClient {
        scheme: Scheme,
        replies: Vec<Reply>,
        targets: Vec<String>,
        calls: Arc<Mutex<Vec<(Scheme, String)>>>,
    }

    impl ProxiedClient for StubClient {
        async fn get_status(&self, target: &str) -> Result<StatusCode> {
            self.calls
                .lock()
                .unwrap()
                .push((self.scheme, target.to_string()));
            let index = self.targets.iter().position(|t| t == target).unwrap();
            match self.replies.get(index).copied().unwrap_or(Reply::Timeout) {
                Reply::Status(code) => Ok(StatusCode::from_u16(code).unwrap()),
                Reply::Timeout => Err(anyhow!("timed out")),
            }
        }
    }

    impl ProbeTransport for StubTransport {
        type Client = StubClient;

        fn connect(&self, proxy: &ProxyUrl) -> Result<StubClient> {
            if self.refuse.contains(&proxy.scheme) {
                return Err(anyhow!("unsupported proxy scheme"));
            }
            Ok(StubClient {
                scheme: proxy.scheme,
                replies: self.replies.get(&proxy.scheme).cloned().unwrap_or_default(),
                targets: targets(),
                calls: Arc::clone(&self.calls),
            })
        }
    }

    fn targets() -> Vec<String> {
        DEFAULT_PROBE_TARGETS.iter().map(|t| t.to_string()).collect()
    }

    fn all_ok() -> Vec<Reply> {
        vec![Reply::Status(200); 3]
    }

    #[test]
    fn test_prober_config_default() {
        let config = ProberConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(180));
        assert_eq!(config.targets.len(), 3);
        assert!(config.targets.iter().all(|t| t.starts_with("https://")));
    }

    #[test]
    fn test_prober_config_builder() {
        let config = ProberConfig::new()
            .with_timeout(Duration::from_secs(5))
            .with_targets(vec!["https://example.org".to_string()]);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.targets, vec!["https://example.org"]);
    }

    #[tokio::test]
    async fn test_http_only_when_socks5_times_out() {
        let transport = StubTransport::default()
            .reply(Scheme::Http, all_ok())
            .reply(Scheme::Socks5, vec![Reply::Timeout; 3]);
        let prober = ProtocolProber::with_transport(transport, targets());

        let report = prober.detect(&Endpoint::new("1.2.3.4:8080")).await;
        assert_eq!(report.schemes, vec![Scheme::Http]);
    }

    #[tokio::test]
    async fn test_one_failing_target_fails_every_scheme() {
        let partial = vec![Reply::Status(200), Reply::Status(200), Reply::Status(503)];
        let mut transport = StubTransport::default();
        for scheme in Scheme::ALL {
            transport = transport.reply(scheme, partial.clone());
        }
        let prober = ProtocolProber::with_transport(transport, targets());

        let report = prober.detect(&Endpoint::new("1.2.3.4:8080")).await;
        assert!(report.schemes.is_empty());
        assert!(!report.is_working());
    }

    #[tokio::test]
    async fn test_multi_protocol_keeps_probe_order() {
        let transport = StubTransport::default()
            .reply(Scheme::Socks5, all_ok())
            .reply(Scheme::Https, all_ok())
            .reply(Scheme::Socks4, all_ok());
        let prober = ProtocolProber::with_transport(transport, targets());

        let schemes = prober.detect_schemes(&Endpoint::new("1.2.3.4:1080")).await;
        assert_eq!(schemes, vec![Scheme::Https, Scheme::Socks4, Scheme::Socks5]);
    }

    #[tokio::test]
    async fn test_first_failure_stops_remaining_targets() {
        let transport = StubTransport::default().reply(
            Scheme::Http,
            vec![Reply::Status(403), Reply::Status(200), Reply::Status(200)],
        );
        let calls = Arc::clone(&transport.calls);
        let prober = ProtocolProber::with_transport(transport, targets());

        let ok = prober
            .check_scheme(&Endpoint::new("1.2.3.4:8080").qualify(Scheme::Http))
            .await;
        assert!(!ok);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (Scheme::Http, "https://aws.amazon.com".to_string()));
    }

    #[tokio::test]
    async fn test_client_build_error_fails_scheme_only() {
        let mut transport = StubTransport::default()
            .reply(Scheme::Http, all_ok())
            .reply(Scheme::Socks4, all_ok());
        transport.refuse.push(Scheme::Socks4);
        let prober = ProtocolProber::with_transport(transport, targets());

        let schemes = prober.detect_schemes(&Endpoint::new("1.2.3.4:8080")).await;
        assert_eq!(schemes, vec![Scheme::Http]);
    }

    #[tokio::test]
    async fn test_non_200_success_status_rejected() {
        let transport = StubTransport::default().reply(
            Scheme::Http,
            vec![Reply::Status(200), Reply::Status(204), Reply::Status(200)],
        );
        let prober = ProtocolProber::with_transport(transport, targets());

        let schemes = prober.detect_schemes(&Endpoint::new("1.2.3.4:8080")).await;
        assert!(schemes.is_empty());
    }

    #[test]
    fn test_reqwest_transport_builds_every_scheme() {
        let transport = ReqwestTransport::new(Duration::from_secs(1));
        let endpoint = Endpoint::new("127.0.0.1:9");
        for scheme in Scheme::ALL {
            assert!(transport.connect(&endpoint.qualify(scheme)).is_ok(), "{scheme}");
        }
    }
}
