//! Fetching of remote proxy lists
//!
//! Every source is a plain-text URL. A source that fails to load contributes
//! nothing and never aborts the run.

use crate::proxy::lists;
use crate::proxy::parser::EndpointParser;
use crate::Result;
use anyhow::bail;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

pub const DEFAULT_USER_AGENT: &str = concat!("proxy-registry/", env!("CARGO_PKG_VERSION"));

/// Per-source outcome; a failed source carries no lines, only the reason
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: String,
    pub lines: Vec<String>,
    pub error: Option<String>,
}

impl SourceReport {
    pub fn success(source: String, lines: Vec<String>) -> Self {
        Self {
            source,
            lines,
            error: None,
        }
    }

    pub fn failure(source: String, error: String) -> Self {
        Self {
            source,
            lines: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// HTTP settings shared by every list request
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Whole-request timeout, body included
    pub timeout: Duration,
    /// Lists in flight at once; 0 is treated as 1
    pub concurrency: usize,
    pub user_agent: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            concurrency: DEFAULT_FETCH_CONCURRENCY,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl AggregatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// One shared client for every source of a run
pub struct ListAggregator {
    config: AggregatorConfig,
    client: Client,
}

impl ListAggregator {
    pub fn with_config(config: AggregatorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { config, client })
    }

    /// GET one list. Anything but `200 OK` is an error, even with a body.
    pub async fn fetch(&self, url: &str) -> Result<Vec<String>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            bail!("HTTP status: {}", status);
        }
        Ok(EndpointParser::parse_string(&body))
    }

    /// Reports come back in the order of `sources`, whatever order the
    /// requests finish in
    pub async fn fetch_all(&self, sources: &[String]) -> Vec<SourceReport> {
        stream::iter(sources)
            .map(|source| async move {
                match self.fetch(source).await {
                    Ok(lines) => {
                        debug!(source = %source, entries = lines.len(), "fetched list");
                        SourceReport::success(source.clone(), lines)
                    }
                    Err(e) => {
                        warn!(source = %source, error = %e, "failed to fetch list");
                        SourceReport::failure(source.clone(), e.to_string())
                    }
                }
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }

    /// Concatenated lines of every report; failed reports add nothing
    pub fn union(reports: &[SourceReport]) -> Vec<String> {
        reports
            .iter()
            .fold(Vec::new(), |acc, report| lists::combine(acc, report.lines.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single HTTP response on a local port and return its URL
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}/list.txt", addr)
    }

    #[tokio::test]
    async fn test_not_found_source_contributes_nothing() {
        let url = serve_once("404 Not Found", "1.1.1.1:80\n").await;
        let aggregator = ListAggregator::with_config(AggregatorConfig::new()).unwrap();

        let reports = aggregator.fetch_all(&[url]).await;
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].is_success());
        assert!(reports[0].error.as_deref().unwrap().contains("404"));
        assert!(ListAggregator::union(&reports).is_empty());
    }

    #[tokio::test]
    async fn test_ok_source_lines_are_normalized() {
        let url = serve_once("200 OK", "socks5://1.1.1.1:1080\n\n2.2.2.2:80 US-H\n").await;
        let aggregator = ListAggregator::with_config(AggregatorConfig::new()).unwrap();

        let reports = aggregator.fetch_all(&[url]).await;
        assert!(reports[0].is_success());
        assert_eq!(
            ListAggregator::union(&reports),
            vec!["1.1.1.1:1080", "2.2.2.2:80"]
        );
    }

    #[test]
    fn test_aggregator_config_default() {
        let config = AggregatorConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS));
        assert_eq!(config.concurrency, DEFAULT_FETCH_CONCURRENCY);
        assert!(config.user_agent.starts_with("proxy-registry/"));
    }

    #[test]
    fn test_aggregator_config_builder() {
        let config = AggregatorConfig::new()
            .with_timeout(Duration::from_secs(5))
            .with_concurrency(2)
            .with_user_agent("Custom Agent".to_string());
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.user_agent, "Custom Agent");
    }

    #[test]
    fn test_source_report() {
        let ok = SourceReport::success("a".to_string(), vec!["1.1.1.1:80".to_string()]);
        assert!(ok.is_success());
        assert_eq!(ok.lines.len(), 1);

        let failed = SourceReport::failure("b".to_string(), "HTTP status: 404".to_string());
        assert!(!failed.is_success());
        assert!(failed.lines.is_empty());
    }

    #[test]
    fn test_union_keeps_source_order() {
        let reports = vec![
            SourceReport::success("a".to_string(), vec!["1.1.1.1:80".to_string()]),
            SourceReport::failure("b".to_string(), "down".to_string()),
            SourceReport::success(
                "c".to_string(),
                vec!["2.2.2.2:80".to_string(), "1.1.1.1:80".to_string()],
            ),
        ];
        assert_eq!(
            ListAggregator::union(&reports),
            vec!["1.1.1.1:80", "2.2.2.2:80", "1.1.1.1:80"]
        );
    }

    #[tokio::test]
    async fn test_unreachable_source_contributes_nothing() {
        let aggregator = ListAggregator::with_config(
            AggregatorConfig::new().with_timeout(Duration::from_secs(2)),
        )
        .unwrap();
        let reports = aggregator
            .fetch_all(&["http://127.0.0.1:9/list.txt".to_string()])
            .await;
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].is_success());
        assert!(ListAggregator::union(&reports).is_empty());
    }
}
