//! Run configuration: where the lists live, where proxies come from, and how
//! they are probed. Every field has a default, so a TOML file only needs the
//! keys it changes.

use crate::error::RegistryError;
use crate::proxy::aggregator::{
    AggregatorConfig, DEFAULT_FETCH_CONCURRENCY, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use crate::proxy::prober::{ProberConfig, DEFAULT_PROBE_TARGETS, DEFAULT_PROBE_TIMEOUT_SECS};
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of endpoints probed at once
pub const DEFAULT_CONCURRENCY: usize = 256;

/// Public proxy lists scraped on every update
pub const DEFAULT_SOURCES: &[&str] = &[
    "https://raw.githubusercontent.com/ALIILAPRO/Proxy/main/socks5.txt",
    "https://raw.githubusercontent.com/almroot/proxylist/master/list.txt",
    "https://raw.githubusercontent.com/clarketm/proxy-list/master/proxy-list-raw.txt",
    "https://raw.githubusercontent.com/complexorganizations/proxy-registry/main/assets/history",
    "https://raw.githubusercontent.com/drakelam/Free-Proxy-List/main/proxy_all.txt",
    "https://raw.githubusercontent.com/ErcinDedeoglu/proxies/main/proxies/http.txt",
    "https://raw.githubusercontent.com/ErcinDedeoglu/proxies/main/proxies/https.txt",
    "https://raw.githubusercontent.com/ErcinDedeoglu/proxies/main/proxies/socks4.txt",
    "https://raw.githubusercontent.com/ErcinDedeoglu/proxies/main/proxies/socks5.txt",
    "https://raw.githubusercontent.com/hendrikbgr/Free-Proxy-Repo/master/proxy_list.txt",
    "https://raw.githubusercontent.com/hookzof/socks5_list/master/proxy.txt",
    "https://raw.githubusercontent.com/jetkai/proxy-list/main/archive/txt/proxies.txt",
    "https://raw.githubusercontent.com/jetkai/proxy-list/main/archive/txt/proxies-http.txt",
    "https://raw.githubusercontent.com/jetkai/proxy-list/main/archive/txt/proxies-https.txt",
    "https://raw.githubusercontent.com/jetkai/proxy-list/main/archive/txt/proxies-socks4.txt",
    "https://raw.githubusercontent.com/jetkai/proxy-list/main/archive/txt/proxies-socks5.txt",
    "https://raw.githubusercontent.com/jetkai/proxy-list/main/online-proxies/txt/proxies.txt",
    "https://raw.githubusercontent.com/jetkai/proxy-list/main/online-proxies/txt/proxies-http.txt",
    "https://raw.githubusercontent.com/jetkai/proxy-list/main/online-proxies/txt/proxies-https.txt",
    "https://raw.githubusercontent.com/jetkai/proxy-list/main/online-proxies/txt/proxies-socks4.txt",
    "https://raw.githubusercontent.com/jetkai/proxy-list/main/online-proxies/txt/proxies-socks5.txt",
    "https://raw.githubusercontent.com/KUTlime/ProxyList/main/ProxyList.txt",
    "https://raw.githubusercontent.com/mmpx12/proxy-list/master/http.txt",
    "https://raw.githubusercontent.com/mmpx12/proxy-list/master/https.txt",
    "https://raw.githubusercontent.com/mmpx12/proxy-list/master/socks4.txt",
    "https://raw.githubusercontent.com/mmpx12/proxy-list/master/socks5.txt",
    "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/http.txt",
    "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/socks4.txt",
    "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/socks5.txt",
    "https://raw.githubusercontent.com/MuRongPIG/Proxy-Master/main/http.txt",
    "https://raw.githubusercontent.com/MuRongPIG/Proxy-Master/main/socks4.txt",
    "https://raw.githubusercontent.com/MuRongPIG/Proxy-Master/main/socks5.txt",
    "https://raw.githubusercontent.com/prxchk/proxy-list/main/all.txt",
    "https://raw.githubusercontent.com/roosterkid/openproxylist/main/HTTPS_RAW.txt",
    "https://raw.githubusercontent.com/roosterkid/openproxylist/main/SOCKS4_RAW.txt",
    "https://raw.githubusercontent.com/roosterkid/openproxylist/main/SOCKS5_RAW.txt",
    "https://raw.githubusercontent.com/ShiftyTR/Proxy-List/master/http.txt",
    "https://raw.githubusercontent.com/ShiftyTR/Proxy-List/master/https.txt",
    "https://raw.githubusercontent.com/ShiftyTR/Proxy-List/master/socks4.txt",
    "https://raw.githubusercontent.com/ShiftyTR/Proxy-List/master/socks5.txt",
    "https://raw.githubusercontent.com/sunny9577/proxy-scraper/master/proxies.txt",
    "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/http.txt",
    "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/socks4.txt",
    "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/socks5.txt",
    "https://raw.githubusercontent.com/TundzhayDzhansaz/proxy-list-auto-pull-in-30min/main/proxies/http.txt",
    "https://raw.githubusercontent.com/Volodichev/proxy-list/main/http.txt",
    "https://www.proxy-list.download/api/v1/get?type=http",
    "https://www.proxy-list.download/api/v1/get?type=https",
    "https://raw.githubusercontent.com/ALIILAPRO/Proxy/main/socks4.txt",
];

/// Configuration for a registry run
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Directory holding the list files
    pub assets_dir: PathBuf,
    /// Remote lists to scrape
    pub sources: Vec<String>,
    /// URLs every working scheme must reach
    pub probe_targets: Vec<String>,
    /// Per-request timeout through a candidate proxy
    pub probe_timeout_secs: u64,
    /// Timeout for fetching a remote list
    pub fetch_timeout_secs: u64,
    /// Lists fetched at once
    pub fetch_concurrency: usize,
    pub user_agent: String,
    /// Endpoints probed at once; 0 probes every candidate at once
    pub concurrency: usize,
    /// Persist every working scheme instead of only the first
    pub persist_all_schemes: bool,
    /// Add `inclusion` entries to and remove `exclusion` entries from the candidates
    pub use_filter_lists: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            probe_targets: DEFAULT_PROBE_TARGETS.iter().map(|t| t.to_string()).collect(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            persist_all_schemes: false,
            use_filter_lists: false,
        }
    }
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file; keys that are absent keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let load = || -> anyhow::Result<Self> {
            let text = std::fs::read_to_string(path).context("failed to read file")?;
            toml::from_str(&text).context("failed to parse TOML")
        };
        load().map_err(|e| RegistryError::Config {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = dir.into();
        self
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_persist_all_schemes(mut self, all: bool) -> Self {
        self.persist_all_schemes = all;
        self
    }

    pub fn with_filter_lists(mut self, enabled: bool) -> Self {
        self.use_filter_lists = enabled;
        self
    }

    pub fn inclusion_path(&self) -> PathBuf {
        self.assets_dir.join("inclusion")
    }

    pub fn exclusion_path(&self) -> PathBuf {
        self.assets_dir.join("exclusion")
    }

    pub fn hosts_path(&self) -> PathBuf {
        self.assets_dir.join("hosts")
    }

    pub fn history_path(&self) -> PathBuf {
        self.assets_dir.join("history")
    }

    pub fn prober_config(&self) -> ProberConfig {
        ProberConfig::new()
            .with_timeout(Duration::from_secs(self.probe_timeout_secs))
            .with_targets(self.probe_targets.clone())
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig::new()
            .with_timeout(Duration::from_secs(self.fetch_timeout_secs))
            .with_concurrency(self.fetch_concurrency)
            .with_user_agent(self.user_agent.clone())
    }
}
