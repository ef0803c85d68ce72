//! The update run: scrape every source, probe every candidate, and rewrite
//! the known-good and history lists.

use crate::config::RegistryConfig;
use crate::proxy::aggregator::ListAggregator;
use crate::proxy::lists;
use crate::proxy::models::{Endpoint, ProbeReport};
use crate::proxy::parser::EndpointParser;
use crate::proxy::prober::{Probe, ProtocolProber, ReqwestTransport};
use crate::proxy::validate::is_url_valid;
use crate::storage::{self, HistoryWriter};
use crate::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Totals for one run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources_ok: usize,
    pub sources_failed: usize,
    /// Unique endpoints handed to the prober
    pub candidates: usize,
    /// Proxy URLs written to the known-good list
    pub validated: usize,
}

/// Scrape-validate-persist pipeline over one configuration
pub struct Registry<P: Probe> {
    config: RegistryConfig,
    probe: P,
}

impl Registry<ProtocolProber<ReqwestTransport>> {
    /// Registry that probes through real network requests
    pub fn new(config: RegistryConfig) -> Self {
        let probe = ProtocolProber::with_config(config.prober_config());
        Self::with_probe(config, probe)
    }
}

impl<P: Probe> Registry<P> {
    pub fn with_probe(config: RegistryConfig, probe: P) -> Self {
        Self { config, probe }
    }

    /// Run the whole update
    pub async fn update(&self) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        async move {
            let started_at = Utc::now();
            info!(sources = self.config.sources.len(), "starting update");

            let aggregator = ListAggregator::with_config(self.config.aggregator_config())?;
            let reports = aggregator.fetch_all(&self.config.sources).await;
            let sources_ok = reports.iter().filter(|r| r.is_success()).count();
            let sources_failed = reports.len() - sources_ok;
            let lines = ListAggregator::union(&reports);
            info!(sources_ok, sources_failed, lines = lines.len(), "fetched proxy lists");

            let (candidates, validated) = self.process(lines).await?;

            let summary = RunSummary {
                run_id,
                started_at,
                finished_at: Utc::now(),
                sources_ok,
                sources_failed,
                candidates,
                validated,
            };
            info!(
                candidates = summary.candidates,
                validated = summary.validated,
                elapsed_secs = (summary.finished_at - summary.started_at).num_seconds(),
                "update finished"
            );
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    /// Normalize scraped lines, probe them and persist the results
    ///
    /// Returns the number of candidates probed and the number of lines in the
    /// known-good list afterwards.
    pub async fn process(&self, lines: Vec<String>) -> Result<(usize, usize)> {
        let endpoints = self.candidates(lines);
        let candidates = endpoints.len();

        let hosts = self.config.hosts_path();
        let history = self.config.history_path();
        if let Some(dir) = hosts.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(dir) {
                error!(dir = %dir.display(), error = %e, "failed to create assets directory");
            }
        }
        if let Err(e) = storage::remove_file(&hosts) {
            error!(error = %e, "failed to remove known-good list");
        }

        let working = self.validate_all(endpoints, history.clone()).await;

        // Written once, already compacted, after every probe has finished.
        let working = lists::sort(lists::remove_empty(lists::remove_duplicates(working)));
        let validated = match storage::write_lines(&hosts, &working) {
            Ok(()) => working.len(),
            Err(e) => {
                error!(error = %e, "failed to write known-good list");
                0
            }
        };
        match storage::compact(&history) {
            Ok(count) => debug!(entries = count, "compacted history"),
            Err(e) => error!(error = %e, "failed to compact history"),
        }

        Ok((candidates, validated))
    }

    /// Deduplicated bare endpoints, with the inclusion and exclusion lists
    /// applied when enabled
    fn candidates(&self, lines: Vec<String>) -> Vec<Endpoint> {
        if !self.config.use_filter_lists {
            return EndpointParser::normalize(lines);
        }

        let included = read_filter_list(&self.config.inclusion_path());
        let excluded: HashSet<String> = read_filter_list(&self.config.exclusion_path())
            .into_iter()
            .collect();
        debug!(
            included = included.len(),
            excluded = excluded.len(),
            "applying filter lists"
        );

        EndpointParser::normalize(lists::combine(lines, included))
            .into_iter()
            .filter(|endpoint| !excluded.contains(endpoint.as_str()))
            .collect()
    }

    /// Probe every endpoint through a bounded pool and return the proxy URLs
    /// that passed. History lines are appended as results arrive; the
    /// known-good lines are only returned once every probe has finished.
    async fn validate_all(&self, endpoints: Vec<Endpoint>, history: PathBuf) -> Vec<String> {
        let pool = match self.config.concurrency {
            0 => endpoints.len().max(1),
            n => n,
        };
        info!(candidates = endpoints.len(), pool, "probing candidates");

        let (writer, writer_task) = HistoryWriter::spawn(history);
        let all_schemes = self.config.persist_all_schemes;
        let probe = &self.probe;

        let working: Vec<String> = stream::iter(endpoints)
            .map(|endpoint| async move { probe.detect(&endpoint).await })
            .buffer_unordered(pool)
            .then(|report| {
                let writer = writer.clone();
                async move {
                    let accepted = accepted_urls(&report, all_schemes);
                    for url in &accepted {
                        writer.append(url.clone()).await;
                    }
                    accepted
                }
            })
            .flat_map(stream::iter)
            .collect()
            .await;

        drop(writer);
        match writer_task.await {
            Ok(appended) => debug!(appended, "history appends done"),
            Err(e) => warn!(error = %e, "history writer task failed"),
        }

        info!(working = working.len(), "probing finished");
        working
    }
}

/// Proxy URLs of a report that pass the structural check
fn accepted_urls(report: &ProbeReport, all_schemes: bool) -> Vec<String> {
    if !report.is_working() {
        return Vec::new();
    }
    report
        .proxy_urls(all_schemes)
        .into_iter()
        .map(|proxy| proxy.url())
        .filter(|url| {
            let valid = is_url_valid(url);
            if !valid {
                debug!(url = %url, "dropping structurally invalid proxy");
            }
            valid
        })
        .collect()
}

/// Entries of an inclusion or exclusion list; unreadable lists count as empty
fn read_filter_list(path: &Path) -> Vec<String> {
    EndpointParser::parse_file(path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to read filter list");
        Vec::new()
    })
}
