//! Proxy module for collecting and validating proxies
//!
//! This module provides functionality for:
//! - Fetching remote proxy lists and normalizing them into bare endpoints
//! - Detecting which schemes (http, https, socks4, socks5) an endpoint proxies
//! - Structural validation of scheme-qualified proxy URLs
//! - Small list helpers shared with the storage layer

pub mod aggregator;
pub mod lists;
pub mod models;
pub mod parser;
pub mod prober;
pub mod validate;

pub use aggregator::{AggregatorConfig, ListAggregator, SourceReport};
pub use models::{Endpoint, ProbeReport, ProxyUrl, Scheme};
pub use parser::EndpointParser;
pub use prober::{Probe, ProbeTransport, ProberConfig, ProtocolProber, ProxiedClient, ReqwestTransport};
pub use validate::{is_ip_invalid, is_url_valid};
