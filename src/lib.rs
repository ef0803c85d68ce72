//! Proxy Registry - Proxy List Aggregator and Validator
//!
//! Scrapes public proxy lists, works out which protocols each candidate
//! actually proxies, and keeps a known-good list plus a history of every
//! proxy that has ever passed.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod proxy;
pub mod storage;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use pipeline::{Registry, RunSummary};
pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
