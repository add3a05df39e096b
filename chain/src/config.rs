//! Top-level configuration for a chain node.
//!
//! This module aggregates configuration for:
//!
//! - consensus parameters (`ConsensusConfig`),
//! - forging (`ForgingConfig`: encrypted delegate secrets),
//! - storage (RocksDB path and creation flags),
//! - metrics exporter (enable flag + listen address).
//!
//! The goal is to have a single `ChainConfig` struct that higher-level
//! binaries (e.g. `main.rs`) can construct from defaults, config files,
//! or environment variables as needed.

use std::net::SocketAddr;

use crate::consensus::ConsensusConfig;
use crate::forging::ForgingConfig;
use crate::storage::RocksDbConfig;

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        // Safe to unwrap: this is a fixed, valid address literal.
        let addr: SocketAddr = "127.0.0.1:9898"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
        }
    }
}

/// Top-level configuration for a chain node.
///
/// This aggregates all the sub-configs needed to wire up a typical node:
///
/// - consensus constants (`consensus`),
/// - forging secrets (`forging`),
/// - persistent storage (`storage`),
/// - Prometheus metrics exporter (`metrics`).
#[derive(Clone, Debug, Default)]
pub struct ChainConfig {
    pub consensus: ConsensusConfig,
    pub forging: ForgingConfig,
    pub storage: RocksDbConfig,
    pub metrics: MetricsConfig,
}
