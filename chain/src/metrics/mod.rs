//! Metrics and instrumentation for the chain.
//!
//! This module defines Prometheus-compatible metrics for the block
//! processing pipeline. The [`prometheus::MetricsRegistry`] serves its
//! own `/metrics` endpoint and winds down with the rest of the node via
//! a `watch`-channel shutdown signal.
//!
//! Typical usage in a node:
//!
//! ```ignore
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use dpos_chain::metrics::MetricsRegistry;
//! use tokio::sync::watch;
//!
//! let registry = Arc::new(MetricsRegistry::new()?);
//! let addr: SocketAddr = "127.0.0.1:9898".parse()?;
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//! // Spawn the HTTP exporter in the background:
//! tokio::spawn(registry.clone().serve(addr, shutdown_rx));
//!
//! // Elsewhere in the code:
//! registry.node.block_processing_seconds.observe(duration_secs);
//!
//! // On shutdown, alongside the cleaning flag:
//! let _ = shutdown_tx.send(true);
//! ```

pub mod prometheus;

pub use prometheus::{MetricsRegistry, NodeMetrics};
