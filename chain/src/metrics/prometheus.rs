//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and a set of strongly-typed node metrics. The registry can
//! serve itself over HTTP: [`MetricsRegistry::serve`] runs a small
//! `hyper` server for `GET /metrics` that participates in the node's
//! shutdown sequence through a `watch` channel, draining in-flight
//! connections before it exits.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::watch;

use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Pipeline-related Prometheus metrics.
///
/// These are registered into a [`Registry`] and updated from the node
/// shell around `process_block` calls and fork notifications.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Latency of a full `process_block` invocation, in seconds.
    pub block_processing_seconds: Histogram,
    /// Number of blocks accepted by the pipeline.
    pub blocks_accepted: IntCounter,
    /// Number of blocks rejected at any pipeline stage.
    pub blocks_rejected: IntCounter,
    /// Fork notifications by cause code (`1`, `2` or `3`).
    pub forks_observed: IntCounterVec,
    /// Number of forging keypairs loaded at startup.
    pub forging_keypairs: IntGauge,
}

impl NodeMetrics {
    /// Registers node metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let block_processing_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "consensus_block_processing_seconds",
                "Time to take a block through the full processing pipeline in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )?;
        registry.register(Box::new(block_processing_seconds.clone()))?;

        let blocks_accepted = IntCounter::with_opts(Opts::new(
            "consensus_blocks_accepted",
            "Total number of blocks accepted by the processing pipeline",
        ))?;
        registry.register(Box::new(blocks_accepted.clone()))?;

        let blocks_rejected = IntCounter::with_opts(Opts::new(
            "consensus_blocks_rejected",
            "Total number of blocks rejected by the processing pipeline",
        ))?;
        registry.register(Box::new(blocks_rejected.clone()))?;

        let forks_observed = IntCounterVec::new(
            Opts::new(
                "consensus_forks_observed",
                "Fork notifications reported to the delegates module, by cause",
            ),
            &["cause"],
        )?;
        registry.register(Box::new(forks_observed.clone()))?;

        let forging_keypairs = IntGauge::with_opts(Opts::new(
            "forging_keypairs_loaded",
            "Number of delegate keypairs available for forging",
        ))?;
        registry.register(Box::new(forging_keypairs.clone()))?;

        Ok(Self {
            block_processing_seconds,
            blocks_accepted,
            blocks_rejected,
            forks_observed,
            forging_keypairs,
        })
    }
}

/// Wrapper around a Prometheus registry and the node metrics.
///
/// This is the main handle you pass around in the node. It can be
/// wrapped in an [`Arc`] and shared across threads/tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub node: NodeMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying
    /// `Registry` and registers the node metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("chain".to_string()), None)?;
        let node = NodeMetrics::register(&registry)?;
        Ok(Self { registry, node })
    }

    /// Encodes all metrics in this registry into the Prometheus text
    /// format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!(error = %e, "failed to encode Prometheus metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Serves `GET /metrics` on `addr` until `shutdown` observes a
    /// change (or its sender is dropped).
    ///
    /// New connections stop being accepted as soon as the shutdown
    /// signal fires; connections already serving a scrape are drained
    /// through hyper's graceful shutdown rather than cut off.
    pub async fn serve(
        self: Arc<Self>,
        addr: SocketAddr,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "metrics exporter listening");

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = shutdown.changed() => break,
            };

            let registry = self.clone();
            let mut conn_shutdown = shutdown.clone();
            tokio::spawn(async move {
                let svc = service_fn(move |req: Request<Incoming>| {
                    let registry = registry.clone();
                    async move { Ok::<_, Infallible>(registry.route(&req)) }
                });

                let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), svc);
                tokio::pin!(conn);

                tokio::select! {
                    served = conn.as_mut() => {
                        if let Err(err) = served {
                            tracing::debug!(%peer, error = %err, "metrics connection error");
                        }
                    }
                    _ = conn_shutdown.changed() => {
                        conn.as_mut().graceful_shutdown();
                        let _ = conn.as_mut().await;
                    }
                }
            });
        }

        tracing::info!("metrics exporter stopped");
        Ok(())
    }

    /// Routes one scrape request. Only `GET /metrics` exists; anything
    /// else is a client error, logged at debug for scrape diagnostics.
    fn route<B>(&self, req: &Request<B>) -> Response<Full<Bytes>> {
        let method = req.method();
        let path = req.uri().path();

        let response = if path != "/metrics" {
            text_response(StatusCode::NOT_FOUND, "not found".to_string())
        } else if method != Method::GET {
            text_response(StatusCode::METHOD_NOT_ALLOWED, "metrics are read-only".to_string())
        } else {
            text_response(StatusCode::OK, self.gather_text())
        };

        tracing::debug!(
            %method,
            path,
            status = response.status().as_u16(),
            "metrics request"
        );
        response
    }
}

/// Plain-text response in the Prometheus exposition content type.
fn text_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    response
}
