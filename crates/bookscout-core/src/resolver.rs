//! Port discovery for the local backend.
//!
//! The backend may have started on any of a handful of ports. Every
//! candidate is probed at once, but answers are consumed in list order, so
//! the first healthy candidate in priority order wins even when a
//! lower-priority port answers sooner.

use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesOrdered;

use crate::models::{CANDIDATE_PORTS, DEFAULT_HOST, Endpoint};
use crate::traits::Backend;

/// Configuration for endpoint discovery.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub host: String,

    /// Ports to try, highest priority first.
    pub candidates: Vec<u16>,

    /// Bound on each individual probe.
    pub probe_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            candidates: CANDIDATE_PORTS.to_vec(),
            probe_timeout: Duration::from_secs(1),
        }
    }
}

impl ResolverConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<u16>) -> Self {
        self.candidates = candidates;
        self
    }
}

pub struct EndpointResolver<B: Backend> {
    backend: B,
    config: ResolverConfig,
}

impl<B: Backend> EndpointResolver<B> {
    pub fn new(backend: B, config: ResolverConfig) -> Self {
        Self { backend, config }
    }

    /// First healthy candidate in priority order, or `None` if none answered.
    ///
    /// Does not touch shared state; the caller records the answer with
    /// [`crate::context::ClientContext::set_resolution`].
    pub async fn resolve(&self) -> Option<Endpoint> {
        let timeout = self.config.probe_timeout;
        let mut probes: FuturesOrdered<_> = self
            .config
            .candidates
            .iter()
            .map(|&port| {
                let endpoint = Endpoint::new(self.config.host.clone(), port);
                let backend = self.backend.clone();
                async move {
                    let base_url = endpoint.base_url();
                    let outcome =
                        tokio::time::timeout(timeout, backend.health(&base_url, timeout)).await;
                    let healthy = matches!(outcome, Ok(Ok(ref report)) if report.is_healthy());
                    (endpoint, healthy)
                }
            })
            .collect();

        while let Some((endpoint, healthy)) = probes.next().await {
            if healthy {
                tracing::info!(port = endpoint.port, host = %endpoint.host, "Backend found");
                return Some(endpoint);
            }
            tracing::debug!(port = endpoint.port, "No healthy backend on port");
        }

        tracing::warn!(
            candidates = ?self.config.candidates,
            "No healthy backend on any candidate port"
        );
        None
    }
}
