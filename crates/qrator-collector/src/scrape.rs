//! Scrape orchestration — fan-out/fan-in over (domain, statistic kind).
//!
//! One external trigger runs one scrape: list the credential's online
//! domains, spawn one fetch task per domain and statistic kind, then wait for
//! all tasks raced against the first reported failure. On first failure the
//! remaining tasks are canceled through a watch channel and the scrape is
//! reported as down; counters recorded by tasks before cancellation are kept.
//!
//! Scrapes are serialized process-wide: overlapping triggers queue on an
//! async mutex rather than running concurrently.

use prometheus::{Registry, proto::MetricFamily};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, warn};

use qrator_api::{ApiClient, ApiError, Domain, HttpStatistics, IpStatistics};

use crate::metrics::ExporterMetrics;

/// Why a scrape ended aborted.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("domain list fetch failed: {0}")]
    DomainList(ApiError),

    #[error("statistics fetch failed for domain '{domain}' method '{method}': {source}")]
    Statistics {
        domain: String,
        method: &'static str,
        source: ApiError,
    },
}

/// The two statistics kinds fetched per domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatKind {
    Http,
    Ip,
}

impl StatKind {
    fn method(self) -> &'static str {
        match self {
            StatKind::Http => qrator_api::METHOD_HTTP_STATISTICS,
            StatKind::Ip => qrator_api::METHOD_IP_STATISTICS,
        }
    }
}

/// The scrape engine: owns the metric registry and runs one full collection
/// cycle per trigger.
pub struct Collector {
    api: ApiClient,
    metrics: ExporterMetrics,
    registry: Registry,
    scrape_lock: Mutex<()>,
}

impl Collector {
    /// Create the collector and register the full metric schema.
    pub fn new(api: ApiClient) -> prometheus::Result<Self> {
        let registry = Registry::new();
        let metrics = ExporterMetrics::new(&registry)?;
        Ok(Self {
            api,
            metrics,
            registry,
            scrape_lock: Mutex::new(()),
        })
    }

    /// Run one full scrape cycle.
    ///
    /// Never fails from the trigger's point of view: failures are reflected
    /// in the meta-counters and the `up` gauge, and the registry always
    /// yields a snapshot afterwards.
    pub async fn scrape(&self) {
        let _guard = self.scrape_lock.lock().await;
        self.scrape_locked().await;
    }

    /// Run one scrape cycle and snapshot the registry while still holding
    /// the scrape lock.
    ///
    /// The exposition path must use this: gathering outside the lock could
    /// interleave with a queued trigger's gauge reset and yield a snapshot
    /// that reports `up 1` with its per-domain values already cleared.
    pub async fn scrape_and_gather(&self) -> Vec<MetricFamily> {
        let _guard = self.scrape_lock.lock().await;
        self.scrape_locked().await;
        self.registry.gather()
    }

    /// Current snapshot of every registered metric family, without scraping.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// The instrument handles, mainly for assertions in tests.
    pub fn metrics(&self) -> &ExporterMetrics {
        &self.metrics
    }

    async fn scrape_locked(&self) {
        self.metrics.total_scrapes.inc();

        match self.run_scrape().await {
            Ok(()) => {
                self.metrics.up.set(1.0);
            }
            Err(e) => {
                self.metrics.failed_scrapes.inc();
                self.metrics.up.set(0.0);
                warn!(error = %e, "scrape aborted");
            }
        }
    }

    async fn run_scrape(&self) -> Result<(), ScrapeError> {
        // The previous scrape's per-domain values never outlive it: an
        // aborted listing exposes meta-counters only, and departed domains
        // drop out of the exposition.
        self.metrics.reset_domain_gauges();

        let domains = match self.api.online_domains().await {
            Ok(domains) => domains,
            Err(e) => {
                self.metrics.failed_domain_scrapes.inc();
                return Err(ScrapeError::DomainList(e));
            }
        };

        debug!(domains = domains.len(), "fanning out statistics fetches");

        self.fan_out(domains).await
    }

    /// Spawn one task per (domain, kind) and wait for completion-or-first-
    /// failure. On failure, cancel the siblings and return the error.
    async fn fan_out(&self, domains: Vec<Domain>) -> Result<(), ScrapeError> {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (err_tx, mut err_rx) = mpsc::unbounded_channel();
        let mut handles = Vec::with_capacity(domains.len() * 2);

        for domain in domains {
            for kind in [StatKind::Http, StatKind::Ip] {
                let api = self.api.clone();
                let metrics = self.metrics.clone();
                let domain = domain.clone();
                let err_tx = err_tx.clone();
                let mut cancel = cancel_rx.clone();

                handles.push(tokio::spawn(async move {
                    tokio::select! {
                        res = fetch_statistics(&api, &metrics, &domain, kind) => {
                            if let Err(e) = res {
                                let _ = err_tx.send(e);
                            }
                        }
                        _ = cancel.changed() => {
                            debug!(domain = %domain.name, method = kind.method(), "fetch canceled");
                        }
                    }
                }));
            }
        }
        drop(err_tx);

        let join_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        tokio::pin!(join_all);

        tokio::select! {
            _ = &mut join_all => {}
            Some(err) = err_rx.recv() => {
                let _ = cancel_tx.send(true);
                return Err(err);
            }
        }

        // All tasks finished; pick up an error that lost the race to the join.
        match err_rx.try_recv() {
            Ok(err) => Err(err),
            Err(_) => Ok(()),
        }
    }
}

/// Fetch and publish one statistic kind for one domain.
///
/// Nothing is written into the gauges unless the full payload decoded;
/// failure counters are recorded even when the enclosing scrape later aborts.
async fn fetch_statistics(
    api: &ApiClient,
    metrics: &ExporterMetrics,
    domain: &Domain,
    kind: StatKind,
) -> Result<(), ScrapeError> {
    let method = kind.method();

    let result = match kind {
        StatKind::Http => api
            .http_statistics(domain.id)
            .await
            .map(|stats| write_http_statistics(metrics, &domain.name, &stats)),
        StatKind::Ip => api
            .ip_statistics(domain.id)
            .await
            .map(|stats| write_ip_statistics(metrics, &domain.name, &stats)),
    };

    result.map_err(|e| {
        metrics.record_fetch_failure(&domain.name, method, e.is_decode());
        ScrapeError::Statistics {
            domain: domain.name.clone(),
            method,
            source: e,
        }
    })
}

fn write_http_statistics(metrics: &ExporterMetrics, domain: &str, stats: &HttpStatistics) {
    let method = qrator_api::METHOD_HTTP_STATISTICS;

    metrics
        .http_requests
        .with_label_values(&[domain, method])
        .set(stats.requests);

    for (duration, rate) in stats.responses.buckets() {
        metrics
            .http_responses
            .with_label_values(&[domain, duration, method])
            .set(rate);
    }

    for (code, rate) in stats.errors.rates() {
        metrics
            .http_errors
            .with_label_values(&[domain, code, method])
            .set(rate);
    }
}

fn write_ip_statistics(metrics: &ExporterMetrics, domain: &str, stats: &IpStatistics) {
    let method = qrator_api::METHOD_IP_STATISTICS;

    for (state, rate) in stats.bandwidth.directions() {
        metrics
            .bandwidth_traffic
            .with_label_values(&[domain, state, method])
            .set(rate);
    }

    for (state, rate) in stats.packets.directions() {
        metrics
            .packets
            .with_label_values(&[domain, state, method])
            .set(rate);
    }

    for (service, size) in stats.blacklist.services() {
        metrics
            .blacklist
            .with_label_values(&[domain, service, method])
            .set(size);
    }
}
