//! Static metric schema for the exporter.
//!
//! Every instrument is created once and registered in a collector-owned
//! `Registry` at startup, so the declared schema is a fixed table known at
//! initialization and `Registry::gather()` always enumerates the full set —
//! including the meta-counters of a scrape that aborted before producing any
//! per-domain values.

use prometheus::{Gauge, GaugeVec, IntCounter, IntCounterVec, Opts, Registry};

/// Metric namespace shared by every instrument.
pub const NAMESPACE: &str = "qrator";

/// All exporter instruments.
///
/// Gauges are last-write-wins and the per-domain vectors are reset at the
/// start of each scrape that obtains a fresh domain list; counters are
/// monotonic for the process lifetime.
#[derive(Clone)]
pub struct ExporterMetrics {
    /// Whether the last scrape completed without any failure.
    pub up: Gauge,
    /// Scrapes attempted, including aborted ones.
    pub total_scrapes: IntCounter,
    /// Scrapes that ended aborted.
    pub failed_scrapes: IntCounter,
    /// Scrapes aborted because the domain list could not be fetched.
    pub failed_domain_scrapes: IntCounter,
    /// Per (domain, api_method) statistics fetches that failed for any reason.
    pub failed_statistics_scrapes: IntCounterVec,
    /// Per (domain, api_method) fetches that failed specifically on decoding
    /// the result payload. Incremented in addition to
    /// `failed_statistics_scrapes`.
    pub failed_json_decode: IntCounterVec,

    /// HTTP request rate (rps).
    pub http_requests: GaugeVec,
    /// HTTP response rate by duration bucket (rps).
    pub http_responses: GaugeVec,
    /// HTTP error-response rate by status code (rps).
    pub http_errors: GaugeVec,
    /// Bandwidth by traffic direction (bps).
    pub bandwidth_traffic: GaugeVec,
    /// Packet rate by traffic direction (pps).
    pub packets: GaugeVec,
    /// IPs banned, by banning service.
    pub blacklist: GaugeVec,
}

impl ExporterMetrics {
    /// Create every instrument and register it with `registry`.
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let up = Gauge::with_opts(
            Opts::new("up", "Whether the last scrape of the Qrator API succeeded.")
                .namespace(NAMESPACE),
        )?;

        let total_scrapes = IntCounter::with_opts(
            Opts::new("exporter_total_scrapes", "Number of Qrator scrapes attempted.")
                .namespace(NAMESPACE),
        )?;

        let failed_scrapes = IntCounter::with_opts(
            Opts::new("exporter_failed_scrapes", "Number of Qrator scrapes that failed.")
                .namespace(NAMESPACE),
        )?;

        let failed_domain_scrapes = IntCounter::with_opts(
            Opts::new(
                "exporter_failed_domain_scrapes",
                "Number of failed domain-list fetches from the Qrator API.",
            )
            .namespace(NAMESPACE),
        )?;

        let failed_statistics_scrapes = IntCounterVec::new(
            Opts::new(
                "failed_statistics_scrapes",
                "Number of failed statistics fetches per domain and method.",
            )
            .namespace(NAMESPACE),
            &["domain", "api_method"],
        )?;

        let failed_json_decode = IntCounterVec::new(
            Opts::new(
                "failed_json_decode",
                "Number of statistics responses that could not be decoded.",
            )
            .namespace(NAMESPACE),
            &["domain", "api_method"],
        )?;

        let http_requests = GaugeVec::new(
            Opts::new("http_requests", "HTTP request rate (rps).").namespace(NAMESPACE),
            &["domain", "api_method"],
        )?;

        let http_responses = GaugeVec::new(
            Opts::new("http_responses", "HTTP response rate by duration bucket (rps).")
                .namespace(NAMESPACE),
            &["domain", "duration", "api_method"],
        )?;

        let http_errors = GaugeVec::new(
            Opts::new("http_errors", "HTTP error-response rate by status code (rps).")
                .namespace(NAMESPACE),
            &["domain", "http_code", "api_method"],
        )?;

        let bandwidth_traffic = GaugeVec::new(
            Opts::new("bandwidth_traffic", "Bandwidth by traffic direction (bps).")
                .namespace(NAMESPACE),
            &["domain", "state", "api_method"],
        )?;

        let packets = GaugeVec::new(
            Opts::new("packets", "Packet rate by traffic direction (pps).").namespace(NAMESPACE),
            &["domain", "state", "api_method"],
        )?;

        let blacklist = GaugeVec::new(
            Opts::new("blacklist", "Number of IPs banned, by banning service.")
                .namespace(NAMESPACE),
            &["domain", "service", "api_method"],
        )?;

        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(total_scrapes.clone()))?;
        registry.register(Box::new(failed_scrapes.clone()))?;
        registry.register(Box::new(failed_domain_scrapes.clone()))?;
        registry.register(Box::new(failed_statistics_scrapes.clone()))?;
        registry.register(Box::new(failed_json_decode.clone()))?;
        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(http_responses.clone()))?;
        registry.register(Box::new(http_errors.clone()))?;
        registry.register(Box::new(bandwidth_traffic.clone()))?;
        registry.register(Box::new(packets.clone()))?;
        registry.register(Box::new(blacklist.clone()))?;

        Ok(Self {
            up,
            total_scrapes,
            failed_scrapes,
            failed_domain_scrapes,
            failed_statistics_scrapes,
            failed_json_decode,
            http_requests,
            http_responses,
            http_errors,
            bandwidth_traffic,
            packets,
            blacklist,
        })
    }

    /// Drop all per-domain gauge children so domains that left the active
    /// set disappear from the exposition. Failure counters stay untouched.
    pub fn reset_domain_gauges(&self) {
        self.http_requests.reset();
        self.http_responses.reset();
        self.http_errors.reset();
        self.bandwidth_traffic.reset();
        self.packets.reset();
        self.blacklist.reset();
    }

    /// Record a failed statistics fetch for one (domain, method) pair.
    /// Decode failures additionally bump the dedicated decode counter.
    pub fn record_fetch_failure(&self, domain: &str, method: &str, decode_failure: bool) {
        self.failed_statistics_scrapes
            .with_label_values(&[domain, method])
            .inc();
        if decode_failure {
            self.failed_json_decode
                .with_label_values(&[domain, method])
                .inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_registered_up_front() {
        let registry = Registry::new();
        let _metrics = ExporterMetrics::new(&registry).unwrap();

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();

        // Scalar instruments exist before any scrape ran.
        for expected in [
            "qrator_up",
            "qrator_exporter_total_scrapes",
            "qrator_exporter_failed_scrapes",
            "qrator_exporter_failed_domain_scrapes",
        ] {
            assert!(names.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn double_registration_fails() {
        let registry = Registry::new();
        let _metrics = ExporterMetrics::new(&registry).unwrap();
        assert!(ExporterMetrics::new(&registry).is_err());
    }

    #[test]
    fn reset_clears_gauges_but_not_counters() {
        let registry = Registry::new();
        let metrics = ExporterMetrics::new(&registry).unwrap();

        metrics
            .http_requests
            .with_label_values(&["example.com", "statistics_current_http"])
            .set(100.0);
        metrics.record_fetch_failure("example.com", "statistics_current_http", false);

        metrics.reset_domain_gauges();

        let children = registry
            .gather()
            .iter()
            .find(|f| f.get_name() == "qrator_http_requests")
            .map(|f| f.get_metric().len())
            .unwrap_or(0);
        assert_eq!(children, 0);

        assert_eq!(
            metrics
                .failed_statistics_scrapes
                .with_label_values(&["example.com", "statistics_current_http"])
                .get(),
            1
        );
    }

    #[test]
    fn decode_failure_bumps_both_counters() {
        let registry = Registry::new();
        let metrics = ExporterMetrics::new(&registry).unwrap();

        metrics.record_fetch_failure("example.com", "statistics_current_ip", true);

        let labels = ["example.com", "statistics_current_ip"];
        assert_eq!(
            metrics.failed_statistics_scrapes.with_label_values(&labels).get(),
            1
        );
        assert_eq!(metrics.failed_json_decode.with_label_values(&labels).get(), 1);
    }
}
