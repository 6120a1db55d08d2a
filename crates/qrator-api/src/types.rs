//! Wire types for the Qrator JSON-RPC API.
//!
//! The envelope carries an opaque `result` whose shape depends on the method;
//! callers decode it into one of the typed shapes below. Several upstream
//! fields are keyed by bare numbers (`"0000_0200"`, `"500"`), hence the
//! rename attributes.

use serde::{Deserialize, Serialize};

/// Sentinel status for a domain that is live behind Qrator filtering.
pub const ONLINE_STATUS: &str = "online";

/// Request body sent with every call.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub id: u32,
    pub method: &'a str,
}

/// Response envelope returned by every call.
///
/// A non-empty `error` signals a logical failure even on HTTP 200.
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    pub id: u32,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
}

/// One domain record from `domains_get`.
///
/// `ip`, `ip_json`, `qrator_ip` and `ports` are carried opaquely; the
/// exporter never consumes them but tolerates whatever shape they arrive in.
#[derive(Debug, Clone, Deserialize)]
pub struct Domain {
    pub id: u64,
    pub name: String,
    pub status: String,
    #[serde(rename = "isService", default)]
    pub is_service: bool,
    #[serde(default)]
    pub ip: Option<serde_json::Value>,
    #[serde(rename = "ip_json", default)]
    pub ip_json: Option<serde_json::Value>,
    #[serde(rename = "qratorIp", default)]
    pub qrator_ip: Option<String>,
    #[serde(default)]
    pub ports: Option<serde_json::Value>,
}

impl Domain {
    /// A domain is scraped only when it is online and not an internal
    /// service domain.
    pub fn is_active(&self) -> bool {
        self.status == ONLINE_STATUS && !self.is_service
    }
}

/// Result payload of `statistics_current_http`.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpStatistics {
    #[serde(default)]
    pub time: i64,
    pub requests: f64,
    pub responses: ResponseBuckets,
    pub errors: ErrorRates,
}

/// Response-time bucket rates, keyed upstream by millisecond ranges.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseBuckets {
    #[serde(rename = "0000_0200")]
    pub ms_0000_0200: f64,
    #[serde(rename = "0200_0500")]
    pub ms_0200_0500: f64,
    #[serde(rename = "0500_0700")]
    pub ms_0500_0700: f64,
    #[serde(rename = "0700_1000")]
    pub ms_0700_1000: f64,
    #[serde(rename = "1000_1500")]
    pub ms_1000_1500: f64,
    #[serde(rename = "1500_2000")]
    pub ms_1500_2000: f64,
    #[serde(rename = "2000_5000")]
    pub ms_2000_5000: f64,
    #[serde(rename = "5000_inf")]
    pub ms_5000_inf: f64,
}

impl ResponseBuckets {
    /// Ordered (duration label, rate) pairs as exposed to Prometheus.
    pub fn buckets(&self) -> [(&'static str, f64); 8] {
        [
            ("0.0-0.2s", self.ms_0000_0200),
            ("0.2-0.5s", self.ms_0200_0500),
            ("0.5-0.7s", self.ms_0500_0700),
            ("0.7-1.0s", self.ms_0700_1000),
            ("1.0-1.5s", self.ms_1000_1500),
            ("1.5-2.0s", self.ms_1500_2000),
            ("2.0-5.0s", self.ms_2000_5000),
            ("over 5s", self.ms_5000_inf),
        ]
    }
}

/// Error-response rates, total plus the tracked 5xx codes.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorRates {
    pub total: f64,
    #[serde(rename = "500")]
    pub http_500: f64,
    #[serde(rename = "501")]
    pub http_501: f64,
    #[serde(rename = "502")]
    pub http_502: f64,
    #[serde(rename = "503")]
    pub http_503: f64,
    #[serde(rename = "504")]
    pub http_504: f64,
}

impl ErrorRates {
    /// Ordered (http_code label, rate) pairs as exposed to Prometheus.
    pub fn rates(&self) -> [(&'static str, f64); 6] {
        [
            ("Total", self.total),
            ("500", self.http_500),
            ("501", self.http_501),
            ("502", self.http_502),
            ("503", self.http_503),
            ("504", self.http_504),
        ]
    }
}

/// Result payload of `statistics_current_ip`.
#[derive(Debug, Clone, Deserialize)]
pub struct IpStatistics {
    #[serde(default)]
    pub time: i64,
    pub bandwidth: TrafficRates,
    pub packets: TrafficRates,
    pub blacklist: BlacklistSizes,
}

/// Input/passed/output rates, shared by bandwidth (bps) and packets (pps).
#[derive(Debug, Clone, Deserialize)]
pub struct TrafficRates {
    pub input: f64,
    pub passed: f64,
    pub output: f64,
}

impl TrafficRates {
    /// Ordered (state label, rate) pairs as exposed to Prometheus.
    pub fn directions(&self) -> [(&'static str, f64); 3] {
        [
            ("input", self.input),
            ("passed", self.passed),
            ("output", self.output),
        ]
    }
}

/// Blacklist sizes by banning service.
#[derive(Debug, Clone, Deserialize)]
pub struct BlacklistSizes {
    pub qrator: f64,
    pub api: f64,
    pub waf: f64,
}

impl BlacklistSizes {
    /// Ordered (service label, size) pairs as exposed to Prometheus.
    pub fn services(&self) -> [(&'static str, f64); 3] {
        [("qrator", self.qrator), ("api", self.api), ("waf", self.waf)]
    }
}
