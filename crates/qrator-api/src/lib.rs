//! qrator-api — client for the Qrator JSON-RPC request API.
//!
//! Every call is a single authenticated POST to
//! `<base>/<method-class>/<target-id>` with body `{"id":1,"method":"..."}`
//! and the `X-Qrator-Auth` header, answered by an
//! `{"id":..,"result":..,"error":..}` envelope. The crate distinguishes
//! transport failures, logical failures (non-empty `error`) and decode
//! failures of the opaque result payload.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiClient, MethodClass, API_TIMEOUT, QRATOR_API_URL};
pub use error::{ApiError, ApiResult};
pub use types::{
    BlacklistSizes, Domain, ErrorRates, HttpStatistics, IpStatistics, ResponseBuckets,
    TrafficRates, ONLINE_STATUS,
};

/// Domain-level method returning current HTTP traffic/error statistics.
pub const METHOD_HTTP_STATISTICS: &str = "statistics_current_http";

/// Domain-level method returning current IP bandwidth/packet/blacklist
/// statistics.
pub const METHOD_IP_STATISTICS: &str = "statistics_current_ip";
