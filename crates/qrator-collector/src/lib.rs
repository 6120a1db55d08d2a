//! qrator-collector — the scrape engine of the Qrator exporter.
//!
//! Turns one inbound scrape trigger into N upstream calls (online domains ×
//! 2 statistic kinds) and republishes the results through a statically
//! registered Prometheus schema.
//!
//! # Architecture
//!
//! ```text
//! Collector::scrape()            ← one call per /metrics request, serialized
//!   ├── online_domains()         ← domain list; failure aborts the scrape
//!   ├── reset_domain_gauges()
//!   ├── fan_out                  ← one task per (domain, statistic kind)
//!   │     └── fetch + decode + write gauges / bump failure counters
//!   └── join raced against first failure, canceling siblings
//!
//! Collector::gather()            ← full schema snapshot for exposition
//! ```

pub mod metrics;
pub mod scrape;

pub use metrics::{ExporterMetrics, NAMESPACE};
pub use scrape::{Collector, ScrapeError};
