//! qrator-exporter — Prometheus exporter for the Qrator API.
//!
//! Each scrape of the telemetry endpoint queries the Qrator JSON-RPC API for
//! the credential's online domains and republishes their current HTTP and IP
//! statistics. The auth token comes from the `QRATOR_TOKEN_AUTH` environment
//! variable; the process refuses to start without it or when the startup
//! `ping` handshake fails.
//!
//! # Usage
//!
//! ```text
//! QRATOR_TOKEN_AUTH=<token> qrator-exporter -c 1234 -l :9805 -p /metrics
//! ```

mod server;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use qrator_api::{ApiClient, QRATOR_API_URL};
use qrator_collector::Collector;

use crate::server::{AppState, build_router};

const TOKEN_ENV_VAR: &str = "QRATOR_TOKEN_AUTH";

#[derive(Parser)]
#[command(name = "qrator-exporter", about = "Prometheus exporter for the Qrator API")]
struct Cli {
    /// Personal dashboard client id, as obtained in the Qrator dashboard.
    #[arg(short = 'c', long = "qrator.client-id", default_value = "1")]
    client_id: String,

    /// Address to listen on for the web interface and telemetry.
    #[arg(short = 'l', long = "web.listen-address", default_value = ":9805")]
    listen_address: String,

    /// Path under which to expose metrics.
    #[arg(short = 'p', long = "web.telemetry-path", default_value = "/metrics")]
    telemetry_path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let token = std::env::var(TOKEN_ENV_VAR)
        .with_context(|| format!("environment variable {TOKEN_ENV_VAR} is not set"))?;

    let addr = parse_listen_address(&cli.listen_address)?;
    let telemetry_path = normalize_telemetry_path(&cli.telemetry_path);

    let api = ApiClient::new(QRATOR_API_URL, &cli.client_id, &token)?;

    // Startup gate: the credential must answer the ping handshake before the
    // exporter begins serving.
    api.ping().await.context("qrator api ping failed")?;
    info!(client_id = %cli.client_id, "qrator api ping succeeded");

    let collector = Arc::new(Collector::new(api)?);

    let router = build_router(AppState {
        collector,
        telemetry_path: telemetry_path.clone(),
    });

    info!(%addr, path = %telemetry_path, "qrator exporter listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
        })
        .await?;

    info!("qrator exporter stopped");
    Ok(())
}

/// Parse a listen address, accepting the `":9805"` shorthand with the host
/// defaulting to all interfaces.
fn parse_listen_address(address: &str) -> anyhow::Result<SocketAddr> {
    let candidate = if address.starts_with(':') {
        format!("0.0.0.0{address}")
    } else {
        address.to_string()
    };
    candidate
        .parse()
        .with_context(|| format!("invalid listen address '{address}'"))
}

/// Ensure the telemetry path is rooted.
fn normalize_telemetry_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_address_shorthand_binds_all_interfaces() {
        let addr = parse_listen_address(":9805").unwrap();
        assert_eq!(addr, "0.0.0.0:9805".parse().unwrap());
    }

    #[test]
    fn listen_address_full_form() {
        let addr = parse_listen_address("127.0.0.1:9100").unwrap();
        assert_eq!(addr, "127.0.0.1:9100".parse().unwrap());
    }

    #[test]
    fn listen_address_rejects_garbage() {
        assert!(parse_listen_address("not-an-address").is_err());
        assert!(parse_listen_address(":not-a-port").is_err());
    }

    #[test]
    fn telemetry_path_gets_rooted() {
        assert_eq!(normalize_telemetry_path("metrics"), "/metrics");
        assert_eq!(normalize_telemetry_path("/metrics"), "/metrics");
    }

    #[test]
    fn cli_defaults_match_the_exporter_contract() {
        let cli = Cli::parse_from(["qrator-exporter"]);
        assert_eq!(cli.client_id, "1");
        assert_eq!(cli.listen_address, ":9805");
        assert_eq!(cli.telemetry_path, "/metrics");
    }
}
