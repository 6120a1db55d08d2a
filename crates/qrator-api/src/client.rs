//! Authenticated JSON-RPC client for the Qrator API.
//!
//! One POST per call, a fixed 5-second timeout, no retries — a failed call
//! is final and the caller decides what it means for the scrape.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::types::{Domain, HttpStatistics, IpStatistics, RpcRequest, RpcResponse};

/// Production endpoint of the Qrator request API.
pub const QRATOR_API_URL: &str = "https://api.qrator.net/request";

/// Per-call timeout applied to every upstream request.
pub const API_TIMEOUT: Duration = Duration::from_secs(5);

const AUTH_HEADER: &str = "X-Qrator-Auth";
const METHOD_DOMAINS_GET: &str = "domains_get";
const METHOD_PING: &str = "ping";

/// Method class prefix in the request URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodClass {
    /// Client-level methods, addressed by the dashboard client id.
    Client,
    /// Domain-level methods, addressed by a domain id.
    Domain,
}

impl MethodClass {
    fn as_str(self) -> &'static str {
        match self {
            MethodClass::Client => "client",
            MethodClass::Domain => "domain",
        }
    }
}

/// Stateless client for the Qrator request API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    auth_token: String,
}

impl ApiClient {
    /// Build a client against `base_url` with the credential pair.
    pub fn new(base_url: &str, client_id: &str, auth_token: &str) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            auth_token: auth_token.to_string(),
        })
    }

    /// Perform one call and return the opaque `result` payload.
    ///
    /// A non-empty `error` field in the envelope is surfaced as
    /// [`ApiError::Api`] even when the transport succeeded.
    pub async fn call(
        &self,
        class: MethodClass,
        method: &str,
        target: &str,
    ) -> ApiResult<serde_json::Value> {
        let url = format!("{}/{}/{}", self.base_url, class.as_str(), target);
        let body = RpcRequest { id: 1, method };

        debug!(%url, method, "qrator api call");

        let response = self
            .http
            .post(&url)
            .header(AUTH_HEADER, &self.auth_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("method '{method}': {e}")))?;

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Transport(format!("method '{method}': invalid envelope: {e}")))?;

        match envelope.error {
            Some(err) if !err.is_empty() => Err(ApiError::Api(format!("method '{method}': {err}"))),
            _ => Ok(envelope.result),
        }
    }

    /// Call a method and decode its result into `T`.
    async fn call_decoded<T: DeserializeOwned>(
        &self,
        class: MethodClass,
        method: &str,
        target: &str,
    ) -> ApiResult<T> {
        let result = self.call(class, method, target).await?;
        serde_json::from_value(result)
            .map_err(|e| ApiError::Decode(format!("method '{method}': {e}")))
    }

    /// Liveness handshake: the client-level `ping` method must answer
    /// the literal `"pong"`.
    pub async fn ping(&self) -> ApiResult<()> {
        let result = self
            .call(MethodClass::Client, METHOD_PING, &self.client_id)
            .await?;
        if result.as_str() == Some("pong") {
            Ok(())
        } else {
            Err(ApiError::Api(format!(
                "method 'ping': unexpected result {result}"
            )))
        }
    }

    /// Fetch every domain registered for the credential, unfiltered.
    pub async fn domains(&self) -> ApiResult<Vec<Domain>> {
        self.call_decoded(MethodClass::Client, METHOD_DOMAINS_GET, &self.client_id)
            .await
    }

    /// Fetch the domain list and keep only domains that are online and not
    /// internal service domains.
    pub async fn online_domains(&self) -> ApiResult<Vec<Domain>> {
        let domains = self.domains().await?;
        Ok(domains.into_iter().filter(Domain::is_active).collect())
    }

    /// Fetch current HTTP traffic/error statistics for one domain.
    pub async fn http_statistics(&self, domain_id: u64) -> ApiResult<HttpStatistics> {
        self.call_decoded(
            MethodClass::Domain,
            crate::METHOD_HTTP_STATISTICS,
            &domain_id.to_string(),
        )
        .await
    }

    /// Fetch current IP bandwidth/packet/blacklist statistics for one domain.
    pub async fn ip_statistics(&self, domain_id: u64) -> ApiResult<IpStatistics> {
        self.call_decoded(
            MethodClass::Domain,
            crate::METHOD_IP_STATISTICS,
            &domain_id.to_string(),
        )
        .await
    }
}
