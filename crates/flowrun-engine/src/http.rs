use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use flowrun_core::config::EngineConfig;
use flowrun_core::error::{FlowError, Result};
use flowrun_core::traits::HttpClient;
use flowrun_core::types::{OutboundRequest, OutboundResponse};

/// URL schemes outbound requests may use.
pub const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// Parse `raw` and enforce the scheme allowlist.
///
/// Errors carry `node_type` as their prefix so they can be recorded against
/// the node directly.
pub fn check_url(node_type: &str, raw: &str) -> Result<Url> {
    let parsed = Url::parse(raw)
        .map_err(|_| FlowError::node_config(node_type, format!("invalid URL \"{}\"", raw)))?;

    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return Err(FlowError::policy(
            node_type,
            format!("protocol \"{}:\" not allowed", parsed.scheme()),
        ));
    }
    Ok(parsed)
}

/// Production [`HttpClient`] backed by `reqwest`.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FlowError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Result<OutboundResponse>> {
        Box::pin(async move {
            // Callers check too; the client never dials a disallowed scheme.
            let url = check_url("http", &request.url)?;

            let method = request
                .method
                .to_uppercase()
                .parse::<reqwest::Method>()
                .map_err(|e| FlowError::Http(format!("Invalid method: {}", e)))?;

            debug!(method = %method, url = %redacted(&url), "Sending outbound request");

            let mut req = self.client.request(method, url);
            for (k, v) in &request.headers {
                req = req.header(k.as_str(), v.as_str());
            }
            if let Some(body) = request.body {
                req = req.body(body);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| FlowError::Http(format!("Request failed: {}", e.without_url())))?;

            let status = resp.status();
            let content_type = resp
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(String::from);

            let body = resp
                .text()
                .await
                .map_err(|e| {
                    FlowError::Http(format!("Failed to read response body: {}", e.without_url()))
                })?;

            Ok(OutboundResponse {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
                content_type,
                body,
            })
        })
    }
}

/// `url` without query, fragment or credentials, for logging.
fn redacted(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.set_fragment(None);
    let _ = shown.set_username("");
    let _ = shown.set_password(None);
    shown.to_string()
}
