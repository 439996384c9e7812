use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use flowrun_core::error::{FlowError, Result};
use flowrun_core::graph::{Node, NodeKind};
use flowrun_core::types::OutboundRequest;

use super::{parse_config, ExecContext, NodeHandler};
use crate::context::NodeInput;
use crate::http::check_url;
use crate::template::{display, render, render_value};

const NODE_TYPE: &str = "http_request";

/// Calls an external http/https endpoint.
pub struct HttpRequestNode;

#[derive(Deserialize)]
struct HttpRequestConfig {
    #[serde(default)]
    url: String,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    headers: Map<String, Value>,
    #[serde(default)]
    body: Option<Value>,
}

fn default_method() -> String {
    "GET".into()
}

impl NodeHandler for HttpRequestNode {
    fn kind(&self) -> NodeKind {
        NodeKind::HttpRequest
    }

    fn execute<'a>(
        &'a self,
        node: &'a Node,
        input: &'a NodeInput,
        ctx: &'a ExecContext,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let cfg: HttpRequestConfig = parse_config(node)?;
            if cfg.url.trim().is_empty() {
                return Err(FlowError::node_config(NODE_TYPE, "url is required"));
            }

            let scope = input.scope();
            let url = render(&cfg.url, &scope);
            check_url(NODE_TYPE, &url)?;

            let method = cfg.method.to_uppercase();
            let mut request = OutboundRequest::new(method.as_str(), url.as_str());
            request.headers = build_headers(&cfg.headers, &scope);
            if matches!(method.as_str(), "POST" | "PUT" | "PATCH") {
                request.body = match &cfg.body {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(render(s, &scope)),
                    Some(other) => Some(render_value(other, &scope).to_string()),
                };
            }

            debug!(node_id = %node.id, method = %method, url = %url, "Issuing http_request");
            let resp = ctx.send(NODE_TYPE, request).await?;

            if !resp.is_success() {
                return Err(FlowError::network(
                    NODE_TYPE,
                    format!("HTTP {} {}", resp.status, resp.status_text).trim_end().to_string(),
                ));
            }

            Ok(json!({
                "status": resp.status,
                "statusText": resp.status_text,
                "data": resp.data(),
            }))
        })
    }
}

/// `Content-Type: application/json` plus the configured headers, whose
/// values are templated. Configured names replace defaults case-insensitively.
fn build_headers(configured: &Map<String, Value>, scope: &Value) -> Vec<(String, String)> {
    let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    for (name, value) in configured {
        headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        headers.push((name.clone(), render(&display(value), scope)));
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::test_support::ctx;
    use flowrun_test_utils::MockHttpClient;
    use std::sync::Arc;

    fn node(config: Value) -> Node {
        Node::new("h", NodeKind::HttpRequest).with_config(config)
    }

    async fn run(http: &Arc<MockHttpClient>, config: Value, input: NodeInput) -> Result<Value> {
        let ctx = ctx(http.clone());
        HttpRequestNode.execute(&node(config), &input, &ctx).await
    }

    #[tokio::test]
    async fn test_empty_url_is_required_error() {
        let http = Arc::new(MockHttpClient::new());
        for config in [json!({"url": ""}), json!({}), json!({"url": "   "})] {
            let err = run(&http, config, NodeInput::new()).await.unwrap_err();
            assert!(err.to_string().contains("url is required"));
        }
        assert_eq!(http.request_count(), 0);
    }

    #[tokio::test]
    async fn test_disallowed_scheme_never_dials() {
        let http = Arc::new(MockHttpClient::new());
        let err = run(&http, json!({"url": "ftp://example.com/file"}), NodeInput::new())
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("protocol") && msg.contains("not allowed"), "{}", msg);
        assert_eq!(http.request_count(), 0);
    }

    #[tokio::test]
    async fn test_success_output_shape() {
        let http = Arc::new(MockHttpClient::json(200, json!({"id": 7})));
        let out = run(&http, json!({"url": "https://api.test/items"}), NodeInput::new())
            .await
            .unwrap();
        assert_eq!(out["status"], 200);
        assert_eq!(out["data"]["id"], 7);

        let sent = http.requests();
        assert_eq!(sent[0].method, "GET");
        assert_eq!(sent[0].url, "https://api.test/items");
        assert!(sent[0].body.is_none());
    }

    #[tokio::test]
    async fn test_non_2xx_is_node_error() {
        let http = Arc::new(MockHttpClient::text(503, "down"));
        let err = run(&http, json!({"url": "https://api.test"}), NodeInput::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Network { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_templates_url_headers_and_body() {
        let http = Arc::new(MockHttpClient::new());
        let input = NodeInput::from_prev(json!({"user": "ada", "token": "t0k"}));
        run(
            &http,
            json!({
                "url": "https://api.test/users/{{prev.user}}",
                "method": "post",
                "headers": {"Authorization": "Bearer {{prev.token}}", "content-type": "text/plain"},
                "body": "hello {{prev.user}}"
            }),
            input,
        )
        .await
        .unwrap();

        let req = &http.requests()[0];
        assert_eq!(req.method, "POST");
        assert_eq!(req.url, "https://api.test/users/ada");
        assert_eq!(req.body.as_deref(), Some("hello ada"));
        assert!(req
            .headers
            .contains(&("Authorization".to_string(), "Bearer t0k".to_string())));
        assert!(req
            .headers
            .iter()
            .all(|(k, v)| !(k == "Content-Type" && v == "application/json")));
    }

    #[tokio::test]
    async fn test_get_drops_body() {
        let http = Arc::new(MockHttpClient::new());
        run(&http, json!({"url": "https://api.test", "body": {"a": 1}}), NodeInput::new())
            .await
            .unwrap();
        assert!(http.requests()[0].body.is_none());
    }

    #[tokio::test]
    async fn test_json_body_serialized() {
        let http = Arc::new(MockHttpClient::new());
        run(
            &http,
            json!({"url": "https://api.test", "method": "PUT", "body": {"name": "{{prev}}"}}),
            NodeInput::from_prev(json!("x")),
        )
        .await
        .unwrap();
        assert_eq!(http.requests()[0].body.as_deref(), Some(r#"{"name":"x"}"#));
    }
}
