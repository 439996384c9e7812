use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use flowrun_core::error::{FlowError, Result};
use flowrun_core::graph::{Node, NodeKind};
use flowrun_core::types::OutboundRequest;

use super::{parse_config, ExecContext, NodeHandler};
use crate::context::NodeInput;
use crate::template::render;

const NODE_TYPE: &str = "send_email";

/// Sends an email through the configured provider, or reports a mocked
/// delivery when no provider is configured.
pub struct SendEmailNode;

#[derive(Deserialize)]
struct SendEmailConfig {
    #[serde(default)]
    to: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: String,
}

impl NodeHandler for SendEmailNode {
    fn kind(&self) -> NodeKind {
        NodeKind::SendEmail
    }

    fn execute<'a>(
        &'a self,
        node: &'a Node,
        input: &'a NodeInput,
        ctx: &'a ExecContext,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let cfg: SendEmailConfig = parse_config(node)?;
            let scope = input.scope();
            let to = render(&cfg.to, &scope);
            let subject = render(&cfg.subject, &scope);
            let body = render(&cfg.body, &scope);

            if to.trim().is_empty() {
                return Err(FlowError::node_config(NODE_TYPE, "\"to\" address is required"));
            }

            let Some(email) = ctx.config.email.as_ref() else {
                info!(node_id = %node.id, to = %to, "No email provider configured, mocking delivery");
                return Ok(json!({
                    "sent": false,
                    "mock": true,
                    "to": to,
                    "subject": subject,
                    "message": "email provider not configured; email not actually sent",
                }));
            };

            let payload = json!({
                "from": email.from,
                "to": to,
                "subject": if subject.is_empty() { "Flow Notification" } else { subject.as_str() },
                "html": if body.is_empty() { "<p>Flow execution notification</p>" } else { body.as_str() },
            });
            let request = OutboundRequest::post_json(email.endpoint.as_str(), &payload)
                .header("Authorization", format!("Bearer {}", email.api_key));

            let resp = ctx.send(NODE_TYPE, request).await?;
            if !resp.is_success() {
                return Err(FlowError::network(
                    NODE_TYPE,
                    format!("email provider error: HTTP {}: {}", resp.status, resp.body),
                ));
            }

            let data = resp.data();
            Ok(json!({
                "sent": true,
                "to": to,
                "subject": subject,
                "id": data.get("id").cloned().unwrap_or(Value::Null),
            }))
        })
    }
}
