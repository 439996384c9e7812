use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use flowrun_core::config::AiConfig;
use flowrun_core::error::{FlowError, Result};
use flowrun_core::graph::{Node, NodeKind};
use flowrun_core::types::{OutboundRequest, OutboundResponse};

use super::{parse_config, ExecContext, NodeHandler};
use crate::context::NodeInput;
use crate::template::render;

const NODE_TYPE: &str = "ai_chat";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_FALLBACK_MODEL: &str = "claude-3-5-haiku-20241022";

/// Sends a single-turn prompt to a chat model.
///
/// The provider is chosen from the model name: `claude`/`anthropic` go to
/// Anthropic, `gemini` to Google, anything else to OpenAI.
pub struct AiChatNode;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiChatConfig {
    #[serde(default)]
    prompt: String,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_max_tokens() -> u32 {
    1024
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Gemini,
}

impl Provider {
    pub fn for_model(model: &str) -> Self {
        let lower = model.to_lowercase();
        if lower.contains("claude") || lower.contains("anthropic") {
            Self::Anthropic
        } else if lower.contains("gemini") {
            Self::Gemini
        } else {
            Self::OpenAi
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Gemini => "Gemini",
        }
    }

    fn key_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }

    fn api_key(self, ai: &AiConfig) -> Option<&str> {
        let key = match self {
            Self::OpenAi => ai.openai_api_key.as_deref(),
            Self::Anthropic => ai.anthropic_api_key.as_deref(),
            Self::Gemini => ai.gemini_api_key.as_deref(),
        };
        key.filter(|k| !k.is_empty())
    }
}

impl NodeHandler for AiChatNode {
    fn kind(&self) -> NodeKind {
        NodeKind::AiChat
    }

    fn execute<'a>(
        &'a self,
        node: &'a Node,
        input: &'a NodeInput,
        ctx: &'a ExecContext,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let cfg: AiChatConfig = parse_config(node)?;
            if cfg.prompt.is_empty() {
                return Err(FlowError::node_config(NODE_TYPE, "prompt is required"));
            }
            let prompt = render(&cfg.prompt, &input.scope());

            let ai = &ctx.config.ai;
            let provider = Provider::for_model(&cfg.model);
            let key = provider.api_key(ai).ok_or_else(|| {
                FlowError::node_config(NODE_TYPE, format!("{} not configured", provider.key_var()))
            })?;

            debug!(node_id = %node.id, provider = provider.name(), model = %cfg.model, "Calling chat model");

            let (request, model) = match provider {
                Provider::Anthropic => {
                    let model = if cfg.model.to_lowercase().contains("claude") {
                        cfg.model.clone()
                    } else {
                        ANTHROPIC_FALLBACK_MODEL.to_string()
                    };
                    let body = json!({
                        "model": model,
                        "max_tokens": cfg.max_tokens,
                        "messages": [{"role": "user", "content": prompt}],
                    });
                    let url = format!("{}/messages", ai.anthropic_base_url.trim_end_matches('/'));
                    let req = OutboundRequest::post_json(url, &body)
                        .header("x-api-key", key)
                        .header("anthropic-version", ANTHROPIC_VERSION);
                    (req, model)
                }
                Provider::Gemini => {
                    let body = json!({"contents": [{"parts": [{"text": prompt}]}]});
                    let url = format!(
                        "{}/models/{}:generateContent",
                        ai.gemini_base_url.trim_end_matches('/'),
                        cfg.model
                    );
                    // Never put the key in the URL.
                    let req = OutboundRequest::post_json(url, &body).header("x-goog-api-key", key);
                    (req, cfg.model.clone())
                }
                Provider::OpenAi => {
                    let body = json!({
                        "model": cfg.model,
                        "messages": [{"role": "user", "content": prompt}],
                        "max_tokens": cfg.max_tokens,
                    });
                    let url = format!("{}/chat/completions", ai.openai_base_url.trim_end_matches('/'));
                    let req = OutboundRequest::post_json(url, &body)
                        .header("Authorization", format!("Bearer {}", key));
                    (req, cfg.model.clone())
                }
            };

            let resp = ctx.send(NODE_TYPE, request).await?;
            let data = resp.data();
            if !resp.is_success() {
                return Err(FlowError::network(
                    NODE_TYPE,
                    format!("{} API error: {}", provider.name(), error_message(&resp, &data)),
                ));
            }

            let (text, usage) = match provider {
                Provider::Anthropic => (
                    data.pointer("/content/0/text").cloned(),
                    data.get("usage").cloned(),
                ),
                Provider::Gemini => (
                    data.pointer("/candidates/0/content/parts/0/text").cloned(),
                    data.get("usageMetadata").cloned(),
                ),
                Provider::OpenAi => (
                    data.pointer("/choices/0/message/content").cloned(),
                    data.get("usage").cloned(),
                ),
            };

            Ok(json!({
                "text": text.unwrap_or_else(|| Value::String(String::new())),
                "model": model,
                "usage": usage.unwrap_or(Value::Null),
            }))
        })
    }
}

/// Provider error message from `{"error": {"message": ...}}`, falling back
/// to the status line.
fn error_message(resp: &OutboundResponse, data: &Value) -> String {
    data.pointer("/error/message")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| format!("HTTP {} {}", resp.status, resp.status_text).trim_end().to_string())
}
