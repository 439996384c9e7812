//! Node strategies and the dispatch table that selects them by node type.
//!
//! Adding a node type means writing a [`NodeHandler`] and registering it in
//! [`NodeRegistry::with_builtins`]; planning and aggregation are unaffected.

pub mod ai_chat;
pub mod condition;
pub mod http_request;
pub mod send_email;
pub mod transform;
pub mod trigger;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use flowrun_core::config::AppConfig;
use flowrun_core::error::{FlowError, Result};
use flowrun_core::graph::{Node, NodeKind};
use flowrun_core::traits::HttpClient;
use flowrun_core::types::{OutboundRequest, OutboundResponse};

use crate::context::NodeInput;

/// A strategy for one node type.
pub trait NodeHandler: Send + Sync + 'static {
    fn kind(&self) -> NodeKind;

    /// Run the node. `Err` is recorded as this node's error; it never
    /// aborts the rest of the run.
    fn execute<'a>(
        &'a self,
        node: &'a Node,
        input: &'a NodeInput,
        ctx: &'a ExecContext,
    ) -> BoxFuture<'a, Result<Value>>;
}

/// Per-run collaborators handed to every node.
#[derive(Clone)]
pub struct ExecContext {
    pub http: Arc<dyn HttpClient>,
    pub config: Arc<AppConfig>,
    pub cancel: CancellationToken,
}

impl ExecContext {
    /// Send an outbound request under the configured timeout and the run's
    /// cancellation token. Transport errors are tagged with `node_type`.
    pub async fn send(&self, node_type: &str, request: OutboundRequest) -> Result<OutboundResponse> {
        let timeout_secs = self.config.engine.http_timeout_secs;
        let call = tokio::time::timeout(Duration::from_secs(timeout_secs), self.http.send(request));

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FlowError::Cancelled {
                node_type: node_type.to_string(),
            }),
            res = call => match res {
                Ok(Ok(resp)) => Ok(resp),
                Ok(Err(FlowError::Http(message))) => Err(FlowError::network(node_type, message)),
                Ok(Err(other)) => Err(other),
                Err(_) => Err(FlowError::Timeout {
                    node_type: node_type.to_string(),
                    timeout_secs,
                }),
            },
        }
    }
}

/// Parse a node's config into its typed settings.
pub(crate) fn parse_config<T: DeserializeOwned>(node: &Node) -> Result<T> {
    serde_json::from_value(Value::Object(node.config.clone()))
        .map_err(|e| FlowError::node_config(node.kind.as_str(), format!("invalid config: {}", e)))
}

/// Dispatch table from node type to handler.
pub struct NodeRegistry {
    handlers: HashMap<NodeKind, Arc<dyn NodeHandler>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler, replacing any existing one for the same type.
    pub fn register(&mut self, handler: impl NodeHandler) {
        self.handlers.insert(handler.kind(), Arc::new(handler));
    }

    pub fn unregister(&mut self, kind: NodeKind) -> bool {
        self.handlers.remove(&kind).is_some()
    }

    pub fn get(&self, kind: NodeKind) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<NodeKind> {
        let mut kinds: Vec<NodeKind> = self.handlers.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    /// Dispatch a node to its handler.
    pub async fn execute(&self, node: &Node, input: &NodeInput, ctx: &ExecContext) -> Result<Value> {
        let handler = self
            .get(node.kind)
            .ok_or_else(|| FlowError::UnsupportedNode(node.kind.to_string()))?;
        handler.execute(node, input, ctx).await
    }

    /// A registry with every built-in node type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(trigger::TriggerNode);
        registry.register(http_request::HttpRequestNode);
        registry.register(condition::ConditionNode);
        registry.register(transform::TransformNode);
        registry.register(send_email::SendEmailNode);
        registry.register(ai_chat::AiChatNode);
        registry
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
