//! Shared mocks and fixtures for flowrun tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use futures::future::BoxFuture;
use serde_json::{json, Value};

use flowrun_core::error::{FlowError, Result};
use flowrun_core::graph::{Edge, Graph, Node, NodeKind};
use flowrun_core::traits::HttpClient;
use flowrun_core::types::{OutboundRequest, OutboundResponse};

#[derive(Clone)]
enum Reply {
    Response(OutboundResponse),
    Fail(String),
    Hang,
}

/// An [`HttpClient`] that records requests and replays canned replies.
///
/// Queued replies are consumed first; once the queue is empty every request
/// gets the fallback reply.
pub struct MockHttpClient {
    queue: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl MockHttpClient {
    /// Answers every request with `200 {"ok": true}`.
    pub fn new() -> Self {
        Self::json(200, json!({"ok": true}))
    }

    pub fn json(status: u16, body: Value) -> Self {
        Self::with_fallback(Reply::Response(json_response(status, &body)))
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self::with_fallback(Reply::Response(OutboundResponse {
            status,
            status_text: String::new(),
            content_type: Some("text/plain".into()),
            body: body.to_string(),
        }))
    }

    /// Fails every request with a transport error.
    pub fn failing(message: &str) -> Self {
        Self::with_fallback(Reply::Fail(message.to_string()))
    }

    /// Never answers.
    pub fn hanging() -> Self {
        Self::with_fallback(Reply::Hang)
    }

    fn with_fallback(fallback: Reply) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback,
            requests: Mutex::new(vec![]),
        }
    }

    /// Queue a one-shot JSON reply ahead of the fallback.
    pub fn push_json(&self, status: u16, body: Value) {
        self.queue
            .lock()
            .unwrap()
            .push_back(Reply::Response(json_response(status, &body)));
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for MockHttpClient {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Result<OutboundResponse>> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        Box::pin(async move {
            match reply {
                Reply::Response(resp) => Ok(resp),
                Reply::Fail(message) => Err(FlowError::Http(message)),
                Reply::Hang => futures::future::pending().await,
            }
        })
    }
}

fn json_response(status: u16, body: &Value) -> OutboundResponse {
    OutboundResponse {
        status,
        status_text: String::new(),
        content_type: Some("application/json".into()),
        body: body.to_string(),
    }
}

// Fixtures

pub fn trigger(id: &str) -> Node {
    Node::new(id, NodeKind::Trigger)
}

pub fn http(id: &str, url: &str) -> Node {
    Node::new(id, NodeKind::HttpRequest).with_config(json!({"url": url}))
}

pub fn condition(id: &str, field: &str, operator: &str, value: Value) -> Node {
    Node::new(id, NodeKind::Condition)
        .with_config(json!({"field": field, "operator": operator, "value": value}))
}

pub fn transform(id: &str, template: Value) -> Node {
    Node::new(id, NodeKind::Transform).with_config(json!({"template": template}))
}

pub fn edge(source: &str, target: &str) -> Edge {
    Edge::connect(source, target)
}

pub fn graph(nodes: Vec<Node>, edges: Vec<Edge>) -> Graph {
    Graph::new(nodes, edges)
}

/// The request body for a graph, as a client would send it.
pub fn payload(graph: &Graph) -> Value {
    serde_json::to_value(graph).unwrap()
}

/// A linear graph of `n` transform nodes under one trigger.
pub fn chain_of(n: usize) -> Graph {
    let mut nodes = vec![trigger("t")];
    let mut edges = vec![];
    let mut prev = "t".to_string();
    for i in 0..n {
        let id = format!("n{}", i);
        nodes.push(transform(&id, json!({"step": i})));
        edges.push(edge(&prev, &id));
        prev = id;
    }
    graph(nodes, edges)
}
