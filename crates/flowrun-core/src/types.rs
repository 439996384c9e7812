use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An outbound HTTP request issued on behalf of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: Option<String>,
}

impl OutboundRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: vec![],
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post_json(url: impl Into<String>, body: &Value) -> Self {
        Self::new("POST", url)
            .header("Content-Type", "application/json")
            .with_body(body.to_string())
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// The response to an [`OutboundRequest`], fully buffered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundResponse {
    pub status: u16,
    pub status_text: String,
    #[serde(default)]
    pub content_type: Option<String>,
    pub body: String,
}

impl OutboundResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }

    /// Parsed JSON for JSON responses, the raw text otherwise.
    ///
    /// A JSON content type with an unparseable body falls back to text.
    pub fn data(&self) -> Value {
        if self.is_json() {
            if let Ok(v) = serde_json::from_str(&self.body) {
                return v;
            }
        }
        Value::String(self.body.clone())
    }
}
