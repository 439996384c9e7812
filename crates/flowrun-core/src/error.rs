use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    // Request-fatal errors
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unauthorized")]
    Unauthorized,

    // Node-local errors, recorded against a single node's result
    #[error("{node_type}: {message}")]
    NodeConfig { node_type: String, message: String },

    #[error("{node_type}: {message}")]
    PolicyViolation { node_type: String, message: String },

    #[error("{node_type}: {message}")]
    Network { node_type: String, message: String },

    #[error("{node_type}: request timed out after {timeout_secs}s")]
    Timeout { node_type: String, timeout_secs: u64 },

    #[error("{node_type}: cancelled")]
    Cancelled { node_type: String },

    #[error("No handler registered for node type: {0}")]
    UnsupportedNode(String),

    // Outbound HTTP client errors, before a node attaches its type
    #[error("HTTP request failed: {0}")]
    Http(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowError {
    pub fn node_config(node_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NodeConfig {
            node_type: node_type.into(),
            message: message.into(),
        }
    }

    pub fn policy(node_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PolicyViolation {
            node_type: node_type.into(),
            message: message.into(),
        }
    }

    pub fn network(node_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            node_type: node_type.into(),
            message: message.into(),
        }
    }
}

/// Structural problems with a submitted graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("expected between 1 and {max} nodes, got {count}")]
    NodeCount { count: usize, max: usize },

    #[error("expected at most {max} edges, got {count}")]
    EdgeCount { count: usize, max: usize },

    #[error("{path}: missing required field `{field}`")]
    MissingField { path: String, field: String },

    #[error("{path}: {message}")]
    InvalidField { path: String, message: String },

    #[error("{path}: unknown node type `{kind}`")]
    UnknownNodeType { path: String, kind: String },

    #[error("duplicate node id `{0}`")]
    DuplicateNode(String),

    #[error("edge `{edge}` references unknown node `{node}`")]
    DanglingEdge { edge: String, node: String },

    #[error("flow graph contains a cycle")]
    Cycle,

    #[error("{0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_error_messages_carry_type_prefix() {
        let err = FlowError::node_config("http_request", "url is required");
        assert_eq!(err.to_string(), "http_request: url is required");

        let err = FlowError::policy("http_request", r#"protocol "ftp:" not allowed"#);
        assert!(err.to_string().contains("protocol"));
        assert!(err.to_string().contains("not allowed"));
    }
}
