use std::collections::HashMap;

use serde_json::{Map, Value};

/// What a node receives from upstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeInput {
    /// Output of the first predecessor (edge declaration order), or null.
    pub prev: Value,
    /// Every predecessor's output keyed by node id.
    pub parents: Map<String, Value>,
}

impl NodeInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input for a node with a single upstream output.
    pub fn from_prev(prev: Value) -> Self {
        Self {
            prev,
            parents: Map::new(),
        }
    }

    /// The lookup scope for templates and condition fields.
    ///
    /// Shape: `{ "<parentId>": ..., "prev": ..., "parents": {...} }`. The
    /// `prev` and `parents` keys win over a parent with the same id.
    pub fn scope(&self) -> Value {
        let mut scope = self.parents.clone();
        scope.insert("prev".into(), self.prev.clone());
        scope.insert("parents".into(), Value::Object(self.parents.clone()));
        Value::Object(scope)
    }
}

/// Outputs of completed nodes within one chain, keyed by node id.
///
/// Failed nodes are recorded as null so downstream nodes still run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    outputs: HashMap<String, Value>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, node_id: impl Into<String>, output: Value) {
        self.outputs.insert(node_id.into(), output);
    }

    /// Assemble the input for a node from its predecessors' recorded outputs.
    pub fn input_for<'a>(&self, predecessors: impl IntoIterator<Item = &'a str>) -> NodeInput {
        let mut input = NodeInput::new();
        for (i, id) in predecessors.into_iter().enumerate() {
            let output = self.outputs.get(id).cloned().unwrap_or(Value::Null);
            if i == 0 {
                input.prev = output.clone();
            }
            input.parents.insert(id.to_string(), output);
        }
        input
    }
}
