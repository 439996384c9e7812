//! Structural validation of submitted graphs.
//!
//! This is the single gate in front of execution: it parses the raw JSON
//! payload into typed [`Graph`] values, enforces size bounds and referential
//! integrity, and rejects cycles. It never looks inside node `config`; each
//! node handler parses its own settings when it runs.

use serde_json::{Map, Value};

use flowrun_core::error::ValidationError;
use flowrun_core::graph::{
    Edge, Graph, Node, NodeKind, Position, MAX_EDGES, MAX_ID_LEN, MAX_LABEL_LEN, MAX_NODES,
};

use crate::plan::{self, ExecutionPlan};

type Result<T> = std::result::Result<T, ValidationError>;

/// Parse and validate a raw request payload.
pub fn validate(payload: &Value) -> Result<Graph> {
    validate_and_plan(payload).map(|(graph, _)| graph)
}

/// Parse and validate a raw request payload, keeping the execution plan
/// built along the way.
pub fn validate_and_plan(payload: &Value) -> Result<(Graph, ExecutionPlan)> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ValidationError::Malformed("body must be a JSON object".into()))?;

    let raw_nodes = match obj.get("nodes") {
        None | Some(Value::Null) => return Err(missing("$", "nodes")),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(invalid("nodes", "must be an array")),
    };
    check_counts(raw_nodes.len(), 0)?;

    let raw_edges: &[Value] = match obj.get("edges") {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(_) => return Err(invalid("edges", "must be an array")),
    };
    check_counts(raw_nodes.len(), raw_edges.len())?;

    let nodes = raw_nodes
        .iter()
        .enumerate()
        .map(|(i, v)| parse_node(i, v))
        .collect::<Result<Vec<_>>>()?;
    let edges = raw_edges
        .iter()
        .enumerate()
        .map(|(i, v)| parse_edge(i, v))
        .collect::<Result<Vec<_>>>()?;

    let graph = Graph::new(nodes, edges);
    let plan = validate_graph(&graph)?;
    Ok((graph, plan))
}

/// Validate an already-typed graph: bounds, ids, labels, references, cycles.
///
/// Returns the execution plan on success.
pub fn validate_graph(graph: &Graph) -> Result<ExecutionPlan> {
    check_counts(graph.nodes.len(), graph.edges.len())?;

    for (i, node) in graph.nodes.iter().enumerate() {
        let path = format!("nodes[{}]", i);
        check_id(&path, "id", &node.id)?;
        check_label(&path, &node.label)?;
    }
    for (i, edge) in graph.edges.iter().enumerate() {
        let path = format!("edges[{}]", i);
        check_id(&path, "id", &edge.id)?;
        check_id(&path, "source", &edge.source)?;
        check_id(&path, "target", &edge.target)?;
        if let Some(label) = &edge.label {
            check_label(&path, label)?;
        }
    }

    // Duplicate ids, dangling edges, and cycles all surface from planning.
    plan::plan(graph)
}

fn check_counts(nodes: usize, edges: usize) -> Result<()> {
    if nodes == 0 || nodes > MAX_NODES {
        return Err(ValidationError::NodeCount {
            count: nodes,
            max: MAX_NODES,
        });
    }
    if edges > MAX_EDGES {
        return Err(ValidationError::EdgeCount {
            count: edges,
            max: MAX_EDGES,
        });
    }
    Ok(())
}

fn parse_node(index: usize, value: &Value) -> Result<Node> {
    let path = format!("nodes[{}]", index);
    let obj = value
        .as_object()
        .ok_or_else(|| invalid(&path, "must be an object"))?;

    let id = required_str(obj, &path, "id")?;
    let kind_str = required_str(obj, &path, "type")?;
    let kind = kind_str
        .parse::<NodeKind>()
        .map_err(|_| ValidationError::UnknownNodeType {
            path: path.clone(),
            kind: kind_str.to_string(),
        })?;

    let label = optional_str(obj, &path, "label")?.unwrap_or_default();

    let config = match obj.get("config") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return Err(invalid(&path, "`config` must be an object")),
    };

    let position = match obj.get("position") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            serde_json::from_value::<Position>(v.clone())
                .map_err(|e| invalid(&path, format!("`position` {}", e)))?,
        ),
    };

    Ok(Node {
        id: id.to_string(),
        kind,
        label: label.to_string(),
        config,
        position,
    })
}

fn parse_edge(index: usize, value: &Value) -> Result<Edge> {
    let path = format!("edges[{}]", index);
    let obj = value
        .as_object()
        .ok_or_else(|| invalid(&path, "must be an object"))?;

    Ok(Edge {
        id: required_str(obj, &path, "id")?.to_string(),
        source: required_str(obj, &path, "source")?.to_string(),
        target: required_str(obj, &path, "target")?.to_string(),
        label: optional_str(obj, &path, "label")?.map(String::from),
    })
}

fn required_str<'a>(obj: &'a Map<String, Value>, path: &str, field: &str) -> Result<&'a str> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(missing(path, field)),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(invalid(path, format!("`{}` must be a string", field))),
    }
}

fn optional_str<'a>(
    obj: &'a Map<String, Value>,
    path: &str,
    field: &str,
) -> Result<Option<&'a str>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(invalid(path, format!("`{}` must be a string", field))),
    }
}

fn check_id(path: &str, field: &str, id: &str) -> Result<()> {
    let len = id.chars().count();
    if len == 0 || len > MAX_ID_LEN {
        return Err(invalid(
            path,
            format!("`{}` must be 1-{} characters", field, MAX_ID_LEN),
        ));
    }
    Ok(())
}

fn check_label(path: &str, label: &str) -> Result<()> {
    if label.chars().count() > MAX_LABEL_LEN {
        return Err(invalid(
            path,
            format!("`label` must be at most {} characters", MAX_LABEL_LEN),
        ));
    }
    Ok(())
}

fn missing(path: &str, field: &str) -> ValidationError {
    ValidationError::MissingField {
        path: path.to_string(),
        field: field.to_string(),
    }
}

fn invalid(path: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidField {
        path: path.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn triggers(n: usize) -> Value {
        let nodes: Vec<Value> = (0..n)
            .map(|i| json!({"id": format!("t{}", i), "type": "trigger", "label": "T", "config": {}}))
            .collect();
        json!({ "nodes": nodes, "edges": [] })
    }

    #[test]
    fn test_node_count_bounds() {
        assert!(validate(&triggers(1)).is_ok());
        assert!(validate(&triggers(50)).is_ok());
        assert_eq!(
            validate(&triggers(51)),
            Err(ValidationError::NodeCount { count: 51, max: 50 })
        );
        assert_eq!(
            validate(&triggers(0)),
            Err(ValidationError::NodeCount { count: 0, max: 50 })
        );
    }

    #[test]
    fn test_missing_required_fields() {
        let err = validate(&json!({"nodes": [{"type": "trigger"}], "edges": []})).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { ref field, .. } if field == "id"));

        let err = validate(&json!({"nodes": [{"id": "a"}], "edges": []})).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { ref field, .. } if field == "type"));

        let err = validate(&json!({"edges": []})).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { ref field, .. } if field == "nodes"));
    }

    #[test]
    fn test_unknown_node_type() {
        let err = validate(&json!({"nodes": [{"id": "a", "type": "shell"}]})).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownNodeType {
                path: "nodes[0]".into(),
                kind: "shell".into()
            }
        );
    }

    #[test]
    fn test_edges_default_to_empty() {
        let graph = validate(&json!({"nodes": [{"id": "a", "type": "trigger"}]})).unwrap();
        assert!(graph.edges.is_empty());
        assert!(graph.nodes[0].label.is_empty());
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let payload = json!({
            "nodes": [{"id": "a", "type": "trigger"}],
            "edges": [{"id": "e1", "source": "a", "target": "ghost"}]
        });
        assert_eq!(
            validate(&payload),
            Err(ValidationError::DanglingEdge {
                edge: "e1".into(),
                node: "ghost".into()
            })
        );
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let payload = json!({
            "nodes": [{"id": "a", "type": "trigger"}, {"id": "a", "type": "condition"}]
        });
        assert_eq!(
            validate(&payload),
            Err(ValidationError::DuplicateNode("a".into()))
        );
    }

    #[test]
    fn test_cycle_rejected() {
        let payload = json!({
            "nodes": [{"id": "a", "type": "transform"}, {"id": "b", "type": "transform"}],
            "edges": [
                {"id": "e1", "source": "a", "target": "b"},
                {"id": "e2", "source": "b", "target": "a"}
            ]
        });
        assert_eq!(validate(&payload), Err(ValidationError::Cycle));
    }

    #[test]
    fn test_field_shape_errors() {
        let long_id = "x".repeat(65);
        assert!(validate(&json!({"nodes": [{"id": long_id, "type": "trigger"}]})).is_err());
        assert!(validate(&json!({"nodes": [{"id": "", "type": "trigger"}]})).is_err());
        assert!(validate(&json!({"nodes": [{"id": "a", "type": "trigger", "config": []}]})).is_err());
        assert!(validate(&json!({"nodes": [{"id": "a", "type": "trigger", "label": "l".repeat(121)}]})).is_err());
        assert!(validate(&json!({"nodes": "a"})).is_err());
        assert!(validate(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_too_many_edges() {
        let edges: Vec<Value> = (0..201)
            .map(|i| json!({"id": format!("e{}", i), "source": "a", "target": "b"}))
            .collect();
        let payload = json!({
            "nodes": [{"id": "a", "type": "trigger"}, {"id": "b", "type": "transform"}],
            "edges": edges
        });
        assert_eq!(
            validate(&payload),
            Err(ValidationError::EdgeCount { count: 201, max: 200 })
        );
    }

    #[test]
    fn test_position_is_kept() {
        let graph = validate(&json!({
            "nodes": [{"id": "a", "type": "trigger", "position": {"x": 1.5, "y": 2.0}}]
        }))
        .unwrap();
        assert_eq!(graph.nodes[0].position, Some(Position { x: 1.5, y: 2.0 }));
    }

    #[test]
    fn test_validate_and_plan_returns_plan() {
        let (graph, plan) = validate_and_plan(&json!({
            "nodes": [
                {"id": "b", "type": "transform", "config": {}},
                {"id": "a", "type": "trigger"},
                {"id": "solo", "type": "trigger"}
            ],
            "edges": [{"id": "e", "source": "a", "target": "b"}]
        }))
        .unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(plan.roots(), [1, 2]);
        assert_eq!(plan.chains.len(), 2);
        let order: Vec<usize> = plan.chains[0].steps.iter().map(|s| s.index).collect();
        assert_eq!(order, [1, 0]);
    }
}
