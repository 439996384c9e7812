use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use flowrun_core::error::Result;
use flowrun_core::graph::{Node, NodeKind};

use super::{parse_config, ExecContext, NodeHandler};
use crate::context::NodeInput;
use crate::template::{display, render, resolve_path};

/// Compares an upstream value against a constant.
///
/// An unsupported operator is not an error: the node succeeds with
/// `pass: false`.
pub struct ConditionNode;

/// `field` and `operator` accept any JSON value; odd types never fail the node.
#[derive(Deserialize)]
struct ConditionConfig {
    #[serde(default)]
    field: Value,
    #[serde(default)]
    operator: Value,
    #[serde(default)]
    value: Value,
}

/// The fixed operator set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Contains,
    NotContains,
}

impl std::str::FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "==" | "equals" => Ok(Self::Equals),
            "!=" | "not_equals" => Ok(Self::NotEquals),
            ">" | "gt" => Ok(Self::GreaterThan),
            "<" | "lt" => Ok(Self::LessThan),
            ">=" | "gte" => Ok(Self::GreaterOrEqual),
            "<=" | "lte" => Ok(Self::LessOrEqual),
            "contains" => Ok(Self::Contains),
            "not_contains" => Ok(Self::NotContains),
            other => Err(format!("unsupported operator: {}", other)),
        }
    }
}

impl Operator {
    /// Parse a raw config value. A missing or null operator means `==`.
    pub fn from_config(raw: &Value) -> std::result::Result<Self, String> {
        match raw {
            Value::Null => Ok(Self::Equals),
            Value::String(s) => s.parse(),
            other => Err(format!("unsupported operator: {}", other)),
        }
    }

    /// Compare string renderings; ordering operators compare as numbers and
    /// are false when either side is not numeric.
    pub fn evaluate(self, left: &Value, right: &Value) -> bool {
        let l = display(left);
        let r = display(right);
        let numeric = || Some((l.trim().parse::<f64>().ok()?, r.trim().parse::<f64>().ok()?));

        match self {
            Self::Equals => l == r,
            Self::NotEquals => l != r,
            Self::Contains => l.contains(&r),
            Self::NotContains => !l.contains(&r),
            Self::GreaterThan => numeric().is_some_and(|(a, b)| a > b),
            Self::LessThan => numeric().is_some_and(|(a, b)| a < b),
            Self::GreaterOrEqual => numeric().is_some_and(|(a, b)| a >= b),
            Self::LessOrEqual => numeric().is_some_and(|(a, b)| a <= b),
        }
    }
}

impl NodeHandler for ConditionNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Condition
    }

    fn execute<'a>(
        &'a self,
        node: &'a Node,
        input: &'a NodeInput,
        _ctx: &'a ExecContext,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let cfg: ConditionConfig = parse_config(node)?;
            let scope = input.scope();

            let field = display(&cfg.field);
            let left = if field.trim().is_empty() {
                input.prev.clone()
            } else {
                resolve_path(&scope, &field).cloned().unwrap_or(Value::Null)
            };
            let right = match &cfg.value {
                Value::String(s) => Value::String(render(s, &scope)),
                other => other.clone(),
            };

            let pass = match Operator::from_config(&cfg.operator) {
                Ok(op) => op.evaluate(&left, &right),
                Err(reason) => {
                    debug!(node_id = %node.id, %reason, "Condition degraded to pass=false");
                    false
                }
            };

            Ok(json!({
                "pass": pass,
                "left": left,
                "operator": match cfg.operator {
                    Value::Null => json!("=="),
                    other => other,
                },
                "right": right,
            }))
        })
    }
}
