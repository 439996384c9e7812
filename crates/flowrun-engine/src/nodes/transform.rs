use futures::future::BoxFuture;
use serde_json::Value;

use flowrun_core::error::Result;
use flowrun_core::graph::{Node, NodeKind};

use super::{ExecContext, NodeHandler};
use crate::context::NodeInput;
use crate::template::{render, render_value};

/// Reshapes upstream data with a template.
///
/// - string template: rendered, then parsed as JSON when possible
/// - object/array template: every string inside is rendered
/// - no template: passes `prev` through
pub struct TransformNode;

impl NodeHandler for TransformNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Transform
    }

    fn execute<'a>(
        &'a self,
        node: &'a Node,
        input: &'a NodeInput,
        _ctx: &'a ExecContext,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let output = match node.config.get("template") {
                None | Some(Value::Null) => input.prev.clone(),
                Some(Value::String(tpl)) => {
                    let rendered = render(tpl, &input.scope());
                    serde_json::from_str(&rendered).unwrap_or(Value::String(rendered))
                }
                Some(tpl @ (Value::Object(_) | Value::Array(_))) => render_value(tpl, &input.scope()),
                Some(literal) => literal.clone(),
            };
            Ok(output)
        })
    }
}
