use futures::future::BoxFuture;
use serde_json::Value;

use flowrun_core::error::Result;
use flowrun_core::graph::{Node, NodeKind};

use super::{ExecContext, NodeHandler};
use crate::context::NodeInput;

/// Entry point of a flow. Echoes its static config and never fails.
pub struct TriggerNode;

impl NodeHandler for TriggerNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Trigger
    }

    fn execute<'a>(
        &'a self,
        node: &'a Node,
        _input: &'a NodeInput,
        _ctx: &'a ExecContext,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let mut output = node.config.clone();
            output
                .entry("type")
                .or_insert_with(|| Value::String("manual".into()));
            Ok(Value::Object(output))
        })
    }
}
