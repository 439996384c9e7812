use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use flowrun_core::config::AppConfig;
use flowrun_core::error::Result;
use flowrun_core::graph::{ExecutionResult, Graph, Node, RunResult};
use flowrun_core::traits::HttpClient;

use crate::aggregate::aggregate;
use crate::context::{NodeInput, RunContext};
use crate::nodes::{ExecContext, NodeRegistry};
use crate::plan::{Chain, ExecutionPlan};
use crate::validate::{validate_and_plan, validate_graph};

/// Error recorded for nodes that never started because the run was
/// cancelled or hit its deadline.
pub const CANCELLED_BEFORE_START: &str = "Run cancelled before node started";

/// Runs validated flow graphs.
///
/// Independent chains run concurrently; nodes within a chain run one at a
/// time in topological order. A failing node never stops the run: its
/// error is recorded and downstream nodes see `null` from it.
pub struct FlowEngine {
    registry: NodeRegistry,
    http: Arc<dyn HttpClient>,
    config: Arc<AppConfig>,
}

impl FlowEngine {
    /// An engine with every built-in node type.
    pub fn new(config: AppConfig, http: Arc<dyn HttpClient>) -> Self {
        Self {
            registry: NodeRegistry::with_builtins(),
            http,
            config: Arc::new(config),
        }
    }

    pub fn with_registry(mut self, registry: NodeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Validate a raw payload, then run it. The payload is validated and
    /// planned exactly once.
    pub async fn execute_payload(&self, payload: &Value, cancel: CancellationToken) -> Result<RunResult> {
        let (graph, plan) = validate_and_plan(payload)?;
        Ok(self.run(&graph, &plan, cancel).await)
    }

    /// Run a graph to completion.
    ///
    /// Only structural problems return `Err`; node failures are reported in
    /// the result. Cancelling `cancel`, or exceeding `engine.max_run_secs`,
    /// aborts in-flight requests and marks unstarted nodes as failed.
    pub async fn execute(&self, graph: &Graph, cancel: CancellationToken) -> Result<RunResult> {
        let plan = validate_graph(graph)?;
        Ok(self.run(graph, &plan, cancel).await)
    }

    async fn run(&self, graph: &Graph, plan: &ExecutionPlan, cancel: CancellationToken) -> RunResult {
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            chains = plan.chains.len(),
            "Starting flow run"
        );

        let token = cancel.child_token();
        let ctx = ExecContext {
            http: self.http.clone(),
            config: self.config.clone(),
            cancel: token.clone(),
        };

        let work = join_all(plan.chains.iter().map(|chain| self.run_chain(graph, chain, &ctx)));
        tokio::pin!(work);
        let deadline = tokio::time::sleep(Duration::from_secs(self.config.engine.max_run_secs));

        let per_chain = tokio::select! {
            outcomes = &mut work => outcomes,
            _ = deadline => {
                warn!(%run_id, max_run_secs = self.config.engine.max_run_secs, "Run deadline reached, cancelling");
                token.cancel();
                work.await
            }
        };

        let total_duration_ms = start.elapsed().as_millis() as u64;
        let result = aggregate(per_chain.into_iter().flatten().collect(), total_duration_ms);

        info!(
            %run_id,
            success = result.success,
            failed = result.results.iter().filter(|r| !r.is_success()).count(),
            total_duration_ms,
            "Flow run complete"
        );
        result
    }

    async fn run_chain(
        &self,
        graph: &Graph,
        chain: &Chain,
        ctx: &ExecContext,
    ) -> Vec<(usize, ExecutionResult)> {
        let mut outputs = RunContext::new();
        let mut results = Vec::with_capacity(chain.steps.len());

        for step in &chain.steps {
            let node = &graph.nodes[step.index];
            let result = if ctx.cancel.is_cancelled() {
                ExecutionResult::failure(&node.id, CANCELLED_BEFORE_START)
            } else {
                let input = outputs.input_for(
                    step.predecessors
                        .iter()
                        .map(|&p| graph.nodes[p].id.as_str()),
                );
                self.run_node(node, &input, ctx).await
            };

            outputs.record(node.id.clone(), result.output.clone().unwrap_or(Value::Null));
            results.push((step.index, result));
        }
        results
    }

    async fn run_node(&self, node: &Node, input: &NodeInput, ctx: &ExecContext) -> ExecutionResult {
        let start = Instant::now();
        let outcome = self.registry.execute(node, input, ctx).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(output) => {
                debug!(node_id = %node.id, node_type = %node.kind, elapsed_ms, "Node succeeded");
                ExecutionResult::success(&node.id, output)
            }
            Err(e) => {
                error!(
                    node_id = %node.id,
                    node_type = %node.kind,
                    name = node.display_name(),
                    elapsed_ms,
                    error = %e,
                    "Node failed"
                );
                ExecutionResult::failure(&node.id, e.to_string())
            }
        }
    }
}
