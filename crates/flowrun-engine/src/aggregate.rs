use flowrun_core::graph::{ExecutionResult, RunResult};

/// Assemble the run result from per-node outcomes.
///
/// Outcomes arrive in completion order tagged with the node's input
/// position; the trace is reordered to input order.
pub fn aggregate(mut outcomes: Vec<(usize, ExecutionResult)>, total_duration_ms: u64) -> RunResult {
    outcomes.sort_by_key(|(index, _)| *index);
    let results: Vec<ExecutionResult> = outcomes.into_iter().map(|(_, r)| r).collect();
    RunResult {
        success: results.iter().all(ExecutionResult::is_success),
        results,
        total_duration_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_restores_input_order() {
        let run = aggregate(
            vec![
                (2, ExecutionResult::success("c", json!(3))),
                (0, ExecutionResult::success("a", json!(1))),
                (1, ExecutionResult::success("b", json!(2))),
            ],
            5,
        );
        let ids: Vec<&str> = run.results.iter().map(|r| r.node_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(run.success);
        assert_eq!(run.total_duration_ms, 5);
    }

    #[test]
    fn test_any_failure_fails_run() {
        let run = aggregate(
            vec![
                (0, ExecutionResult::success("a", json!(null))),
                (1, ExecutionResult::failure("b", "http_request: HTTP 500")),
            ],
            0,
        );
        assert!(!run.success);
    }

    #[test]
    fn test_serialized_shape() {
        let run = aggregate(vec![(0, ExecutionResult::failure("x", "boom"))], 12);
        let body = serde_json::to_value(&run).unwrap();
        assert_eq!(
            body,
            json!({
                "success": false,
                "results": [{"nodeId": "x", "status": "error", "error": "boom"}],
                "totalDurationMs": 12
            })
        );
    }
}
