//! Flow graph validation, planning, and execution.

pub mod aggregate;
pub mod context;
pub mod executor;
pub mod http;
pub mod nodes;
pub mod plan;
pub mod template;
pub mod validate;

pub use aggregate::aggregate;
pub use context::{NodeInput, RunContext};
pub use executor::FlowEngine;
pub use http::ReqwestClient;
pub use nodes::{ExecContext, NodeHandler, NodeRegistry};
pub use plan::{plan, ExecutionPlan};
pub use validate::{validate, validate_and_plan, validate_graph};
