use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::{OutboundRequest, OutboundResponse};

/// Outbound HTTP client used by network-bound nodes.
///
/// Injected into the engine so tests can substitute a fake. Implementations
/// return `Ok` for any response that arrived, whatever its status code;
/// transport failures are `Err`.
pub trait HttpClient: Send + Sync + 'static {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Result<OutboundResponse>>;
}
