//! Object handler trait and operation dispatch.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use omp_objects_model::error::ObjectsError;

use crate::body::ObjectsResponseBody;
use crate::router::ObjectRequest;

/// Future returned by [`ObjectsHandler::handle_operation`].
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<ObjectsResponseBody>, ObjectsError>> + Send>>;

/// Trait that the object storage provider must implement.
///
/// The handler receives the routed request and the raw body bytes, and
/// returns a complete HTTP response. The request has already passed the
/// signature gate.
pub trait ObjectsHandler: Send + Sync + 'static {
    /// Handle an object operation and produce an HTTP response.
    fn handle_operation(&self, request: ObjectRequest, body: Bytes, request_id: &str)
    -> HandlerFuture;
}

/// Dispatch an object operation to the handler.
pub async fn dispatch_operation<H: ObjectsHandler>(
    handler: &H,
    request: ObjectRequest,
    body: Bytes,
    request_id: &str,
) -> Result<http::Response<ObjectsResponseBody>, ObjectsError> {
    tracing::debug!(
        operation = %request.operation,
        object_id = ?request.object_id,
        caller = ?request.caller,
        "dispatching object operation"
    );
    handler.handle_operation(request, body, request_id).await
}
