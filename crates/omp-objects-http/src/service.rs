//! Object API HTTP service implementing the hyper `Service` trait.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use tracing::{error, info, warn};

use omp_auth::{AuthError, GateDecision, SignatureGate};
use omp_objects_model::error::ObjectsError;

use crate::body::ObjectsResponseBody;
use crate::discovery::{DiscoveryInfo, discovery_document};
use crate::dispatch::{ObjectsHandler, dispatch_operation};
use crate::exchange::acknowledge;
use crate::response::{
    CONTENT_TYPE, REQUEST_ID_HEADER, auth_error, error_to_response, serialize_response,
};
use crate::router::{Route, resolve_route};

/// Configuration for the object API HTTP service.
#[derive(Clone)]
pub struct ObjectsHttpConfig {
    /// Signature policy applied to every gated route.
    pub gate: Arc<SignatureGate>,
    /// Request body cap in megabytes.
    pub max_payload_mb: u64,
    /// Advertised rate limit.
    pub rate_limit_per_min: u32,
    /// Port advertised in discovery.
    pub port: u16,
}

impl std::fmt::Debug for ObjectsHttpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectsHttpConfig")
            .field("signature_mode", &self.gate.mode())
            .field("max_payload_mb", &self.max_payload_mb)
            .field("rate_limit_per_min", &self.rate_limit_per_min)
            .field("port", &self.port)
            .finish()
    }
}

impl Default for ObjectsHttpConfig {
    fn default() -> Self {
        Self {
            gate: Arc::new(SignatureGate::disabled()),
            max_payload_mb: 5,
            rate_limit_per_min: 60,
            port: 8080,
        }
    }
}

impl ObjectsHttpConfig {
    /// Request body cap in bytes.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        usize::try_from(self.max_payload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }

    fn discovery_info(&self) -> DiscoveryInfo {
        DiscoveryInfo {
            max_payload_mb: self.max_payload_mb,
            rate_limit_per_min: self.rate_limit_per_min,
            port: self.port,
            signature_mode: self.gate.mode().to_string(),
        }
    }
}

/// Hyper `Service` implementation for the object API.
///
/// Wraps an [`ObjectsHandler`] implementation, routes requests, runs the
/// signature gate on `/objects` routes, and renders every failure as the
/// JSON error envelope.
#[derive(Debug)]
pub struct ObjectsHttpService<H: ObjectsHandler> {
    handler: Arc<H>,
    config: Arc<ObjectsHttpConfig>,
}

impl<H: ObjectsHandler> ObjectsHttpService<H> {
    /// Create a new `ObjectsHttpService`.
    pub fn new(handler: Arc<H>, config: ObjectsHttpConfig) -> Self {
        Self {
            handler,
            config: Arc::new(config),
        }
    }

    /// The service configuration.
    #[must_use]
    pub fn config(&self) -> &ObjectsHttpConfig {
        &self.config
    }

    /// Run one request through the full pipeline.
    ///
    /// This is what [`hyper::service::Service::call`] runs; it accepts any body
    /// type so the pipeline can be driven in-process.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<ObjectsResponseBody>
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = uuid::Uuid::new_v4().to_string();
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        let response =
            process_request(req, self.handler.as_ref(), &self.config, &request_id).await;
        let response = add_common_headers(response, &request_id);

        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            "request completed"
        );
        response
    }
}

impl<H: ObjectsHandler> Clone for ObjectsHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: ObjectsHandler> hyper::service::Service<http::Request<Incoming>>
    for ObjectsHttpService<H>
{
    type Response = http::Response<ObjectsResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

/// Process a single request through the full pipeline.
async fn process_request<H, B>(
    req: http::Request<B>,
    handler: &H,
    config: &ObjectsHttpConfig,
    request_id: &str,
) -> http::Response<ObjectsResponseBody>
where
    H: ObjectsHandler,
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, incoming) = req.into_parts();

    // 1. Route.
    let route = match resolve_route(&parts.method, &parts.uri) {
        Ok(route) => route,
        Err(err) => return error_to_response(&err, request_id),
    };

    // 2. Signature gate, before the body is read.
    let caller = if route.is_gated() {
        match config.gate.check(&parts) {
            Ok(GateDecision::Authenticated { keyid, .. }) => Some(keyid),
            Ok(GateDecision::Unauthenticated) => None,
            Err(err) => return reject(&err, request_id),
        }
    } else {
        None
    };

    let mut request = match route {
        Route::Root => {
            return respond(
                &serde_json::json!({"status": "OMP reference server running"}),
                request_id,
            );
        }
        Route::Health => return respond(&serde_json::json!({"status": "ok"}), request_id),
        Route::Discovery => {
            return respond(&discovery_document(&config.discovery_info()), request_id);
        }
        Route::Exchange => {
            return match collect_body(incoming, config.max_body_bytes()).await {
                Ok(body) => exchange_response(&body, caller, request_id),
                Err(err) => error_to_response(&err, request_id),
            };
        }
        Route::Objects(request) => request,
    };
    request.caller = caller;

    // 3. Collect body.
    let body = match collect_body(incoming, config.max_body_bytes()).await {
        Ok(body) => body,
        Err(err) => return error_to_response(&err, request_id),
    };

    // 4. Dispatch to handler.
    match dispatch_operation(handler, request, body, request_id).await {
        Ok(response) => response,
        Err(err) => {
            if err.status_code.is_server_error() {
                error!(request_id = %request_id, error = %err, "object operation failed");
            }
            error_to_response(&err, request_id)
        }
    }
}

fn exchange_response(
    body: &[u8],
    caller: Option<String>,
    request_id: &str,
) -> http::Response<ObjectsResponseBody> {
    acknowledge(body, caller)
        .and_then(|ack| {
            info!(
                request_id = %request_id,
                id = %ack.id,
                capability = %ack.capability,
                "exchange message acknowledged"
            );
            serialize_response(http::StatusCode::OK, &ack, request_id)
        })
        .unwrap_or_else(|err| error_to_response(&err, request_id))
}

fn respond(value: &serde_json::Value, request_id: &str) -> http::Response<ObjectsResponseBody> {
    serialize_response(http::StatusCode::OK, value, request_id)
        .unwrap_or_else(|err| error_to_response(&err, request_id))
}

fn reject(err: &AuthError, request_id: &str) -> http::Response<ObjectsResponseBody> {
    match err {
        AuthError::InternalFault(reason) | AuthError::Configuration(reason) => {
            error!(request_id = %request_id, reason = %reason, "signature verification fault");
        }
        _ => warn!(request_id = %request_id, error = %err, "request rejected by signature gate"),
    }
    error_to_response(&auth_error(err), request_id)
}

/// Collect the incoming body into a single `Bytes` buffer, up to `limit` bytes.
async fn collect_body<B>(incoming: B, limit: usize) -> Result<Bytes, ObjectsError>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    Limited::new(incoming, limit)
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                ObjectsError::bad_request(format!("Request body exceeds {limit} bytes"))
            } else {
                ObjectsError::bad_request(format!("Failed to read request body: {e}"))
            }
        })
}

/// Add common response headers to every response.
fn add_common_headers(
    mut response: http::Response<ObjectsResponseBody>,
    request_id: &str,
) -> http::Response<ObjectsResponseBody> {
    let status = response.status();
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry(REQUEST_ID_HEADER).or_insert(hv);
    }

    if status != http::StatusCode::NO_CONTENT {
        headers
            .entry(http::header::CONTENT_TYPE)
            .or_insert(http::HeaderValue::from_static(CONTENT_TYPE));
    }

    headers.insert("server", http::HeaderValue::from_static("omp-server"));

    response
}
