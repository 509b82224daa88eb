//! Handler bridging the HTTP layer to the object provider.

use std::sync::Arc;

use bytes::Bytes;

use omp_objects_http::body::ObjectsResponseBody;
use omp_objects_http::dispatch::{HandlerFuture, ObjectsHandler};
use omp_objects_http::response::{empty_response, serialize_response};
use omp_objects_http::router::ObjectRequest;
use omp_objects_model::error::ObjectsError;
use omp_objects_model::input::SearchObjectsInput;
use omp_objects_model::operations::ObjectsOperation;

use crate::error::decode_error_to_objects;
use crate::provider::OmpObjects;

/// Handler that bridges the HTTP layer to the object provider.
#[derive(Debug)]
pub struct OmpObjectsHandler {
    provider: Arc<OmpObjects>,
}

impl OmpObjectsHandler {
    /// Create a new handler wrapping a provider.
    #[must_use]
    pub fn new(provider: Arc<OmpObjects>) -> Self {
        Self { provider }
    }
}

impl ObjectsHandler for OmpObjectsHandler {
    fn handle_operation(
        &self,
        request: ObjectRequest,
        body: Bytes,
        request_id: &str,
    ) -> HandlerFuture {
        let provider = Arc::clone(&self.provider);
        let request_id = request_id.to_owned();
        Box::pin(async move { dispatch(provider.as_ref(), &request, &body, &request_id) })
    }
}

/// Dispatch an object operation to the appropriate provider method.
fn dispatch(
    provider: &OmpObjects,
    request: &ObjectRequest,
    body: &[u8],
    request_id: &str,
) -> Result<http::Response<ObjectsResponseBody>, ObjectsError> {
    let op = request.operation;
    let status = op.success_status();
    let caller = request.caller.as_deref();

    match op {
        ObjectsOperation::StoreObject => {
            let output = provider.handle_store_object(deserialize(body)?, caller)?;
            serialize_response(status, &output, request_id)
        }
        ObjectsOperation::ListObjects => {
            let output = provider.handle_list_objects(&request.list_input()?)?;
            serialize_response(status, &output, request_id)
        }
        ObjectsOperation::SearchObjects => {
            let input = if body.iter().all(u8::is_ascii_whitespace) {
                request.search_input()?
            } else {
                deserialize::<SearchObjectsInput>(body)?
            };
            let output = provider.handle_search_objects(&input)?;
            serialize_response(status, &output, request_id)
        }
        ObjectsOperation::GetObject => {
            let output = provider.handle_get_object(request.require_object_id()?)?;
            serialize_response(status, &output, request_id)
        }
        ObjectsOperation::UpdateObject => {
            let output =
                provider.handle_update_object(request.require_object_id()?, deserialize(body)?)?;
            serialize_response(status, &output, request_id)
        }
        ObjectsOperation::DeleteObject => {
            provider.handle_delete_object(request.require_object_id()?, caller)?;
            Ok(empty_response(status, request_id))
        }
    }
}

/// Deserialize a JSON request body into the input type.
fn deserialize<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ObjectsError> {
    serde_json::from_slice(body).map_err(decode_error_to_objects)
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    use super::*;

    fn request(method: &str, uri: &str) -> ObjectRequest {
        let method: http::Method = method.parse().unwrap();
        let uri: http::Uri = uri.parse().unwrap();
        match omp_objects_http::router::resolve_route(&method, &uri).unwrap() {
            omp_objects_http::router::Route::Objects(req) => req,
            other => panic!("expected objects route, got {other:?}"),
        }
    }

    async fn call(
        handler: &OmpObjectsHandler,
        method: &str,
        uri: &str,
        body: Value,
    ) -> Result<http::Response<ObjectsResponseBody>, ObjectsError> {
        let bytes = if body.is_null() {
            Bytes::new()
        } else {
            Bytes::from(serde_json::to_vec(&body).unwrap())
        };
        handler
            .handle_operation(request(method, uri), bytes, "req-test")
            .await
    }

    async fn json_body(resp: http::Response<ObjectsResponseBody>) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn handler() -> OmpObjectsHandler {
        OmpObjectsHandler::new(Arc::new(OmpObjects::default()))
    }

    #[tokio::test]
    async fn test_should_store_then_get_object() {
        let handler = handler();
        let resp = call(
            &handler,
            "POST",
            "/objects",
            json!({"namespace": "notes", "content": {"a": 1}}),
        )
        .await
        .unwrap();
        assert_eq!(resp.status(), http::StatusCode::CREATED);
        let created = json_body(resp).await;
        let id = created["id"].as_str().unwrap().to_owned();
        assert_eq!(created["key"], id.as_str());

        let resp = call(&handler, "GET", &format!("/objects/{id}"), Value::Null)
            .await
            .unwrap();
        assert_eq!(resp.status(), http::StatusCode::OK);
        let fetched = json_body(resp).await;
        assert_eq!(fetched["content"]["a"], 1);
        assert_eq!(fetched["namespace"], "notes");
    }

    #[tokio::test]
    async fn test_should_report_decode_errors() {
        let handler = handler();
        let err = call(&handler, "POST", "/objects", json!({"content": {}}))
            .await
            .unwrap_err();
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid request");

        let err = handler
            .handle_operation(request("POST", "/objects"), Bytes::from_static(b"{"), "r")
            .await
            .unwrap_err();
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_should_search_by_query_and_body() {
        let handler = handler();
        for ns in ["a", "a", "b"] {
            call(&handler, "POST", "/objects", json!({"namespace": ns, "content": {}}))
                .await
                .unwrap();
        }

        let resp = call(&handler, "GET", "/objects/search?namespace=a", Value::Null)
            .await
            .unwrap();
        assert_eq!(json_body(resp).await["count"], 2);

        let resp = call(&handler, "POST", "/objects/search", json!({"namespace": "b"}))
            .await
            .unwrap();
        assert_eq!(json_body(resp).await["count"], 1);

        let resp = call(&handler, "POST", "/objects/search", Value::Null)
            .await
            .unwrap();
        assert_eq!(json_body(resp).await["count"], 3);
    }

    #[tokio::test]
    async fn test_should_update_and_delete_object() {
        let handler = handler();
        let created = json_body(
            call(&handler, "POST", "/objects", json!({"namespace": "n", "content": {}}))
                .await
                .unwrap(),
        )
        .await;
        let path = format!("/objects/{}", created["id"].as_str().unwrap());

        let err = call(&handler, "PUT", &path, json!({"content": "text"}))
            .await
            .unwrap_err();
        assert_eq!(err.message, "content must be an object");

        let resp = call(&handler, "PUT", &path, json!({"content": {"b": 2}}))
            .await
            .unwrap();
        assert_eq!(resp.status(), http::StatusCode::OK);

        let resp = call(&handler, "DELETE", &path, Value::Null).await.unwrap();
        assert_eq!(resp.status(), http::StatusCode::NO_CONTENT);

        let err = call(&handler, "GET", &path, Value::Null).await.unwrap_err();
        assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_should_reject_unknown_cursor() {
        let handler = handler();
        let err = call(&handler, "GET", "/objects?cursor=nope", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }
}
