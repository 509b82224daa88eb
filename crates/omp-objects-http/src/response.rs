//! JSON responses and error envelope formatting.

use omp_auth::AuthError;
use omp_objects_model::error::{ObjectsError, ObjectsErrorCode};
use serde::Serialize;

use crate::body::ObjectsResponseBody;

/// Content type of every non-empty response.
pub const CONTENT_TYPE: &str = "application/json";

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Serialize an error into its JSON envelope:
///
/// ```json
/// {"error": {"code": "unauthorized", "message": "Invalid signature", "status": 401, "details": null}}
/// ```
#[must_use]
pub fn error_to_json(error: &ObjectsError) -> Vec<u8> {
    serde_json::to_vec(&error.to_envelope()).expect("JSON serialization of error cannot fail")
}

/// Convert an `ObjectsError` into a complete HTTP error response.
#[must_use]
pub fn error_to_response(
    error: &ObjectsError,
    request_id: &str,
) -> http::Response<ObjectsResponseBody> {
    http::Response::builder()
        .status(error.status_code)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .header(REQUEST_ID_HEADER, request_id)
        .body(ObjectsResponseBody::from_bytes(error_to_json(error)))
        .expect("valid error response")
}

/// Build a response from JSON bytes.
#[must_use]
pub fn json_response(
    status: http::StatusCode,
    json: Vec<u8>,
    request_id: &str,
) -> http::Response<ObjectsResponseBody> {
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .header(REQUEST_ID_HEADER, request_id)
        .body(ObjectsResponseBody::from_bytes(json))
        .expect("valid JSON response")
}

/// Serialize `value` and build a response from it.
pub fn serialize_response<T: Serialize>(
    status: http::StatusCode,
    value: &T,
    request_id: &str,
) -> Result<http::Response<ObjectsResponseBody>, ObjectsError> {
    let json = serde_json::to_vec(value).map_err(|e| {
        ObjectsError::internal_error(format!("Failed to serialize response: {e}"))
    })?;
    Ok(json_response(status, json, request_id))
}

/// Build a bodiless response.
#[must_use]
pub fn empty_response(
    status: http::StatusCode,
    request_id: &str,
) -> http::Response<ObjectsResponseBody> {
    http::Response::builder()
        .status(status)
        .header(REQUEST_ID_HEADER, request_id)
        .body(ObjectsResponseBody::empty())
        .expect("valid empty response")
}

/// Map a signature failure to the error reported to the caller.
///
/// Unknown keys and mismatches share one message. Internal faults keep their
/// reason out of the response.
#[must_use]
pub fn auth_error(err: &AuthError) -> ObjectsError {
    let code = ObjectsErrorCode::from_status(err.status_code());
    let mut error = ObjectsError::with_message(code, err.to_string());
    error.status_code = err.status_code();
    error
}
