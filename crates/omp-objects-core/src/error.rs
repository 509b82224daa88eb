//! Conversions from storage errors to API errors.

use omp_objects_model::error::ObjectsError;

use crate::storage::StorageError;

/// Convert a storage error into the error reported to the caller.
///
/// Takes `e` by value because this is used as a closure argument to `.map_err()`.
#[must_use]
#[allow(clippy::needless_pass_by_value)]
pub fn storage_error_to_objects(e: StorageError) -> ObjectsError {
    match e {
        StorageError::NotFound(_) => ObjectsError::not_found("Object not found"),
        StorageError::InvalidContent => ObjectsError::bad_request(e.to_string()),
        StorageError::InvalidCursor(cursor) => ObjectsError::invalid_request(vec![
            serde_json::json!({
                "loc": ["query", "cursor"],
                "msg": "cursor does not match a stored object",
                "input": cursor,
            }),
        ]),
    }
}

/// Convert a body decode failure into a 400 `Invalid request` error.
#[must_use]
#[allow(clippy::needless_pass_by_value)]
pub fn decode_error_to_objects(e: serde_json::Error) -> ObjectsError {
    ObjectsError::invalid_request(vec![serde_json::json!({
        "loc": ["body"],
        "msg": e.to_string(),
        "line": e.line(),
        "column": e.column(),
    })])
}
