//! Object API model types for the OMP object server.
//!
//! Request and response bodies are plain serde types; the error type renders
//! the `{"error": {code, message, status, details}}` envelope every endpoint
//! uses.
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod input;
pub mod operations;
pub mod output;

pub use error::{ErrorBody, ErrorEnvelope, ObjectsError, ObjectsErrorCode};
pub use operations::ObjectsOperation;
