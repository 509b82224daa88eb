//! Object API request bodies and query parameters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Page size used when `limit` is absent.
pub const DEFAULT_LIMIT: usize = 50;

/// Body of `POST /objects`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreObjectInput {
    /// Logical bucket the object belongs to.
    pub namespace: String,
    /// Caller-supplied key; the generated id is used when absent.
    #[serde(default)]
    pub key: Option<String>,
    /// Arbitrary structured payload.
    pub content: Map<String, Value>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// Body of `PUT /objects/{id}`.
///
/// `content` is kept as a raw value so a non-object payload is reported as
/// `content must be an object` rather than a generic decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateObjectInput {
    /// Replacement content; must be a JSON object.
    pub content: Value,
    /// Replacement metadata; existing metadata is kept when absent.
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// Query of `GET /objects`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListObjectsInput {
    /// Maximum number of items, default [`DEFAULT_LIMIT`].
    #[serde(default)]
    pub limit: Option<usize>,
    /// Id of the last item already seen.
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Query of `GET /objects/search` or body of `POST /objects/search`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchObjectsInput {
    /// Exact namespace match.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Substring the key must contain.
    #[serde(default)]
    pub key_contains: Option<String>,
    /// Maximum number of items, default [`DEFAULT_LIMIT`].
    #[serde(default)]
    pub limit: Option<usize>,
    /// Id of the last item already seen.
    #[serde(default)]
    pub cursor: Option<String>,
}

impl ListObjectsInput {
    /// Effective page size.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

impl SearchObjectsInput {
    /// Effective page size.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}
