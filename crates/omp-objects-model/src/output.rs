//! Object API response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Object summary returned by create, update, list and search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectOut {
    /// Generated identifier.
    pub id: String,
    /// Namespace the object belongs to.
    pub namespace: String,
    /// Caller key, or the id when none was supplied.
    pub key: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Free-form metadata.
    pub metadata: Map<String, Value>,
}

/// Full object returned by `GET /objects/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDataOut {
    /// Summary fields.
    #[serde(flatten)]
    pub object: ObjectOut,
    /// Stored content.
    pub content: Map<String, Value>,
}

/// A page of objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectListOut {
    /// Number of items in this page.
    pub count: usize,
    /// The items.
    pub items: Vec<ObjectOut>,
}

impl ObjectListOut {
    /// Build a page from its items.
    #[must_use]
    pub fn new(items: Vec<ObjectOut>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}
