//! Storage port and in-memory adapter.
//!
//! Items are ordered by `(created_at, id)`. A page cursor is the id of the
//! last item the caller has already seen; the next page starts right after it.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::{Map, Value};

use omp_objects_model::output::{ObjectDataOut, ObjectListOut, ObjectOut};

/// Errors from storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// No object with this id.
    #[error("object not found: {0}")]
    NotFound(String),
    /// Replacement content is not a JSON object.
    #[error("content must be an object")]
    InvalidContent,
    /// The cursor does not name a stored object.
    #[error("unknown cursor: {0}")]
    InvalidCursor(String),
}

/// Filter for [`StoragePort::search`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Exact namespace match.
    pub namespace: Option<String>,
    /// Substring the key must contain. Empty matches everything.
    pub key_contains: Option<String>,
}

/// Contract every storage backend implements.
pub trait StoragePort: Send + Sync + std::fmt::Debug {
    /// Create an object; `key` defaults to the generated id.
    fn store(
        &self,
        namespace: String,
        key: Option<String>,
        content: Map<String, Value>,
        metadata: Map<String, Value>,
    ) -> ObjectOut;

    /// Fetch one object with its content.
    fn get(&self, object_id: &str) -> Result<ObjectDataOut, StorageError>;

    /// Remove one object.
    fn delete(&self, object_id: &str) -> Result<(), StorageError>;

    /// Page through all objects.
    fn list(&self, limit: usize, cursor: Option<&str>) -> Result<ObjectListOut, StorageError>;

    /// Page through objects matching `filter`.
    fn search(
        &self,
        filter: &SearchFilter,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<ObjectListOut, StorageError>;

    /// Replace content and, when given, metadata.
    fn update(
        &self,
        object_id: &str,
        content: Value,
        metadata: Option<Map<String, Value>>,
    ) -> Result<ObjectOut, StorageError>;
}

#[derive(Debug, Clone)]
struct StoredObject {
    id: String,
    namespace: String,
    key: String,
    created_at: DateTime<Utc>,
    metadata: Map<String, Value>,
    content: Map<String, Value>,
}

impl StoredObject {
    fn summary(&self) -> ObjectOut {
        ObjectOut {
            id: self.id.clone(),
            namespace: self.namespace.clone(),
            key: self.key.clone(),
            created_at: self.created_at,
            metadata: self.metadata.clone(),
        }
    }

    fn matches(&self, filter: &SearchFilter) -> bool {
        filter.namespace.as_ref().is_none_or(|ns| *ns == self.namespace)
            && filter
                .key_contains
                .as_ref()
                .is_none_or(|needle| self.key.contains(needle.as_str()))
    }
}

/// Ephemeral in-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: DashMap<String, StoredObject>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn page(
        &self,
        filter: &SearchFilter,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<ObjectListOut, StorageError> {
        let mut rows: Vec<StoredObject> = self
            .objects
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));

        let start = match cursor.filter(|c| !c.is_empty()) {
            Some(cursor) => {
                rows.iter()
                    .position(|row| row.id == cursor)
                    .ok_or_else(|| StorageError::InvalidCursor(cursor.to_owned()))?
                    + 1
            }
            None => 0,
        };

        let items = rows
            .iter()
            .skip(start)
            .filter(|row| row.matches(filter))
            .take(limit)
            .map(StoredObject::summary)
            .collect();
        Ok(ObjectListOut::new(items))
    }
}

impl StoragePort for MemoryStorage {
    fn store(
        &self,
        namespace: String,
        key: Option<String>,
        content: Map<String, Value>,
        metadata: Map<String, Value>,
    ) -> ObjectOut {
        let id = uuid::Uuid::new_v4().to_string();
        let object = StoredObject {
            key: key.unwrap_or_else(|| id.clone()),
            id: id.clone(),
            namespace,
            created_at: Utc::now(),
            metadata,
            content,
        };
        let summary = object.summary();
        self.objects.insert(id, object);
        summary
    }

    fn get(&self, object_id: &str) -> Result<ObjectDataOut, StorageError> {
        self.objects
            .get(object_id)
            .map(|entry| ObjectDataOut {
                object: entry.summary(),
                content: entry.content.clone(),
            })
            .ok_or_else(|| StorageError::NotFound(object_id.to_owned()))
    }

    fn delete(&self, object_id: &str) -> Result<(), StorageError> {
        self.objects
            .remove(object_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(object_id.to_owned()))
    }

    fn list(&self, limit: usize, cursor: Option<&str>) -> Result<ObjectListOut, StorageError> {
        self.page(&SearchFilter::default(), limit, cursor)
    }

    fn search(
        &self,
        filter: &SearchFilter,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<ObjectListOut, StorageError> {
        self.page(filter, limit, cursor)
    }

    fn update(
        &self,
        object_id: &str,
        content: Value,
        metadata: Option<Map<String, Value>>,
    ) -> Result<ObjectOut, StorageError> {
        let mut entry = self
            .objects
            .get_mut(object_id)
            .ok_or_else(|| StorageError::NotFound(object_id.to_owned()))?;
        let Value::Object(content) = content else {
            return Err(StorageError::InvalidContent);
        };
        entry.content = content;
        if let Some(metadata) = metadata {
            entry.metadata = metadata;
        }
        Ok(entry.summary())
    }
}
