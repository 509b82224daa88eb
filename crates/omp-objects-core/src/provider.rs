//! Object operations on top of a storage port.

use std::sync::Arc;

use tracing::info;

use omp_objects_model::error::ObjectsError;
use omp_objects_model::input::{
    ListObjectsInput, SearchObjectsInput, StoreObjectInput, UpdateObjectInput,
};
use omp_objects_model::output::{ObjectDataOut, ObjectListOut, ObjectOut};

use crate::error::storage_error_to_objects;
use crate::storage::{MemoryStorage, SearchFilter, StoragePort};

/// Object API provider.
#[derive(Debug, Clone)]
pub struct OmpObjects {
    storage: Arc<dyn StoragePort>,
}

impl Default for OmpObjects {
    fn default() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }
}

impl OmpObjects {
    /// Create a provider over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn StoragePort>) -> Self {
        Self { storage }
    }

    /// Create an object.
    pub fn handle_store_object(
        &self,
        input: StoreObjectInput,
        caller: Option<&str>,
    ) -> Result<ObjectOut, ObjectsError> {
        if input.namespace.is_empty() {
            return Err(ObjectsError::invalid_request(vec![serde_json::json!({
                "loc": ["body", "namespace"],
                "msg": "namespace must not be empty",
            })]));
        }
        let out = self.storage.store(
            input.namespace,
            input.key,
            input.content,
            input.metadata.unwrap_or_default(),
        );
        info!(id = %out.id, namespace = %out.namespace, caller = ?caller, "stored object");
        Ok(out)
    }

    /// Page through all objects.
    pub fn handle_list_objects(&self, input: &ListObjectsInput) -> Result<ObjectListOut, ObjectsError> {
        self.storage
            .list(input.limit(), input.cursor.as_deref())
            .map_err(storage_error_to_objects)
    }

    /// Page through objects matching namespace and key filters.
    pub fn handle_search_objects(
        &self,
        input: &SearchObjectsInput,
    ) -> Result<ObjectListOut, ObjectsError> {
        let filter = SearchFilter {
            namespace: input.namespace.clone(),
            key_contains: input.key_contains.clone().filter(|s| !s.is_empty()),
        };
        self.storage
            .search(&filter, input.limit(), input.cursor.as_deref())
            .map_err(storage_error_to_objects)
    }

    /// Fetch one object.
    pub fn handle_get_object(&self, object_id: &str) -> Result<ObjectDataOut, ObjectsError> {
        self.storage.get(object_id).map_err(storage_error_to_objects)
    }

    /// Replace an object's content.
    pub fn handle_update_object(
        &self,
        object_id: &str,
        input: UpdateObjectInput,
    ) -> Result<ObjectOut, ObjectsError> {
        self.storage
            .update(object_id, input.content, input.metadata)
            .map_err(storage_error_to_objects)
    }

    /// Remove an object.
    pub fn handle_delete_object(
        &self,
        object_id: &str,
        caller: Option<&str>,
    ) -> Result<(), ObjectsError> {
        self.storage
            .delete(object_id)
            .map_err(storage_error_to_objects)?;
        info!(id = %object_id, caller = ?caller, "deleted object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use omp_objects_model::error::ObjectsErrorCode;

    use super::*;

    fn store_input(namespace: &str, key: Option<&str>) -> StoreObjectInput {
        serde_json::from_value(json!({
            "namespace": namespace,
            "key": key,
            "content": {"title": "hello"},
        }))
        .unwrap()
    }

    #[test]
    fn test_should_store_and_fetch_object() {
        let provider = OmpObjects::default();
        let out = provider
            .handle_store_object(store_input("notes", Some("n1")), Some("client-a"))
            .unwrap();
        assert_eq!(out.namespace, "notes");
        assert_eq!(out.key, "n1");
        assert!(out.metadata.is_empty());

        let data = provider.handle_get_object(&out.id).unwrap();
        assert_eq!(data.content["title"], "hello");
    }

    #[test]
    fn test_should_reject_empty_namespace() {
        let provider = OmpObjects::default();
        let err = provider
            .handle_store_object(store_input("", None), None)
            .unwrap_err();
        assert_eq!(err.code, ObjectsErrorCode::BadRequest);
        assert!(err.details.is_some());
    }

    #[test]
    fn test_should_map_missing_object_to_not_found() {
        let provider = OmpObjects::default();
        let err = provider.handle_get_object("missing").unwrap_err();
        assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
        let err = provider.handle_delete_object("missing", None).unwrap_err();
        assert_eq!(err.code, ObjectsErrorCode::NotFound);
    }

    #[test]
    fn test_should_search_with_empty_key_filter() {
        let provider = OmpObjects::default();
        provider.handle_store_object(store_input("a", Some("k1")), None).unwrap();
        provider.handle_store_object(store_input("b", Some("k2")), None).unwrap();

        let input = SearchObjectsInput {
            namespace: Some("a".to_owned()),
            key_contains: Some(String::new()),
            ..SearchObjectsInput::default()
        };
        assert_eq!(provider.handle_search_objects(&input).unwrap().count, 1);

        let all = provider.handle_list_objects(&ListObjectsInput::default()).unwrap();
        assert_eq!(all.count, 2);
    }

    #[test]
    fn test_should_update_and_delete() {
        let provider = OmpObjects::default();
        let out = provider.handle_store_object(store_input("a", None), None).unwrap();
        let input: UpdateObjectInput =
            serde_json::from_value(json!({"content": {"title": "bye"}, "metadata": {"v": 2}}))
                .unwrap();
        let updated = provider.handle_update_object(&out.id, input).unwrap();
        assert_eq!(updated.metadata["v"], 2);

        provider.handle_delete_object(&out.id, Some("client-a")).unwrap();
        assert!(provider.handle_get_object(&out.id).is_err());
    }
}
