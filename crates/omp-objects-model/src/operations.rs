//! Object API operation enum.

use std::fmt;

/// All supported object operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectsOperation {
    /// Create an object (`POST /objects`).
    StoreObject,
    /// Page through all objects (`GET /objects`).
    ListObjects,
    /// Filter objects by namespace and key (`GET|POST /objects/search`).
    SearchObjects,
    /// Fetch one object with its content (`GET /objects/{id}`).
    GetObject,
    /// Replace an object's content (`PUT /objects/{id}`).
    UpdateObject,
    /// Remove an object (`DELETE /objects/{id}`).
    DeleteObject,
}

impl ObjectsOperation {
    /// Returns the operation name string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StoreObject => "StoreObject",
            Self::ListObjects => "ListObjects",
            Self::SearchObjects => "SearchObjects",
            Self::GetObject => "GetObject",
            Self::UpdateObject => "UpdateObject",
            Self::DeleteObject => "DeleteObject",
        }
    }

    /// Parse an operation name string into an `ObjectsOperation`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "StoreObject" => Some(Self::StoreObject),
            "ListObjects" => Some(Self::ListObjects),
            "SearchObjects" => Some(Self::SearchObjects),
            "GetObject" => Some(Self::GetObject),
            "UpdateObject" => Some(Self::UpdateObject),
            "DeleteObject" => Some(Self::DeleteObject),
            _ => None,
        }
    }

    /// Whether the operation addresses a single object by id.
    #[must_use]
    pub fn takes_object_id(&self) -> bool {
        matches!(self, Self::GetObject | Self::UpdateObject | Self::DeleteObject)
    }

    /// Status code of a successful response.
    #[must_use]
    pub fn success_status(&self) -> http::StatusCode {
        match self {
            Self::StoreObject => http::StatusCode::CREATED,
            Self::DeleteObject => http::StatusCode::NO_CONTENT,
            _ => http::StatusCode::OK,
        }
    }
}

impl fmt::Display for ObjectsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_round_trip_names() {
        for op in [
            ObjectsOperation::StoreObject,
            ObjectsOperation::ListObjects,
            ObjectsOperation::SearchObjects,
            ObjectsOperation::GetObject,
            ObjectsOperation::UpdateObject,
            ObjectsOperation::DeleteObject,
        ] {
            assert_eq!(ObjectsOperation::from_name(op.as_str()), Some(op));
        }
        assert_eq!(ObjectsOperation::from_name("PutItem"), None);
    }

    #[test]
    fn test_should_report_success_status() {
        assert_eq!(
            ObjectsOperation::StoreObject.success_status(),
            http::StatusCode::CREATED
        );
        assert_eq!(
            ObjectsOperation::DeleteObject.success_status(),
            http::StatusCode::NO_CONTENT
        );
        assert!(ObjectsOperation::GetObject.takes_object_id());
        assert!(!ObjectsOperation::SearchObjects.takes_object_id());
    }
}
