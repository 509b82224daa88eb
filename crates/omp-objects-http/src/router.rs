//! Request router.
//!
//! Routes are matched on method and path. A single trailing slash is ignored
//! so `/objects/` reaches the same handler as `/objects`:
//!
//! ```text
//! GET    /                       -> Root
//! GET    /health                 -> Health
//! GET    /.well-known/omp.json   -> Discovery
//! POST   /exchange               -> Exchange
//! POST   /objects                -> StoreObject
//! GET    /objects                -> ListObjects
//! GET    /objects/search         -> SearchObjects (query string)
//! POST   /objects/search         -> SearchObjects (JSON body)
//! GET    /objects/{id}           -> GetObject
//! PUT    /objects/{id}           -> UpdateObject
//! DELETE /objects/{id}           -> DeleteObject
//! ```

use omp_objects_model::error::ObjectsError;
use omp_objects_model::input::{ListObjectsInput, SearchObjectsInput};
use omp_objects_model::operations::ObjectsOperation;

/// Prefix of the object API routes.
pub const OBJECTS_PREFIX: &str = "/objects";

/// A resolved route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Server banner.
    Root,
    /// Liveness check.
    Health,
    /// Discovery document.
    Discovery,
    /// Agent message acknowledgement.
    Exchange,
    /// An object API call.
    Objects(ObjectRequest),
}

/// An object API call extracted from the request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRequest {
    /// The operation.
    pub operation: ObjectsOperation,
    /// Object id for single-object operations.
    pub object_id: Option<String>,
    /// Decoded query parameters in request order.
    pub query: Vec<(String, String)>,
    /// Key identifier of the verified signature, if any.
    pub caller: Option<String>,
}

impl ObjectRequest {
    fn new(operation: ObjectsOperation, object_id: Option<String>, query: Option<&str>) -> Self {
        Self {
            operation,
            object_id,
            query: query
                .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
                .unwrap_or_default(),
            caller: None,
        }
    }

    /// Last value of query parameter `name`.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The object id, for operations that require one.
    pub fn require_object_id(&self) -> Result<&str, ObjectsError> {
        self.object_id
            .as_deref()
            .ok_or_else(|| ObjectsError::bad_request("Missing object id"))
    }

    /// Listing parameters from the query string.
    pub fn list_input(&self) -> Result<ListObjectsInput, ObjectsError> {
        Ok(ListObjectsInput {
            limit: self.limit()?,
            cursor: self.query_param("cursor").map(ToOwned::to_owned),
        })
    }

    /// Search parameters from the query string.
    pub fn search_input(&self) -> Result<SearchObjectsInput, ObjectsError> {
        Ok(SearchObjectsInput {
            namespace: self.query_param("namespace").map(ToOwned::to_owned),
            key_contains: self.query_param("key_contains").map(ToOwned::to_owned),
            limit: self.limit()?,
            cursor: self.query_param("cursor").map(ToOwned::to_owned),
        })
    }

    fn limit(&self) -> Result<Option<usize>, ObjectsError> {
        self.query_param("limit")
            .map(|raw| {
                raw.trim().parse::<usize>().map_err(|_| {
                    ObjectsError::invalid_request(vec![serde_json::json!({
                        "loc": ["query", "limit"],
                        "msg": "limit must be a non-negative integer",
                        "input": raw,
                    })])
                })
            })
            .transpose()
    }
}

impl Route {
    /// Whether the route passes through the signature gate.
    #[must_use]
    pub fn is_gated(&self) -> bool {
        matches!(self, Self::Exchange | Self::Objects(_))
    }
}

/// Resolve a route from the request method and URI.
pub fn resolve_route(method: &http::Method, uri: &http::Uri) -> Result<Route, ObjectsError> {
    let path = uri.path();
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    let segments: Vec<&str> = trimmed.split('/').skip(1).collect();

    let route = match (method, segments.as_slice()) {
        (&http::Method::GET, []) => Some(Route::Root),
        (&http::Method::GET, ["health"]) => Some(Route::Health),
        (&http::Method::GET, [".well-known", "omp.json"]) => Some(Route::Discovery),
        (&http::Method::POST, ["exchange"]) => Some(Route::Exchange),
        (_, ["objects", rest @ ..]) => {
            resolve_objects(method, rest).map(|(op, id)| {
                Route::Objects(ObjectRequest::new(op, id, uri.query()))
            })
        }
        _ => None,
    };

    route.ok_or_else(|| ObjectsError::unknown_route(method, path))
}

fn resolve_objects(
    method: &http::Method,
    rest: &[&str],
) -> Option<(ObjectsOperation, Option<String>)> {
    match (method, rest) {
        (&http::Method::POST, []) => Some((ObjectsOperation::StoreObject, None)),
        (&http::Method::GET, []) => Some((ObjectsOperation::ListObjects, None)),
        (&http::Method::GET | &http::Method::POST, ["search"]) => {
            Some((ObjectsOperation::SearchObjects, None))
        }
        (&http::Method::GET, [id]) if !id.is_empty() => {
            Some((ObjectsOperation::GetObject, Some((*id).to_owned())))
        }
        (&http::Method::PUT, [id]) if !id.is_empty() => {
            Some((ObjectsOperation::UpdateObject, Some((*id).to_owned())))
        }
        (&http::Method::DELETE, [id]) if !id.is_empty() => {
            Some((ObjectsOperation::DeleteObject, Some((*id).to_owned())))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use omp_objects_model::error::ObjectsErrorCode;

    use super::*;

    fn route(method: &str, uri: &str) -> Result<Route, ObjectsError> {
        let method: http::Method = method.parse().unwrap();
        let uri: http::Uri = uri.parse().unwrap();
        resolve_route(&method, &uri)
    }

    fn objects(method: &str, uri: &str) -> ObjectRequest {
        match route(method, uri).unwrap() {
            Route::Objects(req) => req,
            other => panic!("expected objects route, got {other:?}"),
        }
    }

    #[test]
    fn test_should_resolve_system_routes() {
        assert_eq!(route("GET", "/").unwrap(), Route::Root);
        assert_eq!(route("GET", "/health").unwrap(), Route::Health);
        assert_eq!(route("GET", "/.well-known/omp.json").unwrap(), Route::Discovery);
        assert!(!Route::Health.is_gated());
    }

    #[test]
    fn test_should_gate_exchange_and_object_routes_only() {
        assert_eq!(route("POST", "/exchange/").unwrap(), Route::Exchange);
        assert!(route("GET", "/exchange").is_err());
        assert!(route("POST", "/exchange").unwrap().is_gated());
        assert!(route("DELETE", "/objects/abc").unwrap().is_gated());
        for (method, uri) in [("GET", "/"), ("GET", "/health"), ("GET", "/.well-known/omp.json")] {
            assert!(!route(method, uri).unwrap().is_gated(), "{method} {uri}");
        }
    }

    #[test]
    fn test_should_resolve_all_object_operations() {
        let cases = [
            ("POST", "/objects", ObjectsOperation::StoreObject),
            ("GET", "/objects", ObjectsOperation::ListObjects),
            ("GET", "/objects/search", ObjectsOperation::SearchObjects),
            ("POST", "/objects/search", ObjectsOperation::SearchObjects),
            ("GET", "/objects/abc", ObjectsOperation::GetObject),
            ("PUT", "/objects/abc", ObjectsOperation::UpdateObject),
            ("DELETE", "/objects/abc", ObjectsOperation::DeleteObject),
        ];
        for (method, uri, expected) in cases {
            let req = objects(method, uri);
            assert_eq!(req.operation, expected, "failed for {method} {uri}");
            assert_eq!(req.object_id.is_some(), expected.takes_object_id());
        }
    }

    #[test]
    fn test_should_ignore_single_trailing_slash() {
        assert_eq!(
            objects("POST", "/objects/").operation,
            ObjectsOperation::StoreObject
        );
        assert_eq!(objects("GET", "/objects/abc/").object_id.as_deref(), Some("abc"));
        assert!(route("POST", "/objects//").is_err());
    }

    #[test]
    fn test_should_return_not_found_for_unknown_routes() {
        for (method, uri) in [
            ("GET", "/nope"),
            ("PATCH", "/objects/abc"),
            ("DELETE", "/objects"),
            ("GET", "/objects/a/b"),
            ("POST", "/health"),
        ] {
            let err = route(method, uri).unwrap_err();
            assert_eq!(err.code, ObjectsErrorCode::NotFound, "{method} {uri}");
        }
    }

    #[test]
    fn test_should_parse_query_parameters() {
        let req = objects("GET", "/objects/search?namespace=a%20b&key_contains=x&limit=5&cursor=c1");
        let input = req.search_input().unwrap();
        assert_eq!(input.namespace.as_deref(), Some("a b"));
        assert_eq!(input.key_contains.as_deref(), Some("x"));
        assert_eq!(input.limit, Some(5));
        assert_eq!(input.cursor.as_deref(), Some("c1"));
    }

    #[test]
    fn test_should_reject_bad_limit() {
        let err = objects("GET", "/objects?limit=ten").list_input().unwrap_err();
        assert_eq!(err.code, ObjectsErrorCode::BadRequest);
        assert_eq!(err.message, "Invalid request");
    }
}
