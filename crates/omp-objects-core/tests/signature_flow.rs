//! End-to-end signature scenarios driven through the object service in-process.

use std::sync::Arc;

use bytes::Bytes;
use ed25519_dalek::SigningKey;
use http_body_util::{BodyExt, Full};
use omp_auth::keys::encode_public_key;
use omp_auth::{RequestSigner, RequestTarget};
use omp_objects_core::{ObjectsConfig, OmpObjects, OmpObjectsHandler};
use omp_objects_http::body::ObjectsResponseBody;
use omp_objects_http::{ObjectsHttpConfig, ObjectsHttpService};
use serde_json::{Value, json};

const KEYID: &str = "client-1";
const HOST: &str = "localhost:8080";

fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[9u8; 32])
}

fn service(vars: &[(&str, &str)]) -> ObjectsHttpService<OmpObjectsHandler> {
    let config = ObjectsConfig::from_vars(
        vars.iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned())),
    )
    .unwrap();
    let handler = OmpObjectsHandler::new(Arc::new(OmpObjects::default()));
    ObjectsHttpService::new(
        Arc::new(handler),
        ObjectsHttpConfig {
            gate: Arc::new(config.signature_gate()),
            ..ObjectsHttpConfig::default()
        },
    )
}

fn strict_service() -> ObjectsHttpService<OmpObjectsHandler> {
    let public = encode_public_key(&signing_key().verifying_key().to_bytes());
    let keys = json!({ KEYID: public }).to_string();
    service(&[("OMP_SIG_MODE", "strict"), ("OMP_SIG_KEYS", keys.as_str())])
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn request(method: &str, path: &str, host: &str, body: &Value) -> http::Request<Full<Bytes>> {
    let bytes = if body.is_null() {
        Bytes::new()
    } else {
        Bytes::from(serde_json::to_vec(body).unwrap())
    };
    http::Request::builder()
        .method(method)
        .uri(path)
        .header(http::header::HOST, host)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Full::new(bytes))
        .unwrap()
}

/// Sign `req` as if the client had addressed `authority` and `path`.
fn sign_as(
    mut req: http::Request<Full<Bytes>>,
    signer: &RequestSigner,
    authority: &str,
    path: &str,
) -> http::Request<Full<Bytes>> {
    let target = RequestTarget::new(
        req.method().as_str(),
        "http",
        Some(authority.to_owned()),
        path,
        req.uri().query().map(ToOwned::to_owned),
    );
    signer
        .sign(&target, now())
        .unwrap()
        .insert_into(req.headers_mut())
        .unwrap();
    req
}

fn signed(req: http::Request<Full<Bytes>>) -> http::Request<Full<Bytes>> {
    let path = req.uri().path().to_owned();
    let signer = RequestSigner::new(KEYID, signing_key());
    sign_as(req, &signer, HOST, &path)
}

async fn json_body(resp: http::Response<ObjectsResponseBody>) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn note() -> Value {
    json!({"namespace": "notes", "content": {"title": "hello"}})
}

#[tokio::test]
async fn test_should_reject_unsigned_request_in_strict_mode() {
    let resp = strict_service()
        .handle(request("POST", "/objects", HOST, &note()))
        .await;
    assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
    let body = json_body(resp).await;
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn test_should_reject_broken_signature_input_with_bad_request() {
    let mut req = request("POST", "/objects", HOST, &note());
    req.headers_mut().insert(
        "signature-input",
        http::HeaderValue::from_static("sig1=(\"@method\" \"@path\";keyid=\"client-1\""),
    );
    req.headers_mut()
        .insert("signature", http::HeaderValue::from_static("sig1=:AAAA:"));
    let resp = strict_service().handle(req).await;
    assert_eq!(resp.status(), http::StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_should_not_distinguish_unknown_key_from_mismatch() {
    let svc = strict_service();

    let stranger = RequestSigner::new("stranger", signing_key());
    let unknown = svc
        .handle(sign_as(request("POST", "/objects", HOST, &note()), &stranger, HOST, "/objects"))
        .await;

    let impostor = RequestSigner::new(KEYID, SigningKey::from_bytes(&[3u8; 32]));
    let mismatch = svc
        .handle(sign_as(request("POST", "/objects", HOST, &note()), &impostor, HOST, "/objects"))
        .await;

    assert_eq!(unknown.status(), http::StatusCode::UNAUTHORIZED);
    assert_eq!(mismatch.status(), http::StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(unknown).await, json_body(mismatch).await);
}

#[tokio::test]
async fn test_should_accept_correctly_signed_store() {
    let resp = strict_service()
        .handle(signed(request("POST", "/objects", HOST, &note())))
        .await;
    assert_eq!(resp.status(), http::StatusCode::CREATED);
    let body = json_body(resp).await;
    assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(body["namespace"], "notes");
}

#[tokio::test]
async fn test_should_tolerate_trailing_slash_and_default_port() {
    let svc = strict_service();
    let signer = RequestSigner::new(KEYID, signing_key());

    // Signed without the slash, sent with it.
    let req = sign_as(request("POST", "/objects/", HOST, &note()), &signer, HOST, "/objects");
    assert_eq!(svc.handle(req).await.status(), http::StatusCode::CREATED);

    // Signed with an explicit default port, sent without it.
    let req = sign_as(
        request("POST", "/objects", "localhost", &note()),
        &signer,
        "localhost:80",
        "/objects",
    );
    assert_eq!(svc.handle(req).await.status(), http::StatusCode::CREATED);

    // A different port is not a tolerated variant.
    let req = sign_as(
        request("POST", "/objects", HOST, &note()),
        &signer,
        "localhost:9090",
        "/objects",
    );
    assert_eq!(svc.handle(req).await.status(), http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_should_let_permissive_mode_through_without_signature() {
    let svc = service(&[("OMP_SIG_MODE", "permissive")]);
    let resp = svc.handle(request("POST", "/objects", HOST, &note())).await;
    assert_eq!(resp.status(), http::StatusCode::CREATED);

    let signer = RequestSigner::new(KEYID, signing_key());
    let resp = svc
        .handle(sign_as(request("POST", "/objects", HOST, &note()), &signer, HOST, "/objects"))
        .await;
    assert_eq!(resp.status(), http::StatusCode::CREATED);
}

#[tokio::test]
async fn test_should_run_signed_crud_flow() {
    let svc = strict_service();

    let created = json_body(svc.handle(signed(request("POST", "/objects", HOST, &note()))).await).await;
    let id = created["id"].as_str().unwrap().to_owned();
    let path = format!("/objects/{id}");

    let resp = svc.handle(signed(request("GET", &path, HOST, &Value::Null))).await;
    assert_eq!(resp.status(), http::StatusCode::OK);
    assert_eq!(json_body(resp).await["content"]["title"], "hello");

    let resp = svc
        .handle(signed(request(
            "PUT",
            &path,
            HOST,
            &json!({"content": {"title": "bye"}}),
        )))
        .await;
    assert_eq!(resp.status(), http::StatusCode::OK);

    let resp = svc
        .handle(signed(request("GET", "/objects/search?namespace=notes", HOST, &Value::Null)))
        .await;
    assert_eq!(json_body(resp).await["count"], 1);

    let resp = svc.handle(signed(request("DELETE", &path, HOST, &Value::Null))).await;
    assert_eq!(resp.status(), http::StatusCode::NO_CONTENT);
    assert!(resp.headers().get(http::header::CONTENT_TYPE).is_none());

    let resp = svc.handle(signed(request("GET", &path, HOST, &Value::Null))).await;
    assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);
}
