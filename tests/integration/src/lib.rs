//! Integration tests for the OMP object server.
//!
//! These tests require a running server at `localhost:8080` that trusts the
//! test key. They are marked `#[ignore]` so they don't run during normal
//! `cargo test`.
//!
//! Start the server with the key printed by [`server_keys_json`] and run:
//! ```text
//! OMP_SIG_MODE=strict OMP_SIG_KEYS='{"it-client":"GX9rI-FshTLGq8g4-s1ep4m-DHaykgM0A5v6iz02jWE"}' omp-server
//! cargo test -p omp-integration -- --ignored
//! ```

use std::sync::Once;

use ed25519_dalek::SigningKey;
use omp_auth::keys::encode_public_key;
use omp_auth::{RequestSigner, RequestTarget};
use reqwest::Url;
use reqwest::header::HeaderMap;

static INIT: Once = Once::new();

/// Key identifier the test server must trust.
pub const TEST_KEYID: &str = "it-client";

/// Seed of the key the test server must trust.
const TEST_SEED: [u8; 32] = [42u8; 32];

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
#[must_use]
pub fn endpoint_url() -> String {
    std::env::var("OMP_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:8080".to_owned())
}

/// Absolute URL of `path` on the test server.
#[must_use]
pub fn url(path: &str) -> Url {
    Url::parse(&endpoint_url())
        .and_then(|base| base.join(path))
        .unwrap_or_else(|e| panic!("invalid endpoint URL for {path}: {e}"))
}

/// HTTP client for the test server.
#[must_use]
pub fn client() -> reqwest::Client {
    init_tracing();
    reqwest::Client::new()
}

/// The signing key trusted by the test server.
#[must_use]
pub fn test_key() -> SigningKey {
    SigningKey::from_bytes(&TEST_SEED)
}

/// `OMP_SIG_KEYS` value that makes the server trust [`test_key`].
#[must_use]
pub fn server_keys_json() -> String {
    let public = encode_public_key(&test_key().verifying_key().to_bytes());
    serde_json::json!({ TEST_KEYID: public }).to_string()
}

/// Signature headers for `method url` signed by `signer`.
#[must_use]
pub fn sign_headers(signer: &RequestSigner, method: &str, url: &Url) -> HeaderMap {
    let host = url.host_str().unwrap_or("localhost");
    let authority = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    };
    let target = RequestTarget::new(
        method,
        url.scheme(),
        Some(authority),
        url.path(),
        url.query().map(ToOwned::to_owned),
    );
    let mut headers = HeaderMap::new();
    signer
        .sign(&target, chrono::Utc::now().timestamp())
        .unwrap_or_else(|e| panic!("failed to sign {method} {url}: {e}"))
        .insert_into(&mut headers)
        .unwrap_or_else(|e| panic!("invalid signature headers: {e}"));
    headers
}

/// Signature headers from the trusted test key.
#[must_use]
pub fn signed_headers(method: &str, url: &Url) -> HeaderMap {
    sign_headers(&RequestSigner::new(TEST_KEYID, test_key()), method, url)
}

/// A unique namespace for one test.
#[must_use]
pub fn test_namespace(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// The enforcement mode the server advertises.
pub async fn server_mode(client: &reqwest::Client) -> String {
    let doc: serde_json::Value = client
        .get(url("/.well-known/omp.json"))
        .send()
        .await
        .unwrap_or_else(|e| panic!("discovery request failed: {e}"))
        .json()
        .await
        .unwrap_or_else(|e| panic!("discovery is not JSON: {e}"));
    doc["signatures"]["mode"].as_str().unwrap_or_default().to_owned()
}

/// Store an object with a signed request and return its id.
pub async fn store_object(client: &reqwest::Client, namespace: &str, key: &str) -> String {
    let target = url("/objects");
    let resp = client
        .post(target.clone())
        .headers(signed_headers("POST", &target))
        .json(&serde_json::json!({
            "namespace": namespace,
            "key": key,
            "content": {"title": key},
        }))
        .send()
        .await
        .unwrap_or_else(|e| panic!("store request failed: {e}"));
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    let body: serde_json::Value = resp
        .json()
        .await
        .unwrap_or_else(|e| panic!("store response is not JSON: {e}"));
    body["id"]
        .as_str()
        .unwrap_or_else(|| panic!("no id in {body}"))
        .to_owned()
}

mod test_health;
mod test_objects;
mod test_signatures;

#[cfg(test)]
mod key_tests {
    use super::*;

    #[test]
    fn test_should_publish_documented_test_key() {
        assert_eq!(
            server_keys_json(),
            r#"{"it-client":"GX9rI-FshTLGq8g4-s1ep4m-DHaykgM0A5v6iz02jWE"}"#
        );
    }
}
