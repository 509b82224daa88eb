//! System route integration tests.

#[cfg(test)]
mod tests {
    use crate::{client, url};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_health() {
        let resp = client().get(url("/health")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_serve_discovery_document() {
        let resp = client().get(url("/.well-known/omp.json")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let doc: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(doc["endpoints"]["search"], "/objects/search");
        assert!(doc["limits"]["max_payload_mb"].is_u64());
        assert!(
            ["off", "permissive", "strict"]
                .contains(&doc["signatures"]["mode"].as_str().unwrap())
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_not_found_envelope() {
        let resp = client().get(url("/nope")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(body["error"]["status"], 404);
    }
}
