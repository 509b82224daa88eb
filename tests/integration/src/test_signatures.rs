//! Signature enforcement integration tests.
//!
//! The rejection cases only apply when the server runs in strict mode.

#[cfg(test)]
mod tests {
    use ed25519_dalek::SigningKey;
    use omp_auth::RequestSigner;
    use serde_json::{Value, json};

    use crate::{client, server_mode, sign_headers, signed_headers, url};

    fn note() -> Value {
        json!({"namespace": "sig-tests", "content": {"title": "hello"}})
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unsigned_store_in_strict_mode() {
        let client = client();
        if server_mode(&client).await != "strict" {
            return;
        }
        let resp = client.post(url("/objects")).json(&note()).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "unauthorized");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_broken_signature_input() {
        let client = client();
        if server_mode(&client).await == "off" {
            return;
        }
        let resp = client
            .post(url("/objects"))
            .header("signature-input", "sig1=(\"@method\"")
            .header("signature", "sig1=:AAAA:")
            .json(&note())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_hide_unknown_key_behind_generic_rejection() {
        let client = client();
        if server_mode(&client).await != "strict" {
            return;
        }
        let target = url("/objects");
        let stranger = RequestSigner::new("nobody", SigningKey::from_bytes(&[1u8; 32]));
        let resp = client
            .post(target.clone())
            .headers(sign_headers(&stranger, "POST", &target))
            .json(&note())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["message"], "Invalid signature");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_accept_signed_store() {
        let client = client();
        let target = url("/objects");
        let resp = client
            .post(target.clone())
            .headers(signed_headers("POST", &target))
            .json(&note())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        let body: Value = resp.json().await.unwrap();
        assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));
    }
}
