//! Object API integration tests, all requests signed with the test key.

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::{client, signed_headers, store_object, test_namespace, url};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_store_get_update_and_delete() {
        let client = client();
        let ns = test_namespace("crud");
        let id = store_object(&client, &ns, "note-1").await;
        let target = url(&format!("/objects/{id}"));

        let resp = client
            .get(target.clone())
            .headers(signed_headers("GET", &target))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["namespace"], ns.as_str());
        assert_eq!(body["content"]["title"], "note-1");

        let resp = client
            .put(target.clone())
            .headers(signed_headers("PUT", &target))
            .json(&json!({"content": {"title": "edited"}, "metadata": {"rev": 2}}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["metadata"]["rev"], 2);

        let resp = client
            .delete(target.clone())
            .headers(signed_headers("DELETE", &target))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);

        let resp = client
            .get(target.clone())
            .headers(signed_headers("GET", &target))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_search_by_namespace_and_key() {
        let client = client();
        let ns = test_namespace("search");
        store_object(&client, &ns, "alpha").await;
        store_object(&client, &ns, "beta").await;

        let target = url(&format!("/objects/search?namespace={ns}&key_contains=alp"));
        let resp = client
            .get(target.clone())
            .headers(signed_headers("GET", &target))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["items"][0]["key"], "alpha");

        let target = url("/objects/search");
        let resp = client
            .post(target.clone())
            .headers(signed_headers("POST", &target))
            .json(&json!({"namespace": ns}))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["count"], 2);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_invalid_body() {
        let client = client();
        let target = url("/objects");
        let resp = client
            .post(target.clone())
            .headers(signed_headers("POST", &target))
            .json(&json!({"content": {}}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["message"], "Invalid request");
    }
}
