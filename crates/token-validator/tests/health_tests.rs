//! Health and metrics endpoint integration tests.

use tv_test_utils::{jwks_json, TestHmacKey, TestKeypair, TestTokenBuilder, TestValidatorServer};

#[tokio::test]
async fn test_health_endpoint_reports_key_count() -> Result<(), anyhow::Error> {
    let jwks = jwks_json(&[
        TestKeypair::new(1, "ed-1").jwk_json(),
        TestKeypair::new(2, "ed-2").jwk_json(),
        TestHmacKey::new("hmac-1", b"secret").jwk_json(),
    ]);
    let server = TestValidatorServer::spawn(&jwks).await?;

    let response = reqwest::Client::new()
        .get(format!("{}/v1/health", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    assert!(
        content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json")),
        "Expected application/json content type, got {:?}",
        content_type
    );

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["key_count"], 3);

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let keypair = TestKeypair::new(1, "ed-1");
    let server = TestValidatorServer::spawn(&jwks_json(&[keypair.jwk_json()])).await?;
    let client = reqwest::Client::new();

    let token = TestTokenBuilder::new().sign_ed25519(&keypair);
    client
        .get(server.validate_url())
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await?;

    let response = client
        .get(format!("{}/metrics", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    Ok(())
}

#[tokio::test]
async fn test_spawn_rejects_unusable_key_set() {
    let result = TestValidatorServer::spawn(r#"{"keys":[]}"#).await;
    assert!(result.is_err());

    let result = TestValidatorServer::spawn("not json").await;
    assert!(result.is_err());
}
