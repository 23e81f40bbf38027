//! The HTTP carrier, end to end.

use serde_json::json;

use crate::common::{response, Signer, TestEnv, Wrapping, ASSERTION};

/// Tests that the health endpoint answers.
#[tokio::test]
async fn test_health() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let response = env
        .client
        .get(format!("{}/health", env.base_url))
        .send()
        .await?;
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "healthy");
    Ok(())
}

/// The logout scenario over HTTP.
#[tokio::test]
async fn test_slo_over_http() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let (status, body) = env
        .post(json!({
            "action": "generate-slo-request",
            "NameID": "user-42",
            "SessionIndex": "sess-7",
            "IDP": "idp-a"
        }))
        .await?;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    let url = body["slo"].as_str().unwrap_or_default();
    assert!(url.starts_with("https://idp.example/slo?SAMLRequest="), "{url}");
    assert!(url.ends_with("&RelayState=NULL"), "{url}");
    Ok(())
}

/// Validation and decryption of a signed, encrypted response over HTTP.
#[tokio::test]
async fn test_validate_signature_decrypt_over_http() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let inner = Wrapping::OaepSha256Aes256Gcm.encrypt_into("EncryptedAssertion", ASSERTION);
    let signed = Signer::idp_a().sign(&response("idp-a", &inner), "r1");

    let (status, body) = env
        .post(json!({ "action": "validate-signature-decrypt", "response": signed }))
        .await?;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["valid"], true);
    assert!(body["assertion"]
        .as_str()
        .unwrap_or_default()
        .contains("user@example.org"));

    let tampered = signed.replace("Success", "Responder");
    let (status, body) = env
        .post(json!({ "action": "validate-signature", "response": tampered }))
        .await?;
    assert_eq!(status, 200);
    assert_eq!(body["valid"], false);
    Ok(())
}

/// Error replies carry a code, a message and a matching HTTP status.
#[tokio::test]
async fn test_error_replies() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let (status, body) = env
        .post(json!({ "action": "validate-signature", "response": "" }))
        .await?;
    assert_eq!(status, 400);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "invalid_request");
    assert!(body["message"].is_string());

    let (status, body) = env.post(json!({ "action": "sign-everything" })).await?;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "unsupported_action");

    let (status, body) = env
        .post(json!({ "action": "generate-authn-request", "IDP": "idp-z" }))
        .await?;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "unknown_idp");
    Ok(())
}
