//! Integration tests for projecting a Vault secret into the S3 settings.

mod common;

use std::collections::HashMap;

use serde_json::json;

use vault_backup::config::{AmbientConfig, S3Settings};
use vault_backup::vault::secrets::{materialize, SecretLocation};
use vault_backup::vault::Session;

use common::StaticSecretReader;

fn reader() -> StaticSecretReader {
    let mut bundle = HashMap::new();
    bundle.insert("AWS_BUCKET".to_string(), json!("vault-backups"));
    bundle.insert("AWS_ACCESS_KEY_ID".to_string(), json!("AKIAFROMSECRET00000"));
    bundle.insert("AWS_SECRET_ACCESS_KEY".to_string(), json!("from-secret"));
    bundle.insert("AWS_PATHSTYLE".to_string(), json!(true));

    StaticSecretReader {
        mount: "secret".to_string(),
        path: "backup/s3".to_string(),
        bundle,
    }
}

#[tokio::test]
async fn test_secret_supplies_destination_settings() {
    let mut ambient = AmbientConfig::from_pairs([
        ("AWS_ACCESS_KEY_ID", "AKIAFROMPARENT00000"),
        ("AWS_ENDPOINT", "http://minio.local:9000"),
    ]);

    let report = materialize(
        &reader(),
        &Session::from_token("hvs.test"),
        &SecretLocation::new("secret", "backup/s3"),
        &mut ambient,
    )
    .await
    .unwrap();

    assert_eq!(report.applied, vec!["AWS_ACCESS_KEY_ID", "AWS_BUCKET", "AWS_SECRET_ACCESS_KEY"]);
    assert_eq!(report.skipped, vec!["AWS_PATHSTYLE"]);

    let settings = S3Settings::from_ambient(&ambient).unwrap();
    assert_eq!(settings.bucket, "vault-backups");
    assert_eq!(settings.endpoint.as_deref(), Some("http://minio.local:9000"));
    // Boolean secret values are not strings and are skipped.
    assert!(!settings.path_style);

    let creds = settings.credentials.unwrap();
    assert_eq!(creds.access_key_id, "AKIAFROMSECRET00000");
    assert_eq!(creds.secret_access_key, "from-secret");
}

#[tokio::test]
async fn test_missing_secret_is_secret_fetch_error() {
    let mut ambient = AmbientConfig::default();

    let err = materialize(
        &reader(),
        &Session::from_token("hvs.test"),
        &SecretLocation::new("secret", "backup/missing"),
        &mut ambient,
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), "secret_fetch");
    assert!(err.to_string().contains("secret/backup/missing"));
    assert!(ambient.override_keys().is_empty());
}

#[tokio::test]
async fn test_no_secret_path_leaves_bucket_unset() {
    let mut ambient = AmbientConfig::default();

    let report = materialize(
        &reader(),
        &Session::from_token("hvs.test"),
        &SecretLocation::new("secret", ""),
        &mut ambient,
    )
    .await
    .unwrap();

    assert!(report.applied.is_empty());
    let err = S3Settings::from_ambient(&ambient).unwrap_err();
    assert_eq!(err.to_string(), "Configuration error: 'AWS_BUCKET' not set");
}
