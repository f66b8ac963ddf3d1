use std::sync::Arc;

use anyhow::{Context, Result};
use log::{log, warn, Level};
use rusoto_core::{HttpClient, Region};
use rusoto_credential::StaticProvider;
use rusoto_s3::S3Client;

use crate::config::S3Settings;
use crate::security::scrub_credentials;

/// Resolve the region, honouring a custom endpoint.
///
/// rusoto addresses custom endpoints path-style, so `AWS_PATHSTYLE` is
/// satisfied whenever an endpoint is set.
pub fn resolve_region(settings: &S3Settings) -> Region {
    let region_name = settings.region.clone().unwrap_or_else(|| "us-east-1".to_string());

    if let Some(endpoint) = &settings.endpoint {
        return Region::Custom {
            name: region_name,
            endpoint: endpoint.clone(),
        };
    }

    match settings.region.as_deref() {
        Some(name) => match name.parse::<Region>() {
            Ok(r) => r,
            Err(_) => {
                warn!("Invalid region '{}', using default", name);
                Region::default()
            }
        },
        None => Region::default(),
    }
}

/// Log lines describing how the client is set up. Credential values are
/// never part of them.
fn client_notes(settings: &S3Settings) -> Vec<(Level, String)> {
    let mut notes = Vec::new();

    match (&settings.endpoint, settings.path_style) {
        (Some(endpoint), false) => notes.push((
            Level::Debug,
            format!(
                "Custom endpoint {} is always addressed path-style; AWS_PATHSTYLE=false is ignored",
                scrub_credentials(endpoint)
            ),
        )),
        (None, true) => notes.push((Level::Debug, "AWS_PATHSTYLE has no effect without AWS_ENDPOINT".to_string())),
        _ => {}
    }

    match &settings.credentials {
        Some(creds) if creds.session_token.is_some() => notes.push((
            Level::Info,
            "Using static AWS credentials with a session token from the ambient configuration".to_string(),
        )),
        Some(_) => notes.push((
            Level::Info,
            "Using static AWS credentials from the ambient configuration".to_string(),
        )),
        None => notes.push((Level::Debug, "Using the default AWS credential provider chain".to_string())),
    }

    notes
}

/// Create an S3 client from the destination settings.
///
/// Static credentials from the ambient configuration win; otherwise the
/// default AWS provider chain is used.
pub fn create_s3_client(settings: &S3Settings) -> Result<Arc<S3Client>> {
    let region = resolve_region(settings);

    for (level, note) in client_notes(settings) {
        log!(level, "{}", note);
    }

    let s3_client = match &settings.credentials {
        Some(creds) => {
            let provider = StaticProvider::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                creds.session_token.clone(),
                None,
            );
            let http = HttpClient::new().context("Failed to create HTTP client")?;
            Arc::new(S3Client::new_with(http, provider, region))
        }
        None => Arc::new(S3Client::new(region)),
    };

    Ok(s3_client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> S3Settings {
        S3Settings {
            bucket: "vault-backups".to_string(),
            endpoint: None,
            path_style: false,
            region: None,
            credentials: None,
        }
    }

    #[test]
    fn test_custom_endpoint_region() {
        let mut s = settings();
        s.endpoint = Some("http://minio.local:9000".to_string());
        s.region = Some("eu-west-1".to_string());

        assert_eq!(
            resolve_region(&s),
            Region::Custom {
                name: "eu-west-1".to_string(),
                endpoint: "http://minio.local:9000".to_string(),
            }
        );
    }

    #[test]
    fn test_named_region() {
        let mut s = settings();
        s.region = Some("eu-central-1".to_string());
        assert_eq!(resolve_region(&s), Region::EuCentral1);
    }

    #[test]
    fn test_invalid_region_falls_back() {
        let mut s = settings();
        s.region = Some("not-a-region".to_string());
        assert_eq!(resolve_region(&s), Region::default());
    }

    #[test]
    fn test_notes_never_contain_credential_values() {
        let mut s = settings();
        s.credentials = Some(crate::config::StaticCredentials {
            access_key_id: "AKIAFROMSECRET00000".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG".to_string(),
            session_token: Some("FwoGZXIvYXdzEJr".to_string()),
        });

        let notes = client_notes(&s);
        assert!(notes.iter().any(|(level, _)| *level == Level::Info));
        for (_, note) in &notes {
            assert!(!note.contains("AKIAFROMSECRET00000"), "{}", note);
            assert!(!note.contains("wJalrXUtnFEMI"), "{}", note);
            assert!(!note.contains("FwoGZXIvYXdzEJr"), "{}", note);
        }
    }

    #[test]
    fn test_notes_flag_ignored_pathstyle_false_with_endpoint() {
        let mut s = settings();
        s.endpoint = Some("https://minio.local:9000".to_string());
        s.path_style = false;

        let notes = client_notes(&s);
        assert!(notes
            .iter()
            .any(|(level, note)| *level == Level::Debug && note.contains("AWS_PATHSTYLE=false is ignored")));

        s.path_style = true;
        assert!(!client_notes(&s).iter().any(|(_, note)| note.contains("AWS_PATHSTYLE")));
    }

    #[test]
    fn test_notes_pathstyle_without_endpoint() {
        let mut s = settings();
        s.path_style = true;
        assert!(client_notes(&s)
            .iter()
            .any(|(_, note)| note == "AWS_PATHSTYLE has no effect without AWS_ENDPOINT"));
    }

    #[tokio::test]
    async fn test_create_client_with_static_credentials() {
        let mut s = settings();
        s.endpoint = Some("http://127.0.0.1:9000".to_string());
        s.credentials = Some(crate::config::StaticCredentials {
            access_key_id: "minio".to_string(),
            secret_access_key: "minio123".to_string(),
            session_token: None,
        });
        assert!(create_s3_client(&s).is_ok());
    }
}
