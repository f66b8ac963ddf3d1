//! Vault access: authentication, secret reads and raft snapshot export.
//!
//! The rest of the crate talks to Vault only through the capability traits
//! defined here. [`client::VaultStore`] implements all three against a real
//! server; tests substitute mocks.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::AsyncWrite;

/// Credential resolution and the authentication state machine
pub mod auth;

/// Projection of KV secrets into the ambient configuration
pub mod secrets;

/// vaultrs/reqwest backed implementation of the capability traits
pub mod client;

/// Field name to value, as returned by a KV v2 read.
pub type SecretBundle = HashMap<String, serde_json::Value>;

/// Sink the snapshot export writes into.
pub type WriteStream = dyn AsyncWrite + Send + Unpin;

/// How a session was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// Token taken as-is from the environment
    Token,
    /// Issued by a Kubernetes service account login
    Kubernetes { role: String },
}

/// Auth block returned by a successful login.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct LoginResponse {
    pub client_token: String,
    pub accessor: String,
    pub policies: Vec<String>,
    pub lease_duration: u64,
    pub renewable: bool,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("client_token", &"[REDACTED]")
            .field("accessor", &self.accessor)
            .field("policies", &self.policies)
            .field("lease_duration", &self.lease_duration)
            .field("renewable", &self.renewable)
            .finish()
    }
}

/// An authenticated handle for Vault calls.
///
/// Lives for the whole run and is never revoked. Every call after
/// authentication borrows it.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    method: AuthMethod,
    policies: Vec<String>,
    lease_duration: Option<u64>,
}

impl Session {
    /// Session backed by a token already present in the environment.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            method: AuthMethod::Token,
            policies: Vec::new(),
            lease_duration: None,
        }
    }

    /// Session issued by a Kubernetes login.
    pub fn from_login(role: impl Into<String>, login: LoginResponse) -> Self {
        Self {
            token: login.client_token,
            method: AuthMethod::Kubernetes { role: role.into() },
            policies: login.policies,
            lease_duration: Some(login.lease_duration),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn method(&self) -> &AuthMethod {
        &self.method
    }

    pub fn policies(&self) -> &[String] {
        &self.policies
    }

    /// Lease in seconds, when the token came from a login.
    pub fn lease_duration(&self) -> Option<u64> {
        self.lease_duration
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("method", &self.method)
            .field("policies", &self.policies)
            .field("lease_duration", &self.lease_duration)
            .finish()
    }
}

/// Login handshakes against Vault auth methods.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Log in with a service account JWT. `Ok(None)` means Vault answered
    /// without an auth block.
    async fn login_kubernetes(&self, mount: &str, role: &str, jwt: &str) -> Result<Option<LoginResponse>>;
}

/// Reads from a KV v2 secrets engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretReader: Send + Sync {
    async fn read_secret(&self, session: &Session, mount: &str, path: &str) -> Result<SecretBundle>;
}

/// Producer side of the transfer: writes a snapshot into a sink.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Write the full snapshot into `sink` and return the number of bytes
    /// written. Must not close the sink; the caller owns end-of-stream.
    async fn export_snapshot(&self, session: &Session, sink: &mut WriteStream) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_debug_redacts_token() {
        let session = Session::from_token("hvs.CAESIJ3x");
        let rendered = format!("{:?}", session);
        assert!(!rendered.contains("hvs.CAESIJ3x"));
        assert!(rendered.contains("Token"));
    }

    #[test]
    fn test_session_from_login() {
        let login = LoginResponse {
            client_token: "hvs.issued".to_string(),
            accessor: "acc".to_string(),
            policies: vec!["backup".to_string()],
            lease_duration: 3600,
            renewable: true,
        };
        let session = Session::from_login("vault-backup", login);
        assert_eq!(session.token(), "hvs.issued");
        assert_eq!(session.method(), &AuthMethod::Kubernetes { role: "vault-backup".to_string() });
        assert_eq!(session.policies(), ["backup".to_string()]);
        assert_eq!(session.lease_duration(), Some(3600));
    }

    #[test]
    fn test_login_response_debug_redacts_token() {
        let login = LoginResponse { client_token: "hvs.issued".to_string(), ..Default::default() };
        assert!(!format!("{:?}", login).contains("hvs.issued"));
    }
}
