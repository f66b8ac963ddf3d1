use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::AmbientConfig;
use crate::constants::*;
use crate::error::{BackupError, Result};
use crate::vault::{AuthBackend, Session};

/// Authentication options as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOptions {
    pub mode: String,
    pub service_account_token_path: PathBuf,
    pub kubernetes_mount: String,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            mode: AUTH_MODE_TOKEN.to_string(),
            service_account_token_path: PathBuf::from(DEFAULT_SERVICE_ACCOUNT_TOKEN_PATH),
            kubernetes_mount: DEFAULT_KUBERNETES_AUTH_MOUNT.to_string(),
        }
    }
}

/// The single authentication strategy active for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStrategy {
    /// Use VAULT_TOKEN from the environment
    Token,
    /// Exchange a service account JWT for a Vault token
    Kubernetes {
        role: String,
        service_account_token_path: PathBuf,
        mount: String,
    },
}

impl AuthStrategy {
    /// Pick the strategy for `options.mode`. Only configuration is checked
    /// here; nothing touches the network or the filesystem.
    pub fn select(options: &AuthOptions, ambient: &AmbientConfig) -> Result<Self> {
        match options.mode.as_str() {
            "" => Err(BackupError::config("-authMode not set, set to token or kubernetes")),
            AUTH_MODE_TOKEN => Ok(Self::Token),
            AUTH_MODE_KUBERNETES => {
                let role = ambient
                    .get_owned(ENV_VAULT_ROLE)
                    .ok_or_else(|| BackupError::config(format!("Vault: env. variable {} not set", ENV_VAULT_ROLE)))?;
                Ok(Self::Kubernetes {
                    role,
                    service_account_token_path: options.service_account_token_path.clone(),
                    mount: options.kubernetes_mount.clone(),
                })
            }
            other => Err(BackupError::config(format!(
                "authMode '{}' unknown, set to token or kubernetes",
                other
            ))),
        }
    }
}

/// Where the resolver is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolverState {
    Unauthenticated,
    Authenticating,
    Authenticated(Session),
    /// Terminal. Later calls return the same error without doing any work.
    Failed(BackupError),
}

/// Produces the run's [`Session`], or fails fast.
///
/// `Unauthenticated -> Authenticating -> Authenticated | Failed`. There are
/// no retries and no way out of `Failed`.
#[derive(Debug)]
pub struct CredentialResolver {
    state: ResolverState,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialResolver {
    pub fn new() -> Self {
        Self { state: ResolverState::Unauthenticated }
    }

    pub fn state(&self) -> &ResolverState {
        &self.state
    }

    /// Select and run the configured strategy.
    pub async fn resolve<B>(
        &mut self,
        options: &AuthOptions,
        ambient: &AmbientConfig,
        backend: &B,
    ) -> Result<Session>
    where
        B: AuthBackend + ?Sized,
    {
        match &self.state {
            ResolverState::Authenticated(session) => return Ok(session.clone()),
            ResolverState::Failed(err) => return Err(err.clone()),
            _ => {}
        }

        self.state = ResolverState::Authenticating;

        match authenticate(options, ambient, backend).await {
            Ok(session) => {
                info!("Vault: authenticated using {} auth", describe(session.method()));
                if let Some(lease) = session.lease_duration() {
                    debug!("Vault: token lease {}s, policies [{}]", lease, session.policies().join(", "));
                }
                self.state = ResolverState::Authenticated(session.clone());
                Ok(session)
            }
            Err(err) => {
                self.state = ResolverState::Failed(err.clone());
                Err(err)
            }
        }
    }
}

fn describe(method: &crate::vault::AuthMethod) -> &'static str {
    match method {
        crate::vault::AuthMethod::Token => AUTH_MODE_TOKEN,
        crate::vault::AuthMethod::Kubernetes { .. } => AUTH_MODE_KUBERNETES,
    }
}

async fn authenticate<B>(options: &AuthOptions, ambient: &AmbientConfig, backend: &B) -> Result<Session>
where
    B: AuthBackend + ?Sized,
{
    match AuthStrategy::select(options, ambient)? {
        AuthStrategy::Token => {
            let token = ambient
                .get(ENV_VAULT_TOKEN)
                .ok_or_else(|| BackupError::config(format!("Vault: env. variable {} not set.", ENV_VAULT_TOKEN)))?;
            Ok(Session::from_token(token))
        }
        AuthStrategy::Kubernetes { role, service_account_token_path, mount } => {
            let jwt = read_service_account_token(&service_account_token_path).await?;

            debug!("Vault: logging in at auth/{} with role {}", mount, role);
            let login = backend
                .login_kubernetes(&mount, &role, &jwt)
                .await
                .map_err(|e| BackupError::auth(format!("Kubernetes login failed: {:#}", e)))?;

            match login {
                Some(login) if !login.client_token.is_empty() => Ok(Session::from_login(role, login)),
                _ => Err(BackupError::auth("Vault: no auth info was returned after login")),
            }
        }
    }
}

/// Read the service account JWT. A directory is accepted and resolved to the
/// `token` file inside it.
pub async fn read_service_account_token(path: &Path) -> Result<String> {
    let token_path = match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => path.join(SERVICE_ACCOUNT_TOKEN_FILE),
        _ => path.to_path_buf(),
    };

    let jwt = tokio::fs::read_to_string(&token_path).await.map_err(|e| {
        BackupError::auth(format!(
            "Unable to read service account token from {}: {}",
            token_path.display(),
            e
        ))
    })?;

    let jwt = jwt.trim();
    if jwt.is_empty() {
        return Err(BackupError::auth(format!(
            "Service account token at {} is empty",
            token_path.display()
        )));
    }

    Ok(jwt.to_string())
}
