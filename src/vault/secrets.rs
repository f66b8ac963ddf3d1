use log::{info, warn};

use crate::config::AmbientConfig;
use crate::error::{BackupError, Result};
use crate::vault::{SecretBundle, SecretReader, Session};

/// Where to find the secret that carries destination credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretLocation {
    pub mount: String,
    /// Empty means there is nothing to fetch.
    pub path: String,
}

impl SecretLocation {
    pub fn new(mount: impl Into<String>, path: impl Into<String>) -> Self {
        Self { mount: mount.into(), path: path.into() }
    }

    pub fn is_configured(&self) -> bool {
        !self.path.is_empty()
    }
}

/// Outcome of projecting a bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Field names now present in the overlay
    pub applied: Vec<String>,
    /// Field names skipped because their value was not a string
    pub skipped: Vec<String>,
}

/// Fetch the secret at `location` and inject its string fields into the
/// ambient overlay. A no-op when no path is configured.
pub async fn materialize<R>(
    reader: &R,
    session: &Session,
    location: &SecretLocation,
    ambient: &mut AmbientConfig,
) -> Result<MaterializeReport>
where
    R: SecretReader + ?Sized,
{
    if !location.is_configured() {
        return Ok(MaterializeReport::default());
    }

    let bundle = reader
        .read_secret(session, &location.mount, &location.path)
        .await
        .map_err(|e| BackupError::secret_fetch(format!("{}/{}: {:#}", location.mount, location.path, e)))?;

    Ok(project_bundle(&bundle, ambient))
}

/// Copy every string-valued field of `bundle` into the overlay. Other
/// values are skipped with a warning.
pub fn project_bundle(bundle: &SecretBundle, ambient: &mut AmbientConfig) -> MaterializeReport {
    let mut report = MaterializeReport::default();

    // Sorted so log output and the report are stable between runs.
    let mut names: Vec<&String> = bundle.keys().collect();
    names.sort();

    for name in names {
        match &bundle[name] {
            serde_json::Value::String(value) => {
                ambient.set_override(name.as_str(), value.as_str());
                info!("{} env. variable set from secret", name);
                report.applied.push(name.clone());
            }
            other => {
                warn!(
                    "Warning: cannot set env. '{}' as type '{}' is not a string",
                    name,
                    json_type_name(other)
                );
                report.skipped.push(name.clone());
            }
        }
    }

    report
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
