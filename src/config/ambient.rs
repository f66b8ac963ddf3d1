use std::collections::HashMap;

/// Ambient configuration: the process environment captured once at startup,
/// with an overlay of values injected later in the run.
///
/// Secrets materialized from Vault land in the overlay instead of the real
/// process environment. Lookups consult the overlay first, so an injected
/// `AWS_ACCESS_KEY_ID` shadows one inherited from the parent process.
#[derive(Clone, Default)]
pub struct AmbientConfig {
    base: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl AmbientConfig {
    /// Capture the current process environment.
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    /// Build from explicit key/value pairs instead of the process environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            base: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            overrides: HashMap::new(),
        }
    }

    /// Look up a value. Empty strings count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.overrides
            .get(key)
            .or_else(|| self.base.get(key))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Look up a value, returning an owned copy.
    pub fn get_owned(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }

    /// Inject a value into the overlay. Returns true if it replaced an
    /// earlier override.
    pub fn set_override(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        self.overrides.insert(key.into(), value.into()).is_some()
    }

    /// Names of all injected keys, sorted.
    pub fn override_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.overrides.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

// Values are credentials more often than not, so only key names are shown.
impl std::fmt::Debug for AmbientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmbientConfig")
            .field("base", &format!("[{} variables]", self.base.len()))
            .field("overrides", &self.override_keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_reads_base() {
        let ambient = AmbientConfig::from_pairs([("AWS_BUCKET", "backups")]);
        assert_eq!(ambient.get("AWS_BUCKET"), Some("backups"));
        assert_eq!(ambient.get("AWS_REGION"), None);
    }

    #[test]
    fn test_empty_value_is_unset() {
        let ambient = AmbientConfig::from_pairs([("VAULT_TOKEN", "")]);
        assert_eq!(ambient.get("VAULT_TOKEN"), None);
    }

    #[test]
    fn test_override_shadows_base() {
        let mut ambient = AmbientConfig::from_pairs([("AWS_REGION", "us-east-1")]);
        assert!(!ambient.set_override("AWS_REGION", "eu-west-1"));
        assert_eq!(ambient.get("AWS_REGION"), Some("eu-west-1"));
        assert_eq!(ambient.override_keys(), vec!["AWS_REGION"]);
        assert!(ambient.set_override("AWS_REGION", "eu-central-1"));
        assert_eq!(ambient.get_owned("AWS_REGION").as_deref(), Some("eu-central-1"));
    }

    #[test]
    fn test_debug_hides_values() {
        let mut ambient = AmbientConfig::from_pairs([("VAULT_TOKEN", "hvs.supersecret")]);
        ambient.set_override("AWS_SECRET_ACCESS_KEY", "wJalrXUtnFEMI");
        let rendered = format!("{:?}", ambient);
        assert!(!rendered.contains("hvs.supersecret"));
        assert!(!rendered.contains("wJalrXUtnFEMI"));
        assert!(rendered.contains("AWS_SECRET_ACCESS_KEY"));
    }

    #[test]
    fn test_override_keys_sorted() {
        let mut ambient = AmbientConfig::default();
        ambient.set_override("b", "2");
        ambient.set_override("a", "1");
        assert_eq!(ambient.override_keys(), vec!["a", "b"]);
    }
}
