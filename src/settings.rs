use crate::error::{ApolloError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONTAINER: &str = "apollo";
pub const DEFAULT_IMAGE: &str = "images:ubuntu/22.04";

/// Optional `apollo.toml` in the apollo home directory. Every key may be
/// omitted.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Name of the LXC container hosting Wine.
    pub container: String,
    /// Image the container is provisioned from.
    pub image: String,
    pub ready_timeout_secs: u64,
    pub log_retention_days: u64,
    /// Editor used by `conf` when neither EDITOR nor VISUAL is set.
    pub editor: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            ready_timeout_secs: 120,
            log_retention_days: 7,
            editor: None,
        }
    }
}

impl Settings {
    /// A missing file yields the defaults; a malformed one is an error so
    /// that typos do not silently fall back.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs_err::read_to_string(path).map_err(|e| ApolloError::fs(path, e))?;
        toml::from_str(&data).map_err(|e| ApolloError::Config {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn log_retention(&self) -> Duration {
        Duration::from_secs(self.log_retention_days.saturating_mul(86_400))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load(&dir.path().join("apollo.toml")).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.log_retention(), Duration::from_secs(7 * 86_400));
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apollo.toml");
        std::fs::write(&path, "container = \"wine-box\"\nready_timeout_secs = 30\n").unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.container, "wine-box");
        assert_eq!(s.ready_timeout(), Duration::from_secs(30));
        assert_eq!(s.image, DEFAULT_IMAGE);
    }

    #[test]
    fn huge_retention_saturates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apollo.toml");
        std::fs::write(&path, format!("log_retention_days = {}\n", i64::MAX)).unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.log_retention(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apollo.toml");
        std::fs::write(&path, "contianer = \"x\"\n").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(ApolloError::Config { .. })
        ));
    }
}
