use crate::error::{ApolloError, Result};
use crate::platform::platform;
use crate::settings::Settings;
use std::path::PathBuf;

/// Resolved on-disk layout plus global settings. Built once in `main` and
/// handed to every component.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub root: PathBuf,
    pub apps_dir: PathBuf,
    pub configs_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub run_registry: PathBuf,
    /// Reserved for a repository listing; nothing reads it yet.
    pub repo_cache: PathBuf,
    pub settings: Settings,
}

impl AppContext {
    /// `override_root` comes from `--home` / `APOLLO_HOME`; otherwise
    /// `~/.apollo`.
    pub fn resolve(override_root: Option<PathBuf>) -> Result<Self> {
        let root = match override_root {
            Some(r) => r,
            None => platform()
                .home_dir()
                .map(|h| h.join(".apollo"))
                .ok_or_else(|| {
                    ApolloError::fs(
                        "~",
                        std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "cannot determine home directory",
                        ),
                    )
                })?,
        };
        let settings = Settings::load(&root.join("apollo.toml"))?;
        Ok(Self::with_settings(root, settings))
    }

    pub fn with_settings(root: PathBuf, settings: Settings) -> Self {
        Self {
            apps_dir: root.join("apps"),
            configs_dir: root.join("configs"),
            logs_dir: root.join("logs"),
            run_registry: root.join("running.pid"),
            repo_cache: root.join("repo.json"),
            root,
            settings,
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for d in [&self.root, &self.apps_dir, &self.configs_dir, &self.logs_dir] {
            fs_err::create_dir_all(d).map_err(|e| ApolloError::fs(d.as_path(), e))?;
        }
        Ok(())
    }

    pub fn config_file(&self, name: &str) -> PathBuf {
        self.configs_dir.join(format!("{name}.toml"))
    }

    /// Settings file name used before the TOML switch.
    pub fn legacy_config_file(&self, name: &str) -> PathBuf {
        self.configs_dir.join(format!("{name}.conf"))
    }

    pub fn app_dir(&self, name: &str) -> PathBuf {
        self.apps_dir.join(name)
    }

    pub fn log_file(&self, name: &str, ts: i64) -> PathBuf {
        self.logs_dir.join(format!("{name}_{ts}.log"))
    }

    pub fn container(&self) -> &str {
        &self.settings.container
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_at_override() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::resolve(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(ctx.config_file("Quake"), dir.path().join("configs/Quake.toml"));
        assert_eq!(ctx.log_file("Quake", 42), dir.path().join("logs/Quake_42.log"));
        assert_eq!(ctx.run_registry, dir.path().join("running.pid"));
        assert_eq!(ctx.container(), "apollo");
    }

    #[test]
    fn ensure_dirs_creates_tree() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::with_settings(dir.path().join("home"), Settings::default());
        ctx.ensure_dirs().unwrap();
        assert!(ctx.apps_dir.is_dir());
        assert!(ctx.configs_dir.is_dir());
        assert!(ctx.logs_dir.is_dir());
    }
}
