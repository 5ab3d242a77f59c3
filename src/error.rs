use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by detection, the settings store and the runtime adapters.
#[derive(Error, Debug)]
pub enum ApolloError {
    /// A required external tool is not on PATH.
    #[error("dependency '{tool}' not found")]
    DependencyMissing { tool: String, hint: String },

    #[error("unsupported file type: {}", path.display())]
    DetectionFailed { path: PathBuf },

    #[error("application '{name}' not found")]
    ConfigNotFound { name: String },

    #[error("invalid application name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// A wrapped subprocess could not be started or exited non-zero.
    #[error("{command} failed: {detail}")]
    ExternalToolFailure { command: String, detail: String },

    #[error("container '{container}' not ready after {}s", waited.as_secs())]
    ReadinessTimeout { container: String, waited: Duration },

    #[error("{}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {}: {detail}", path.display())]
    Config { path: PathBuf, detail: String },

    #[error("interrupted")]
    Interrupted,
}

impl ApolloError {
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ApolloError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn tool_failure(command: impl Into<String>, detail: impl Into<String>) -> Self {
        ApolloError::ExternalToolFailure {
            command: command.into(),
            detail: detail.into(),
        }
    }

    /// Follow-up advice printed under the error line, if any.
    pub fn hint(&self) -> Option<String> {
        match self {
            ApolloError::DependencyMissing { hint, .. } => Some(hint.clone()),
            ApolloError::DetectionFailed { .. } => {
                Some("supported: .exe, .msi, .apk, .app, .dmg, .pkg, .deb, .rpm, .sh, .bash".into())
            }
            ApolloError::ConfigNotFound { name } => {
                Some(format!("register it first: apollo add <file> --name {name}"))
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApolloError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_not_found_hint_names_the_app() {
        let err = ApolloError::ConfigNotFound {
            name: "Quake".into(),
        };
        assert_eq!(err.to_string(), "application 'Quake' not found");
        assert!(err.hint().unwrap().contains("--name Quake"));
    }

    #[test]
    fn tool_failure_has_no_hint() {
        let err = ApolloError::tool_failure("lxc start apollo", "exit status: 1");
        assert_eq!(err.to_string(), "lxc start apollo failed: exit status: 1");
        assert!(err.hint().is_none());
    }
}
