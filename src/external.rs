use crate::error::{ApolloError, Result};
use crate::platform::platform;
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use tracing::{debug, trace};

/// An external tool apollo orchestrates.
#[derive(Debug, Clone, Copy)]
pub struct Dependency {
    pub cmd: &'static str,
    pub name: &'static str,
    pub hint: &'static str,
}

pub const LXC: Dependency = Dependency {
    cmd: "lxc",
    name: "LXC/LXD",
    hint: "install it: sudo apt install lxd && sudo lxd init --auto",
};
pub const WAYDROID: Dependency = Dependency {
    cmd: "waydroid",
    name: "Waydroid",
    hint: "install it: sudo apt install waydroid && waydroid init -s GAPPS",
};
pub const DARLING: Dependency = Dependency {
    cmd: "darling",
    name: "Darling",
    hint: "install it: https://darlinghq.org/",
};
pub const AAPT: Dependency = Dependency {
    cmd: "aapt",
    name: "aapt",
    hint: "install it: sudo apt install aapt",
};

/// Everything `info` reports on.
pub const ALL: [Dependency; 4] = [LXC, WAYDROID, DARLING, AAPT];

impl Dependency {
    pub fn locate(&self) -> Option<PathBuf> {
        which::which(self.cmd).ok()
    }

    pub fn is_present(&self) -> bool {
        self.locate().is_some()
    }

    pub fn require(&self) -> Result<PathBuf> {
        self.locate().ok_or_else(|| ApolloError::DependencyMissing {
            tool: format!("{} ({})", self.name, self.cmd),
            hint: self.hint.to_string(),
        })
    }
}

pub fn missing() -> Vec<Dependency> {
    ALL.into_iter().filter(|d| !d.is_present()).collect()
}

/// `program arg arg ...` for logs and error messages.
pub fn command_line(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Run to completion capturing output, whatever the exit status.
pub fn run_captured(cmd: &mut Command) -> Result<Output> {
    let line = command_line(cmd);
    debug!(command = %line, "running");
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ApolloError::tool_failure(&line, e.to_string()))?;
    trace!(
        status = %output.status,
        stdout_len = output.stdout.len(),
        stderr_len = output.stderr.len(),
        "command completed"
    );
    Ok(output)
}

/// Run to completion; a non-zero exit becomes `ExternalToolFailure`.
/// Returns stdout.
pub fn run_checked(cmd: &mut Command) -> Result<String> {
    let line = command_line(cmd);
    let output = run_captured(cmd)?;
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| output.status.to_string());
    Err(ApolloError::tool_failure(line, detail))
}

/// Run with the terminal attached so long steps (package installs) show
/// their progress.
pub fn run_attached(cmd: &mut Command) -> Result<()> {
    let line = command_line(cmd);
    debug!(command = %line, "running attached");
    let status = cmd
        .stdin(Stdio::null())
        .status()
        .map_err(|e| ApolloError::tool_failure(&line, e.to_string()))?;
    if status.success() {
        Ok(())
    } else {
        Err(ApolloError::tool_failure(line, status.to_string()))
    }
}

/// Start `cmd` in its own process group without waiting for it.
pub fn spawn_detached(cmd: &mut Command, stdout: Stdio, stderr: Stdio) -> Result<Child> {
    let line = command_line(cmd);
    debug!(command = %line, "spawning detached");
    platform().detach(cmd);
    cmd.stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
        .map_err(|e| ApolloError::tool_failure(line, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_joins_program_and_args() {
        let mut cmd = Command::new("lxc");
        cmd.args(["exec", "apollo", "--", "wine", "/root/a.exe"]);
        assert_eq!(command_line(&cmd), "lxc exec apollo -- wine /root/a.exe");
    }

    #[test]
    fn missing_binary_is_reported_as_tool_failure() {
        let err = run_checked(&mut Command::new("apollo-definitely-not-installed")).unwrap_err();
        assert!(matches!(err, ApolloError::ExternalToolFailure { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_carries_last_stderr_line() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo first >&2; echo boom >&2; exit 3"]);
        let err = run_checked(&mut cmd).unwrap_err();
        match err {
            ApolloError::ExternalToolFailure { detail, .. } => assert_eq!(detail, "boom"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn checked_run_returns_stdout() {
        let out = run_checked(Command::new("sh").args(["-c", "echo hi"])).unwrap();
        assert_eq!(out.trim(), "hi");
    }

    #[test]
    fn require_reports_install_hint() {
        let dep = Dependency {
            cmd: "apollo-definitely-not-installed",
            name: "Nothing",
            hint: "install nothing",
        };
        match dep.require() {
            Err(ApolloError::DependencyMissing { hint, .. }) => assert_eq!(hint, "install nothing"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
