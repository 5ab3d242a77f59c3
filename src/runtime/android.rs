use super::{LaunchHandle, LaunchRequest, RuntimeAdapter};
use crate::context::AppContext;
use crate::detect::Kind;
use crate::error::Result;
use crate::external::{self, run_captured, run_checked, spawn_detached};
use crate::ui;
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

static PACKAGE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^package: name='([^']+)'").expect("static regex"));

/// APKs through Waydroid.
pub struct AndroidAdapter;

impl RuntimeAdapter for AndroidAdapter {
    fn name(&self) -> &'static str {
        "android"
    }

    fn kinds(&self) -> &'static [Kind] {
        &[Kind::Apk]
    }

    fn launch(&self, _ctx: &AppContext, req: &LaunchRequest<'_>) -> Result<LaunchHandle> {
        external::WAYDROID.require()?;

        ui::info("Starting Waydroid session...");
        let session = run_captured(Command::new("waydroid").args(["session", "start"]))?;
        if !session.status.success() {
            // usually "already running"
            let stderr = String::from_utf8_lossy(&session.stderr);
            debug!(stderr = %stderr.trim(), "session start returned non-zero");
        }

        ui::info(format!("Installing {}...", req.name));
        run_checked(Command::new("waydroid").args(["app", "install"]).arg(req.path))?;

        let mut cmd = Command::new("waydroid");
        match resolve_package(req.path) {
            Some(pkg) => {
                info!(package = %pkg, "launching package");
                ui::info(format!("Launching package {pkg}..."));
                cmd.args(["app", "launch"]).arg(&pkg);
            }
            None => {
                ui::warning("Could not determine the package name, opening the Waydroid UI");
                cmd.arg("show-full-ui");
            }
        }
        if !req.record.arguments.trim().is_empty() {
            warn!(app = req.name, "arguments are not supported for Android payloads; ignoring");
        }
        cmd.envs(&req.record.environment);
        let child = spawn_detached(&mut cmd, Stdio::null(), Stdio::null())?;
        Ok(LaunchHandle::new(child, None))
    }
}

/// Package id from `aapt dump badging`, if aapt is installed and succeeds.
fn resolve_package(apk: &std::path::Path) -> Option<String> {
    if !external::AAPT.is_present() {
        debug!("aapt not found; cannot resolve package name");
        return None;
    }
    let out = run_captured(Command::new("aapt").args(["dump", "badging"]).arg(apk)).ok()?;
    package_from_badging(&String::from_utf8_lossy(&out.stdout))
}

pub fn package_from_badging(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|l| PACKAGE_LINE.captures(l).map(|c| c[1].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_package_name() {
        let out = "package: name='org.example.game' versionCode='42' versionName='1.0'\n\
sdkVersion:'21'\napplication-label:'Game'\n";
        assert_eq!(package_from_badging(out).as_deref(), Some("org.example.game"));
    }

    #[test]
    fn no_package_line() {
        assert_eq!(package_from_badging("sdkVersion:'21'\n"), None);
        assert_eq!(package_from_badging(""), None);
        // must start the line
        assert_eq!(package_from_badging("  launchable package: name='x'"), None);
    }
}
