use super::{LaunchHandle, LaunchRequest, RuntimeAdapter};
use crate::context::AppContext;
use crate::detect::Kind;
use crate::error::{ApolloError, Result};
use crate::external::{self, spawn_detached};
use crate::platform::platform;
use crate::ui;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::info;

/// macOS payloads through Darling.
pub struct MacosAdapter;

/// How a macOS payload gets started.
#[derive(Debug, PartialEq, Eq)]
pub enum MacosTarget {
    /// Executable found inside an `.app` bundle.
    Bundle(PathBuf),
    /// Disk image, attached through `hdiutil` inside Darling.
    DiskImage,
    /// Anything else is handed to the Darling shell as-is.
    Binary,
}

impl RuntimeAdapter for MacosAdapter {
    fn name(&self) -> &'static str {
        "macos"
    }

    fn kinds(&self) -> &'static [Kind] {
        &[Kind::Macos]
    }

    fn launch(&self, _ctx: &AppContext, req: &LaunchRequest<'_>) -> Result<LaunchHandle> {
        external::DARLING.require()?;
        ui::info(format!("Starting {} through Darling...", req.name));

        let mut cmd = Command::new("darling");
        cmd.arg("shell");
        match classify(req.path)? {
            MacosTarget::Bundle(exe) => {
                info!(exe = %exe.display(), "launching bundle executable");
                cmd.arg(exe).args(req.record.argv());
            }
            MacosTarget::DiskImage => {
                ui::warning(
                    "Mounting a DMG through Darling may need manual installation afterwards",
                );
                cmd.args(["hdiutil", "attach"]).arg(req.path);
            }
            MacosTarget::Binary => {
                cmd.arg(req.path).args(req.record.argv());
            }
        }
        if let Some(wd) = req.record.working_dir() {
            cmd.current_dir(wd);
        }
        cmd.envs(&req.record.environment);
        let child = spawn_detached(&mut cmd, Stdio::null(), Stdio::null())?;
        Ok(LaunchHandle::new(child, None))
    }
}

pub fn classify(path: &Path) -> Result<MacosTarget> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("app") if path.is_dir() => bundle_executable(path)?
            .map(MacosTarget::Bundle)
            .ok_or_else(|| ApolloError::DetectionFailed {
                path: path.join("Contents/MacOS"),
            }),
        Some("dmg") => Ok(MacosTarget::DiskImage),
        _ => Ok(MacosTarget::Binary),
    }
}

/// First executable file directly under a `Contents/MacOS` directory,
/// searched breadth-first in name order so the bundle's own binary wins
/// over those of embedded frameworks.
pub fn bundle_executable(bundle: &Path) -> Result<Option<PathBuf>> {
    let mut queue = VecDeque::from([bundle.to_path_buf()]);
    while let Some(dir) = queue.pop_front() {
        let mut entries: Vec<PathBuf> = fs_err::read_dir(&dir)
            .map_err(|e| ApolloError::fs(&dir, e))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .collect();
        entries.sort();
        let in_macos_dir = dir.file_name().is_some_and(|n| n == "MacOS")
            && dir
                .parent()
                .and_then(Path::file_name)
                .is_some_and(|n| n == "Contents");
        for path in entries {
            if path.is_dir() {
                queue.push_back(path);
            } else if in_macos_dir && platform().is_executable(&path) {
                return Ok(Some(path));
            }
        }
    }
    Ok(None)
}
