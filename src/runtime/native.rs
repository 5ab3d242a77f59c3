use super::{LaunchHandle, LaunchRequest, RuntimeAdapter};
use crate::context::AppContext;
use crate::detect::Kind;
use crate::error::{ApolloError, Result};
use crate::external::spawn_detached;
use crate::platform::platform;
use std::process::{Command, Stdio};
use tracing::debug;

/// Linux binaries and shell scripts, run directly.
pub struct NativeAdapter;

impl RuntimeAdapter for NativeAdapter {
    fn name(&self) -> &'static str {
        "native"
    }

    fn kinds(&self) -> &'static [Kind] {
        &[Kind::Linux, Kind::Script]
    }

    fn launch(&self, _ctx: &AppContext, req: &LaunchRequest<'_>) -> Result<LaunchHandle> {
        platform()
            .make_executable(req.path)
            .map_err(|e| ApolloError::fs(req.path, e))?;
        debug!(path = %req.path.display(), "marked executable");

        let mut cmd = Command::new(req.path);
        cmd.args(req.record.argv()).envs(&req.record.environment);
        if let Some(wd) = req.record.working_dir() {
            cmd.current_dir(wd);
        }
        let child = spawn_detached(&mut cmd, Stdio::null(), Stdio::null())?;
        Ok(LaunchHandle::new(child, None))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::AppRecord;
    use crate::runtime::LaunchStatus;
    use crate::settings::Settings;
    use std::time::Duration;

    fn wait(handle: &mut LaunchHandle) -> LaunchStatus {
        for _ in 0..300 {
            let status = handle.poll().unwrap();
            if status != LaunchStatus::Running {
                return status;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        LaunchStatus::Running
    }

    #[test]
    fn runs_script_with_args_env_and_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::with_settings(dir.path().join("home"), Settings::default());
        let script = dir.path().join("hello.sh");
        let out = dir.path().join("out.txt");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho \"$1 $GREETING $(pwd)\" > {}\n", out.display()),
        )
        .unwrap();

        let mut rec = AppRecord::new("hello");
        rec.kind = Kind::Script;
        rec.arguments = "first second".into();
        rec.environment.insert("GREETING".into(), "hi".into());
        let wd = dir.path().canonicalize().unwrap();
        rec.working_dir = wd.display().to_string();

        let req = LaunchRequest {
            path: &script,
            name: "hello",
            record: &rec,
        };
        let mut handle = NativeAdapter.launch(&ctx, &req).unwrap();
        assert!(handle.pid() > 0);
        assert_eq!(wait(&mut handle), LaunchStatus::Exited(Some(0)));
        assert!(platform().is_executable(&script));
        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.trim(), format!("first hi {}", wd.display()));
    }

    #[test]
    fn missing_payload_is_a_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::with_settings(dir.path().to_path_buf(), Settings::default());
        let rec = AppRecord::new("gone");
        let path = dir.path().join("gone.sh");
        let req = LaunchRequest {
            path: &path,
            name: "gone",
            record: &rec,
        };
        assert!(matches!(
            NativeAdapter.launch(&ctx, &req),
            Err(ApolloError::Filesystem { .. })
        ));
    }
}
