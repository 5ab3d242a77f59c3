use super::container::Container;
use super::{LaunchHandle, LaunchRequest, RuntimeAdapter};
use crate::config::AppRecord;
use crate::context::AppContext;
use crate::detect::Kind;
use crate::error::{ApolloError, Result};
use crate::external::{self, spawn_detached};
use crate::run_registry;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Wine inside the apollo LXC container.
pub struct WindowsAdapter;

impl RuntimeAdapter for WindowsAdapter {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn kinds(&self) -> &'static [Kind] {
        &[Kind::Exe]
    }

    fn launch(&self, ctx: &AppContext, req: &LaunchRequest<'_>) -> Result<LaunchHandle> {
        external::LXC.require()?;
        let container = Container::from_ctx(ctx);
        container.ensure_running()?;

        for mount in &req.record.mounts {
            debug!(container = container.name(), %mount, "attaching mount");
            container.attach_mount(mount)?;
        }

        let ts = chrono::Utc::now().timestamp();
        let target = container_payload_path(req.name, ts);
        info!(src = %req.path.display(), dest = %target, "copying payload into container");
        container.push_file(req.path, &target)?;

        let log_path = ctx.log_file(req.name, ts);
        let (stdout, stderr) = open_log(&log_path)?;

        let mut cmd = Command::new("lxc");
        cmd.args(wine_invocation(container.name(), &target, req.record));
        let child = spawn_detached(&mut cmd, stdout, stderr)?;

        run_registry::append(ctx, req.name, child.id())?;
        Ok(LaunchHandle::new(child, Some(log_path)))
    }
}

/// `{name}_{unix_ts}.exe` under `/root`, so repeated launches never clash.
/// Truncate `path` and return it twice, for a child's stdout and stderr.
pub fn open_log(path: &Path) -> Result<(Stdio, Stdio)> {
    let (log, _) = fs_err::File::create(path)
        .map_err(|e| ApolloError::fs(path, e))?
        .into_parts();
    let log_err = log.try_clone().map_err(|e| ApolloError::fs(path, e))?;
    Ok((Stdio::from(log), Stdio::from(log_err)))
}

pub fn container_payload_path(name: &str, ts: i64) -> String {
    format!("/root/{name}_{ts}.exe")
}

/// Arguments to `lxc` that run `payload` under Wine with the record's
/// working directory, environment and arguments.
pub fn wine_invocation(container: &str, payload: &str, record: &AppRecord) -> Vec<String> {
    let mut argv = vec!["exec".to_string(), container.to_string()];
    if let Some(wd) = record.working_dir() {
        argv.push("--cwd".into());
        argv.push(wd.to_string());
    }
    for (k, v) in &record.environment {
        argv.push("--env".into());
        argv.push(format!("{k}={v}"));
    }
    argv.push("--".into());
    argv.push("wine".into());
    argv.push(payload.to_string());
    argv.extend(record.argv());
    argv
}
