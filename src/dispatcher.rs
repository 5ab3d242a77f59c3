//! Turns an `open` target (a path or a registered name) into a running
//! application.

use crate::config::{self, AppRecord};
use crate::context::AppContext;
use crate::detect::{self, Kind};
use crate::error::{ApolloError, Result};
use crate::external;
use crate::runtime::{AdapterTable, LaunchHandle, LaunchRequest};
use crate::ui;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Resolving,
    KindKnown(Kind),
    Launching(&'static str),
    Succeeded,
    Failed,
}

fn enter(state: DispatchState) {
    debug!(?state, "dispatch");
}

/// A target resolved to a settings name, a payload on disk and the record
/// that will be used to launch it.
#[derive(Debug)]
pub struct Resolved {
    pub name: String,
    pub path: PathBuf,
    pub record: AppRecord,
}

/// Resolve `target` as an existing path first, then as a registered name.
pub fn resolve(ctx: &AppContext, target: &str) -> Result<Resolved> {
    let as_path = Path::new(target);
    if as_path.exists() {
        let path = std::path::absolute(as_path).map_err(|e| ApolloError::fs(as_path, e))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| target.to_string());
        let kind = detect::detect(&path).ok_or_else(|| ApolloError::DetectionFailed {
            path: path.clone(),
        })?;
        config::validate_name(&name)?;
        let mut record = config::load(ctx, &name);
        record.name = name.clone();
        record.kind = kind;
        record.path = Some(path.clone());
        return Ok(Resolved { name, path, record });
    }

    config::validate_name(target)?;
    if config::exists(ctx, target) {
        let mut record = config::load(ctx, target);
        let path = match record.path.clone() {
            Some(p) if p.exists() => p,
            other => {
                let missing = other.unwrap_or_else(|| ctx.app_dir(target));
                return Err(ApolloError::fs(
                    missing,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "payload not found"),
                ));
            }
        };
        if record.kind == Kind::Unknown {
            record.kind = detect::detect(&path).unwrap_or_default();
        }
        return Ok(Resolved {
            name: target.to_string(),
            path,
            record,
        });
    }

    Err(ApolloError::ConfigNotFound {
        name: target.to_string(),
    })
}

/// Resolve, launch through the adapter for the payload's kind, and persist
/// the record only once the launch succeeded.
pub fn open(ctx: &AppContext, table: &AdapterTable, target: &str) -> Result<LaunchHandle> {
    for dep in external::missing() {
        ui::warning(format!("{} not found ({})", dep.name, dep.hint));
    }

    enter(DispatchState::Resolving);
    let Resolved { name, path, record } =
        resolve(ctx, target).inspect_err(|_| enter(DispatchState::Failed))?;
    if record.kind == Kind::Unknown {
        enter(DispatchState::Failed);
        return Err(ApolloError::DetectionFailed { path });
    }
    enter(DispatchState::KindKnown(record.kind));

    let adapter = table.get(record.kind).ok_or_else(|| {
        enter(DispatchState::Failed);
        ApolloError::DetectionFailed { path: path.clone() }
    })?;
    enter(DispatchState::Launching(adapter.name()));
    let req = LaunchRequest {
        path: &path,
        name: &name,
        record: &record,
    };
    match adapter.launch(ctx, &req) {
        Ok(handle) => {
            config::save(ctx, &name, &record)?;
            enter(DispatchState::Succeeded);
            Ok(handle)
        }
        Err(e) => {
            enter(DispatchState::Failed);
            Err(e)
        }
    }
}
