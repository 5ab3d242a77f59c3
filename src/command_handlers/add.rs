use crate::config::{self, AppRecord, NetworkMode};
use crate::context::AppContext;
use crate::detect;
use crate::error::ApolloError;
use crate::ui;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// Copy `path` (file or directory tree) into `apps/{name}/` and register it.
pub fn run_add(ctx: &AppContext, path: &Path, name: Option<&str>) -> Result<AppRecord> {
    if !path.exists() {
        return Err(ApolloError::fs(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        )
        .into());
    }
    let kind = detect::detect(path).ok_or_else(|| ApolloError::DetectionFailed {
        path: path.to_path_buf(),
    })?;
    let name = match name {
        Some(n) => n.to_string(),
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .context("cannot derive a name from the path; pass --name")?,
    };
    config::validate_name(&name)?;
    let file_name = path.file_name().context("path has no file name")?;

    let app_dir = ctx.app_dir(&name);
    fs_err::create_dir_all(&app_dir)?;
    let dest = app_dir.join(file_name);
    if path.is_dir() {
        copy_tree(path, &dest).with_context(|| format!("copying {} failed", path.display()))?;
    } else {
        fs_err::copy(path, &dest).with_context(|| format!("copying {} failed", path.display()))?;
    }
    debug!(src = %path.display(), dest = %dest.display(), "payload copied");

    let mut rec = AppRecord::new(&name);
    rec.kind = kind;
    rec.path = Some(dest.clone());
    rec.network = NetworkMode::Nat;
    rec.description = format!("Added {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    config::save(ctx, &name, &rec)?;

    ui::success(format!("Application '{name}' added"));
    ui::info(format!("Kind: {kind}, path: {}", dest.display()));
    ui::info(format!("Configure it with: apollo conf {name}"));
    Ok(rec)
}

/// Recursive copy that merges into an existing destination.
fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs_err::create_dir_all(dst)?;
    for entry in fs_err::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs_err::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
