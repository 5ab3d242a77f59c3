use crate::context::AppContext;
use crate::error::{ApolloError, Result};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// One `name:pid` line of the run registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEntry {
    pub name: String,
    pub pid: u32,
}

pub fn append(ctx: &AppContext, name: &str, pid: u32) -> Result<()> {
    let path = &ctx.run_registry;
    let mut f = fs_err::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ApolloError::fs(path.as_path(), e))?;
    writeln!(f, "{name}:{pid}").map_err(|e| ApolloError::fs(path.as_path(), e))
}

/// Entries in launch order. Lines that do not parse are skipped.
pub fn entries(ctx: &AppContext) -> Result<Vec<RunEntry>> {
    let path = &ctx.run_registry;
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs_err::read_to_string(path).map_err(|e| ApolloError::fs(path.as_path(), e))?;
    Ok(data
        .lines()
        .filter_map(|l| {
            let (name, pid) = l.rsplit_once(':')?;
            Some(RunEntry {
                name: name.to_string(),
                pid: pid.trim().parse().ok()?,
            })
        })
        .collect())
}

pub fn reset(ctx: &AppContext) -> Result<()> {
    let path = &ctx.run_registry;
    match fs_err::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ApolloError::fs(path.as_path(), e)),
    }
}

/// Outcome of a log sweep.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub deleted: usize,
    pub remaining_bytes: u64,
}

/// Delete `*.log` files in the logs directory last modified more than
/// `retention` before `now`.
pub fn clean_logs(ctx: &AppContext, retention: Duration, now: SystemTime) -> Result<CleanReport> {
    let dir = &ctx.logs_dir;
    let mut report = CleanReport::default();
    if !dir.exists() {
        return Ok(report);
    }
    let cutoff = now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);
    for entry in fs_err::read_dir(dir).map_err(|e| ApolloError::fs(dir.as_path(), e))? {
        let path = entry.map_err(|e| ApolloError::fs(dir.as_path(), e))?.path();
        let Ok(meta) = path.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        let expired = is_log(&path) && meta.modified().map(|m| m < cutoff).unwrap_or(false);
        // a file we fail to delete just stays in the size tally
        if expired && fs_err::remove_file(&path).is_ok() {
            report.deleted += 1;
        } else {
            report.remaining_bytes += meta.len();
        }
    }
    Ok(report)
}

fn is_log(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("log")
}
