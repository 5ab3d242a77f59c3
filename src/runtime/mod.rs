//! Runtime adapters: one per application kind, each wrapping the external
//! compatibility tool that actually runs the payload.

pub mod android;
pub mod container;
pub mod macos;
pub mod native;
pub mod windows;

use crate::config::AppRecord;
use crate::context::AppContext;
use crate::detect::Kind;
use crate::error::{ApolloError, Result};
use std::path::{Path, PathBuf};
use std::process::Child;

/// What an adapter needs to start one payload.
#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest<'a> {
    pub path: &'a Path,
    pub name: &'a str,
    pub record: &'a AppRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStatus {
    Running,
    Exited(Option<i32>),
}

/// A started, detached application. Apollo does not wait on it; `poll`
/// lets callers check on it without blocking.
#[derive(Debug)]
pub struct LaunchHandle {
    child: Child,
    log_path: Option<PathBuf>,
}

impl LaunchHandle {
    pub fn new(child: Child, log_path: Option<PathBuf>) -> Self {
        Self { child, log_path }
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Where the child's combined output goes, when it is captured.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn poll(&mut self) -> Result<LaunchStatus> {
        match self.child.try_wait() {
            Ok(None) => Ok(LaunchStatus::Running),
            Ok(Some(status)) => Ok(LaunchStatus::Exited(status.code())),
            Err(e) => Err(ApolloError::tool_failure(
                format!("poll pid {}", self.child.id()),
                e.to_string(),
            )),
        }
    }
}

pub trait RuntimeAdapter {
    /// Short label used in logs.
    fn name(&self) -> &'static str;
    fn kinds(&self) -> &'static [Kind];
    fn launch(&self, ctx: &AppContext, req: &LaunchRequest<'_>) -> Result<LaunchHandle>;
}

/// Kind → adapter dispatch table.
pub struct AdapterTable {
    adapters: Vec<Box<dyn RuntimeAdapter>>,
}

impl AdapterTable {
    /// The built-in adapters.
    pub fn new() -> Self {
        Self {
            adapters: vec![
                Box::new(windows::WindowsAdapter),
                Box::new(android::AndroidAdapter),
                Box::new(macos::MacosAdapter),
                Box::new(native::NativeAdapter),
            ],
        }
    }

    pub fn empty() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Later registrations shadow earlier ones for the same kind.
    pub fn register(&mut self, adapter: Box<dyn RuntimeAdapter>) {
        self.adapters.insert(0, adapter);
    }

    pub fn get(&self, kind: Kind) -> Option<&dyn RuntimeAdapter> {
        self.adapters
            .iter()
            .find(|a| a.kinds().contains(&kind))
            .map(|a| a.as_ref())
    }
}

impl Default for AdapterTable {
    fn default() -> Self {
        Self::new()
    }
}
