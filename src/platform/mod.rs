pub fn platform() -> &'static dyn PlatformOps {
    &ConcretePlatform
}

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

pub trait PlatformOps: Sync + Send {
    fn home_dir(&self) -> Option<PathBuf>;
    fn make_executable(&self, path: &Path) -> io::Result<()>;
    fn is_executable(&self, path: &Path) -> bool;
    /// Start the child in a new session, away from apollo's controlling
    /// terminal and process group.
    fn detach(&self, cmd: &mut Command);
}

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::UNIX_PLATFORM as ConcretePlatform;

#[cfg(not(unix))]
mod other;
#[cfg(not(unix))]
pub use other::OTHER_PLATFORM as ConcretePlatform;
