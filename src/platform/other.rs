use crate::platform::PlatformOps;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

pub static OTHER_PLATFORM: Other = Other;

pub struct Other;

impl PlatformOps for Other {
    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    fn make_executable(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn is_executable(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn detach(&self, _cmd: &mut Command) {}
}
