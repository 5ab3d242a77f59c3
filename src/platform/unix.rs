use crate::platform::PlatformOps;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

pub static UNIX_PLATFORM: Unix = Unix;

pub struct Unix;

impl PlatformOps for Unix {
    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir().or_else(|| std::env::var_os("HOME").map(PathBuf::from))
    }
    fn make_executable(&self, path: &Path) -> io::Result<()> {
        let mut perms = fs_err::metadata(path)?.permissions();
        perms.set_mode(0o755);
        fs_err::set_permissions(path, perms)
    }
    fn is_executable(&self, path: &Path) -> bool {
        std::fs::metadata(path)
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    fn detach(&self, cmd: &mut Command) {
        // SAFETY: the hook only calls setsid, which is async-signal-safe.
        unsafe {
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_executable_sets_exec_bits() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("run.sh");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        assert!(!UNIX_PLATFORM.is_executable(&script));
        UNIX_PLATFORM.make_executable(&script).unwrap();
        assert!(UNIX_PLATFORM.is_executable(&script));
    }

    #[test]
    fn detached_child_gets_its_own_session() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        UNIX_PLATFORM.detach(&mut cmd);
        let mut child = cmd.spawn().unwrap();
        let pid = child.id() as libc::pid_t;

        let mut child_sid = -1;
        for _ in 0..200 {
            // setsid runs between fork and exec
            child_sid = unsafe { libc::getsid(pid) };
            if child_sid == pid {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        let own_sid = unsafe { libc::getsid(0) };
        child.kill().unwrap();
        child.wait().unwrap();

        assert_eq!(child_sid, pid);
        assert_ne!(child_sid, own_sid);
    }

    #[test]
    fn directories_are_not_executables() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!UNIX_PLATFORM.is_executable(dir.path()));
    }
}
