//! The LXC container that hosts Wine. Apollo observes and provisions it but
//! does not own it: any `lxc` client may change its state.

use crate::config::Mount;
use crate::context::AppContext;
use crate::error::{ApolloError, Result};
use crate::external::{run_attached, run_captured, run_checked};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info};

const WINE_PACKAGES: &[&str] = &[
    "wine64",
    "wine32",
    "fonts-wine",
    "xauth",
    "x11-apps",
    "dbus-x11",
    "pulseaudio",
];
const PULSE_SERVER: &str = "unix:/home/ubuntu/pulse-native";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Missing,
    Stopped,
    Running { has_ipv4: bool },
}

impl ContainerState {
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContainerState::Missing => "not created",
            ContainerState::Stopped => "stopped",
            ContainerState::Running { .. } => "running",
        }
    }
}

/// Pick `name` out of `lxc list --format=json` output. `lxc list NAME`
/// filters by prefix, so other containers may be present.
pub fn parse_state(name: &str, json: &str) -> ContainerState {
    let Ok(serde_json::Value::Array(items)) = serde_json::from_str::<serde_json::Value>(json) else {
        return ContainerState::Missing;
    };
    let Some(c) = items
        .iter()
        .find(|c| c.get("name").and_then(|n| n.as_str()) == Some(name))
    else {
        return ContainerState::Missing;
    };
    if c.get("status").and_then(|s| s.as_str()) != Some("Running") {
        return ContainerState::Stopped;
    }
    let has_ipv4 = c
        .pointer("/state/network")
        .and_then(|n| n.as_object())
        .map(|ifaces| {
            ifaces
                .iter()
                .filter(|(iface, _)| iface.as_str() != "lo")
                .filter_map(|(_, v)| v.get("addresses").and_then(|a| a.as_array()))
                .flatten()
                .any(|a| {
                    a.get("family").and_then(|f| f.as_str()) == Some("inet")
                        && a.get("scope").and_then(|s| s.as_str()) != Some("local")
                })
        })
        .unwrap_or(false);
    ContainerState::Running { has_ipv4 }
}

/// Exponential delays: `start`, doubling, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(start: Duration, max: Duration) -> Self {
        Self { next: start, max }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(250), Duration::from_secs(2))
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let cur = self.next;
        self.next = (cur * 2).min(self.max);
        Some(cur)
    }
}

/// Call `check` until it reports ready, sleeping per `backoff` between
/// attempts. Returns the total time slept when ready, or `None` once that
/// total would exceed `timeout`.
pub fn poll_until<P, S>(
    mut check: P,
    timeout: Duration,
    backoff: Backoff,
    mut sleep: S,
) -> Result<Option<Duration>>
where
    P: FnMut() -> Result<bool>,
    S: FnMut(Duration),
{
    let mut waited = Duration::ZERO;
    for delay in backoff {
        if check()? {
            return Ok(Some(waited));
        }
        if waited + delay > timeout {
            return Ok(None);
        }
        sleep(delay);
        waited += delay;
    }
    Ok(None)
}

pub struct Container<'a> {
    name: &'a str,
    image: &'a str,
    timeout: Duration,
}

impl<'a> Container<'a> {
    pub fn from_ctx(ctx: &'a AppContext) -> Self {
        Self {
            name: &ctx.settings.container,
            image: &ctx.settings.image,
            timeout: ctx.settings.ready_timeout(),
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    fn lxc(&self) -> Command {
        Command::new("lxc")
    }

    pub fn state(&self) -> Result<ContainerState> {
        let out = run_checked(self.lxc().args(["list", self.name, "--format=json"]))?;
        Ok(parse_state(self.name, &out))
    }

    /// Make sure the container exists and is up, provisioning it on first
    /// use.
    pub fn ensure_running(&self) -> Result<()> {
        match self.state()? {
            ContainerState::Running { .. } => {
                debug!(container = self.name, "already running");
                Ok(())
            }
            ContainerState::Stopped => {
                info!(container = self.name, "starting container");
                run_checked(self.lxc().args(["start", self.name]))?;
                self.wait_ready(false)
            }
            ContainerState::Missing => self.provision(),
        }
    }

    /// One-time setup: create from the image, install Wine and the X11 and
    /// audio bits, and point DISPLAY/PULSE_SERVER at the host.
    pub fn provision(&self) -> Result<()> {
        info!(container = self.name, image = self.image, "provisioning container");
        run_attached(self.lxc().args([
            "launch",
            self.image,
            self.name,
            "-c",
            "security.nesting=true",
            "-c",
            "security.privileged=true",
            "-c",
            "linux.kernel_modules=ip_tables,ip6_tables,nf_nat,xt_conntrack",
        ]))?;
        // apt needs the network, not just a running init
        self.wait_ready(true)?;

        info!(container = self.name, "installing wine");
        self.exec_attached(&["dpkg", "--add-architecture", "i386"])?;
        self.exec_attached(&["apt", "update", "-y"])?;
        let mut install = vec!["apt", "install", "-y"];
        install.extend_from_slice(WINE_PACKAGES);
        self.exec_attached(&install)?;

        let display = std::env::var("DISPLAY").unwrap_or_else(|_| ":0".to_string());
        self.set_config("environment.DISPLAY", &display)?;
        self.set_config("environment.PULSE_SERVER", PULSE_SERVER)?;
        info!(container = self.name, "container provisioned");
        Ok(())
    }

    /// Poll the container state until it runs (and, with `need_network`,
    /// holds an IPv4 address) or the configured timeout passes.
    pub fn wait_ready(&self, need_network: bool) -> Result<()> {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message(format!("Waiting for container {}", self.name));
        let check = || -> Result<bool> {
            let state = self.state()?;
            debug!(container = self.name, ?state, "readiness check");
            Ok(match state {
                ContainerState::Running { has_ipv4 } => has_ipv4 || !need_network,
                _ => false,
            })
        };
        let res = poll_until(check, self.timeout, Backoff::default(), std::thread::sleep);
        pb.finish_and_clear();
        match res? {
            Some(waited) => {
                debug!(
                    container = self.name,
                    waited_ms = waited.as_millis() as u64,
                    "container ready"
                );
                Ok(())
            }
            None => Err(ApolloError::ReadinessTimeout {
                container: self.name.to_string(),
                waited: self.timeout,
            }),
        }
    }

    fn exec_attached(&self, argv: &[&str]) -> Result<()> {
        run_attached(
            self.lxc()
                .args(["exec", self.name])
                .args(["--env", "DEBIAN_FRONTEND=noninteractive", "--"])
                .args(argv),
        )
    }

    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        run_checked(self.lxc().args(["config", "set", self.name, key, value])).map(drop)
    }

    /// Attach `mount` as a disk device, replacing any earlier device for
    /// the same container path.
    pub fn attach_mount(&self, mount: &Mount) -> Result<()> {
        let device = mount_device_name(mount);
        // absent on first use
        run_captured(
            self.lxc()
                .args(["config", "device", "remove", self.name])
                .arg(&device),
        )?;
        run_checked(
            self.lxc()
                .args(["config", "device", "add", self.name])
                .arg(&device)
                .arg("disk")
                .arg(format!("source={}", mount.host))
                .arg(format!("path={}", mount.container)),
        )
        .map(drop)
    }

    pub fn push_file(&self, src: &Path, dest: &str) -> Result<()> {
        run_checked(
            self.lxc()
                .args(["file", "push"])
                .arg(src)
                .arg(format!("{}{}", self.name, dest)),
        )
        .map(drop)
    }
}

/// LXD device names allow only alphanumerics, `-`, `_` and `.`.
pub fn mount_device_name(mount: &Mount) -> String {
    let slug: String = mount
        .container
        .trim_matches('/')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("apollo-mnt-{slug}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = r#"[
      {"name": "apollo-old", "status": "Stopped", "state": null},
      {"name": "apollo", "status": "Running", "state": {"network": {
        "lo": {"addresses": [{"family": "inet", "address": "127.0.0.1", "scope": "local"}]},
        "eth0": {"addresses": [
          {"family": "inet6", "address": "fe80::1", "scope": "link"},
          {"family": "inet", "address": "10.0.3.15", "scope": "global"}
        ]}
      }}}
    ]"#;

    #[test]
    fn state_picks_exact_name() {
        assert_eq!(parse_state("apollo", LIST), ContainerState::Running { has_ipv4: true });
        assert_eq!(parse_state("apollo-old", LIST), ContainerState::Stopped);
        assert_eq!(parse_state("other", LIST), ContainerState::Missing);
        assert_eq!(parse_state("apollo", "[]"), ContainerState::Missing);
        assert_eq!(parse_state("apollo", "not json"), ContainerState::Missing);
    }

    #[test]
    fn loopback_address_does_not_count() {
        let json = r#"[{"name": "apollo", "status": "Running", "state": {"network": {
            "lo": {"addresses": [{"family": "inet", "address": "127.0.0.1", "scope": "local"}]}
        }}}]"#;
        assert_eq!(parse_state("apollo", json), ContainerState::Running { has_ipv4: false });
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let got: Vec<u64> = Backoff::default().take(6).map(|d| d.as_millis() as u64).collect();
        assert_eq!(got, vec![250, 500, 1000, 2000, 2000, 2000]);
    }

    #[test]
    fn poll_returns_once_check_succeeds() {
        let mut calls = 0;
        let mut slept = Vec::new();
        let res = poll_until(
            || {
                calls += 1;
                Ok(calls == 3)
            },
            Duration::from_secs(10),
            Backoff::default(),
            |d| slept.push(d),
        )
        .unwrap();
        assert_eq!(res, Some(Duration::from_millis(750)));
        assert_eq!(slept.len(), 2);
    }

    #[test]
    fn poll_gives_up_at_timeout() {
        let mut slept = Duration::ZERO;
        let res = poll_until(
            || Ok(false),
            Duration::from_secs(5),
            Backoff::default(),
            |d| slept += d,
        )
        .unwrap();
        assert_eq!(res, None);
        assert!(slept <= Duration::from_secs(5));
        assert_eq!(slept, Duration::from_millis(250 + 500 + 1000 + 2000));
    }

    #[test]
    fn check_errors_propagate() {
        let res = poll_until(
            || Err(ApolloError::tool_failure("lxc list", "boom")),
            Duration::from_secs(5),
            Backoff::default(),
            |_| {},
        );
        assert!(res.is_err());
    }

    #[test]
    fn device_names_are_sanitized() {
        let m: Mount = "/srv/games:/root/My Games".parse().unwrap();
        assert_eq!(mount_device_name(&m), "apollo-mnt-root-My-Games");
    }
}
