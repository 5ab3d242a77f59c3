use crate::context::AppContext;
use crate::detect::Kind;
use crate::error::{ApolloError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Current settings file schema.
pub const SCHEMA: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    #[default]
    Nat,
    Bridge,
    Host,
    None,
}

impl NetworkMode {
    pub const ALL: [NetworkMode; 4] = [
        NetworkMode::Nat,
        NetworkMode::Bridge,
        NetworkMode::Host,
        NetworkMode::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkMode::Nat => "nat",
            NetworkMode::Bridge => "bridge",
            NetworkMode::Host => "host",
            NetworkMode::None => "none",
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        NetworkMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                format!("invalid network mode '{s}' (expected nat, bridge, host or none)")
            })
    }
}

/// `hostPath:containerPath` bind, only honoured for Windows payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: String,
    pub container: String,
}

impl fmt::Display for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

impl FromStr for Mount {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((h, c)) if !h.trim().is_empty() && !c.trim().is_empty() => Ok(Mount {
                host: h.trim().to_string(),
                container: c.trim().to_string(),
            }),
            _ => Err(format!("invalid mount '{s}' (expected host:container)")),
        }
    }
}

impl Serialize for Mount {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// Persisted settings for one registered application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRecord {
    pub name: String,
    pub kind: Kind,
    pub path: Option<PathBuf>,
    pub environment: BTreeMap<String, String>,
    pub mounts: Vec<Mount>,
    pub network: NetworkMode,
    pub arguments: String,
    pub working_dir: String,
    pub description: String,
}

impl AppRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: Kind::Unknown,
            path: None,
            environment: BTreeMap::new(),
            mounts: Vec::new(),
            network: NetworkMode::Nat,
            arguments: String::new(),
            working_dir: String::new(),
            description: String::new(),
        }
    }

    pub fn payload_exists(&self) -> bool {
        self.path.as_deref().is_some_and(Path::exists)
    }

    /// `arguments` split on whitespace.
    pub fn argv(&self) -> Vec<String> {
        self.arguments.split_whitespace().map(str::to_string).collect()
    }

    pub fn working_dir(&self) -> Option<&str> {
        let wd = self.working_dir.trim();
        (!wd.is_empty()).then_some(wd)
    }

    /// Render the settings file. Same record in, same bytes out.
    pub fn to_toml(&self) -> Result<String> {
        let doc = RecordFile {
            schema: SCHEMA,
            name: &self.name,
            kind: self.kind,
            path: self.path.as_deref().map(|p| p.to_string_lossy().into_owned()),
            description: &self.description,
            network: self.network,
            arguments: &self.arguments,
            working_dir: &self.working_dir,
            mounts: &self.mounts,
            environment: &self.environment,
        };
        let body = toml::to_string_pretty(&doc).map_err(|e| ApolloError::Config {
            path: PathBuf::from(format!("{}.toml", self.name)),
            detail: e.to_string(),
        })?;
        Ok(format!(
            "# Settings for {}\n# Generated by apollo {}\n# Edit as needed\n\n{body}",
            self.name,
            env!("CARGO_PKG_VERSION")
        ))
    }

    /// Tolerant parse: each field is read on its own and a malformed one
    /// falls back to its default instead of failing the whole record.
    pub fn from_toml(name: &str, data: &str) -> std::result::Result<Self, toml::de::Error> {
        let table: toml::Table = data.parse()?;
        let mut rec = AppRecord::new(name);
        if let Some(v) = table.get("schema").and_then(|v| v.as_integer()) {
            if v > i64::from(SCHEMA) {
                warn!(
                    app = name,
                    schema = v,
                    "settings written by a newer apollo; loading best effort"
                );
            }
        }
        if let Some(v) = str_field(&table, name, "name") {
            rec.name = v;
        }
        if let Some(v) = str_field(&table, name, "kind") {
            rec.kind = v.parse().unwrap_or_default();
        }
        rec.path = str_field(&table, name, "path")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        rec.description = str_field(&table, name, "description").unwrap_or_default();
        rec.arguments = str_field(&table, name, "arguments").unwrap_or_default();
        rec.working_dir = str_field(&table, name, "working_dir").unwrap_or_default();
        if let Some(v) = str_field(&table, name, "network") {
            rec.network = parse_network(name, &v);
        }
        if let Some(v) = table.get("environment") {
            rec.environment = environment_from_toml(v).unwrap_or_else(|| {
                warn!(app = name, "malformed environment table; ignoring it");
                BTreeMap::new()
            });
        }
        if let Some(v) = table.get("mounts") {
            rec.mounts = mounts_from_toml(v).unwrap_or_else(|| {
                warn!(app = name, "malformed mounts list; ignoring it");
                Vec::new()
            });
        }
        Ok(rec)
    }

    /// Line-oriented format with JSON-valued `environment`/`mounts`, as
    /// written by earlier releases. Never fails.
    pub fn from_legacy(name: &str, data: &str) -> Self {
        let mut rec = AppRecord::new(name);
        for line in data.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            match key {
                "name" => rec.name = value.to_string(),
                "type" | "kind" => rec.kind = value.parse().unwrap_or_default(),
                "path" if !value.is_empty() => rec.path = Some(PathBuf::from(value)),
                "description" => rec.description = value.to_string(),
                "arguments" => rec.arguments = value.to_string(),
                "working_dir" => rec.working_dir = value.to_string(),
                "network" => rec.network = parse_network(name, value),
                "environment" => {
                    rec.environment = serde_json::from_str(&value.replace('\'', "\""))
                        .unwrap_or_else(|_| {
                            warn!(app = name, "malformed legacy environment; ignoring it");
                            BTreeMap::new()
                        })
                }
                "mounts" => {
                    rec.mounts = serde_json::from_str::<Vec<String>>(&value.replace('\'', "\""))
                        .ok()
                        .and_then(|v| v.iter().map(|m| m.parse().ok()).collect())
                        .unwrap_or_else(|| {
                            warn!(app = name, "malformed legacy mounts; ignoring them");
                            Vec::new()
                        })
                }
                _ => {}
            }
        }
        rec
    }
}

#[derive(Serialize)]
struct RecordFile<'a> {
    schema: u32,
    name: &'a str,
    kind: Kind,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    description: &'a str,
    network: NetworkMode,
    #[serde(skip_serializing_if = "is_blank")]
    arguments: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    working_dir: &'a str,
    #[serde(skip_serializing_if = "no_mounts")]
    mounts: &'a [Mount],
    #[serde(skip_serializing_if = "no_env")]
    environment: &'a BTreeMap<String, String>,
}

fn is_blank(s: &&str) -> bool {
    s.is_empty()
}

fn no_mounts(m: &&[Mount]) -> bool {
    m.is_empty()
}

fn no_env(e: &&BTreeMap<String, String>) -> bool {
    e.is_empty()
}

fn str_field(table: &toml::Table, app: &str, key: &str) -> Option<String> {
    match table.get(key)? {
        toml::Value::String(s) => Some(s.clone()),
        other => {
            warn!(app, key, found = other.type_str(), "expected a string; ignoring field");
            None
        }
    }
}

fn parse_network(app: &str, value: &str) -> NetworkMode {
    value.parse().unwrap_or_else(|e: String| {
        warn!(app, "{e}; using nat");
        NetworkMode::Nat
    })
}

fn environment_from_toml(v: &toml::Value) -> Option<BTreeMap<String, String>> {
    v.as_table()?
        .iter()
        .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect()
}

fn mounts_from_toml(v: &toml::Value) -> Option<Vec<Mount>> {
    v.as_array()?
        .iter()
        .map(|m| m.as_str().and_then(|s| s.parse().ok()))
        .collect()
}

// ---------------- store ----------------

/// Names become file and directory names under the apollo home, so they
/// must stay a single plain path component.
pub fn validate_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        "name is empty"
    } else if name == "." || name == ".." {
        "name is a relative directory"
    } else if name.contains(['/', '\\', '\0']) {
        "name contains a path separator or NUL"
    } else {
        return Ok(());
    };
    Err(ApolloError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

pub fn exists(ctx: &AppContext, name: &str) -> bool {
    ctx.config_file(name).exists() || ctx.legacy_config_file(name).exists()
}

/// Load `name`'s record. Never fails: a missing or unreadable file yields a
/// default record with `kind = unknown`.
pub fn load(ctx: &AppContext, name: &str) -> AppRecord {
    let path = ctx.config_file(name);
    if path.exists() {
        let data = match fs_err::read_to_string(&path) {
            Ok(d) => d,
            Err(e) => {
                warn!("{e}; using defaults");
                return AppRecord::new(name);
            }
        };
        return match AppRecord::from_toml(name, &data) {
            Ok(rec) => rec,
            Err(e) => {
                // hand-edited into the old format, or truncated
                let reason = e.to_string();
                warn!(
                    app = name,
                    "settings are not valid TOML ({}); trying legacy format",
                    reason.lines().next().unwrap_or_default()
                );
                AppRecord::from_legacy(name, &data)
            }
        };
    }
    let legacy = ctx.legacy_config_file(name);
    match fs_err::read_to_string(&legacy) {
        Ok(data) => {
            debug!(path = %legacy.display(), "loading legacy settings");
            AppRecord::from_legacy(name, &data)
        }
        Err(_) => AppRecord::new(name),
    }
}

/// Write the record to `configs/{name}.toml` via temp file + rename, and
/// drop any legacy `.conf` left for that name.
pub fn save(ctx: &AppContext, name: &str, rec: &AppRecord) -> Result<()> {
    let path = ctx.config_file(name);
    let body = rec.to_toml()?;
    atomic_write(&path, body.as_bytes())?;
    let legacy = ctx.legacy_config_file(name);
    if legacy.exists() {
        fs_err::remove_file(&legacy).map_err(|e| ApolloError::fs(&legacy, e))?;
    }
    debug!(path = %path.display(), "saved settings");
    Ok(())
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs_err::create_dir_all(dir).map_err(|e| ApolloError::fs(dir, e))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ApolloError::fs(dir, e))?;
    tmp.write_all(data)
        .and_then(|_| tmp.flush())
        .map_err(|e| ApolloError::fs(path, e))?;
    tmp.persist(path).map_err(|e| ApolloError::fs(path, e.error))?;
    Ok(())
}

/// Registered names, sorted.
pub fn list_names(ctx: &AppContext) -> Result<Vec<String>> {
    let mut names = BTreeSet::new();
    let dir = &ctx.configs_dir;
    if !dir.exists() {
        return Ok(Vec::new());
    }
    for entry in fs_err::read_dir(dir).map_err(|e| ApolloError::fs(dir.as_path(), e))? {
        let path = entry.map_err(|e| ApolloError::fs(dir.as_path(), e))?.path();
        let is_settings = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("toml") | Some("conf")
        );
        if is_settings {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.insert(stem.to_string());
            }
        }
    }
    Ok(names.into_iter().collect())
}

/// Delete the settings file(s) for `name`.
pub fn remove(ctx: &AppContext, name: &str) -> Result<()> {
    for path in [ctx.config_file(name), ctx.legacy_config_file(name)] {
        if path.exists() {
            fs_err::remove_file(&path).map_err(|e| ApolloError::fs(&path, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn ctx() -> (tempfile::TempDir, AppContext) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::with_settings(dir.path().to_path_buf(), Settings::default());
        ctx.ensure_dirs().unwrap();
        (dir, ctx)
    }

    fn full_record() -> AppRecord {
        let mut rec = AppRecord::new("Quake");
        rec.kind = Kind::Exe;
        rec.path = Some(PathBuf::from("/home/u/.apollo/apps/Quake/game.exe"));
        rec.description = "shooter".into();
        rec.environment.insert("WINEDEBUG".into(), "-all".into());
        rec.environment.insert("LANG".into(), "C".into());
        rec.mounts.push("/srv/data:/data".parse().unwrap());
        rec.network = NetworkMode::Bridge;
        rec.arguments = "-window -nosound".into();
        rec.working_dir = "/root".into();
        rec
    }

    #[test]
    fn names_must_be_one_plain_component() {
        for bad in ["", "  ", ".", "..", "../x", "a/b", "a\\b", "nul\0"] {
            assert!(
                matches!(validate_name(bad), Err(ApolloError::InvalidName { .. })),
                "{bad:?} accepted"
            );
        }
        for good in ["Quake", "my game", "v1.2", ".hidden", "doom-2_final"] {
            validate_name(good).unwrap();
        }
    }

    #[test]
    fn missing_file_gives_default_record() {
        let (_d, ctx) = ctx();
        let rec = load(&ctx, "ghost");
        assert_eq!(rec, AppRecord::new("ghost"));
        assert_eq!(rec.kind, Kind::Unknown);
        assert_eq!(rec.network, NetworkMode::Nat);
    }

    #[test]
    fn save_then_load_preserves_every_field() {
        let (_d, ctx) = ctx();
        let rec = full_record();
        save(&ctx, "Quake", &rec).unwrap();
        assert_eq!(load(&ctx, "Quake"), rec);
    }

    #[test]
    fn resave_is_byte_identical() {
        let (_d, ctx) = ctx();
        save(&ctx, "Quake", &full_record()).unwrap();
        let first = std::fs::read(ctx.config_file("Quake")).unwrap();
        save(&ctx, "Quake", &load(&ctx, "Quake")).unwrap();
        let second = std::fs::read(ctx.config_file("Quake")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_structured_fields_are_omitted() {
        let mut rec = AppRecord::new("bare");
        rec.kind = Kind::Script;
        let out = rec.to_toml().unwrap();
        assert!(out.contains("kind = \"script\""));
        assert!(out.contains("network = \"nat\""));
        assert!(!out.contains("environment"));
        assert!(!out.contains("mounts"));
        assert!(!out.contains("path"));
        assert!(!out.contains("arguments"));
    }

    #[test]
    fn malformed_structured_fields_degrade_individually() {
        let data = r#"
schema = 1
name = "Quake"
kind = "exe"
path = "/tmp/game.exe"
network = "warp"
mounts = ["no-colon-here"]
environment = "oops"
"#;
        let rec = AppRecord::from_toml("Quake", data).unwrap();
        assert_eq!(rec.kind, Kind::Exe);
        assert_eq!(rec.path, Some(PathBuf::from("/tmp/game.exe")));
        assert_eq!(rec.network, NetworkMode::Nat);
        assert!(rec.mounts.is_empty());
        assert!(rec.environment.is_empty());
    }

    #[test]
    fn non_string_env_value_drops_the_table() {
        let data = "kind = \"exe\"\n[environment]\nA = \"1\"\nB = 2\n";
        let rec = AppRecord::from_toml("x", data).unwrap();
        assert!(rec.environment.is_empty());
    }

    #[test]
    fn legacy_file_loads_and_migrates() {
        let (_d, ctx) = ctx();
        let legacy = "# Settings\n\nname = \"Quake\"\ntype = \"exe\"\npath = \"/tmp/q.exe\"\n\
environment = {\"WINEDEBUG\": \"-all\"}\nmounts = [\"/a:/b\"]\nnetwork = \"host\"\nnot a pair\n";
        std::fs::write(ctx.legacy_config_file("Quake"), legacy).unwrap();
        assert!(exists(&ctx, "Quake"));
        let rec = load(&ctx, "Quake");
        assert_eq!(rec.kind, Kind::Exe);
        assert_eq!(rec.environment.get("WINEDEBUG").map(String::as_str), Some("-all"));
        assert_eq!(rec.mounts, vec!["/a:/b".parse::<Mount>().unwrap()]);
        assert_eq!(rec.network, NetworkMode::Host);

        save(&ctx, "Quake", &rec).unwrap();
        assert!(!ctx.legacy_config_file("Quake").exists());
        assert_eq!(load(&ctx, "Quake"), rec);
    }

    #[test]
    fn legacy_malformed_json_degrades() {
        let data = "type = \"apk\"\nenvironment = {broken\nmounts = [1, 2]\n";
        let rec = AppRecord::from_legacy("x", data);
        assert_eq!(rec.kind, Kind::Apk);
        assert!(rec.environment.is_empty());
        assert!(rec.mounts.is_empty());
    }

    #[test]
    fn legacy_json_in_toml_file_falls_back() {
        let (_d, ctx) = ctx();
        std::fs::write(
            ctx.config_file("w"),
            "name = \"w\"\ntype = \"exe\"\nenvironment = {'A': 'b'}\n",
        )
        .unwrap();
        let rec = load(&ctx, "w");
        assert_eq!(rec.kind, Kind::Exe);
        assert_eq!(rec.environment.get("A").map(String::as_str), Some("b"));
    }

    #[test]
    fn list_and_remove() {
        let (_d, ctx) = ctx();
        save(&ctx, "b", &AppRecord::new("b")).unwrap();
        save(&ctx, "a", &AppRecord::new("a")).unwrap();
        std::fs::write(ctx.legacy_config_file("c"), "type = \"exe\"\n").unwrap();
        std::fs::write(ctx.configs_dir.join("notes.txt"), "x").unwrap();
        assert_eq!(list_names(&ctx).unwrap(), vec!["a", "b", "c"]);
        remove(&ctx, "b").unwrap();
        assert!(!exists(&ctx, "b"));
        assert_eq!(list_names(&ctx).unwrap(), vec!["a", "c"]);
    }

    #[test]
    fn argv_and_working_dir_helpers() {
        let mut rec = AppRecord::new("x");
        assert!(rec.argv().is_empty());
        assert_eq!(rec.working_dir(), None);
        rec.arguments = "  -a   b ".into();
        rec.working_dir = " ".into();
        assert_eq!(rec.argv(), vec!["-a", "b"]);
        assert_eq!(rec.working_dir(), None);
    }

    #[test]
    fn mount_parsing() {
        assert!("host".parse::<Mount>().is_err());
        assert!(":/c".parse::<Mount>().is_err());
        let m: Mount = "/h:/c".parse().unwrap();
        assert_eq!(m.to_string(), "/h:/c");
        assert!("WARP".parse::<NetworkMode>().is_err());
        assert_eq!("Host".parse::<NetworkMode>().unwrap(), NetworkMode::Host);
    }
}
