use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Closed classification of an application payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Exe,
    Apk,
    Macos,
    Linux,
    Script,
    #[default]
    Unknown,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Exe => "exe",
            Kind::Apk => "apk",
            Kind::Macos => "macos",
            Kind::Linux => "linux",
            Kind::Script => "script",
            Kind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = std::convert::Infallible;

    /// Anything unrecognised parses as `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "exe" => Kind::Exe,
            "apk" => Kind::Apk,
            "macos" => Kind::Macos,
            "linux" => Kind::Linux,
            "script" => Kind::Script,
            _ => Kind::Unknown,
        })
    }
}

const EXTENSIONS: &[(&str, Kind)] = &[
    ("exe", Kind::Exe),
    ("msi", Kind::Exe),
    ("apk", Kind::Apk),
    ("dmg", Kind::Macos),
    ("app", Kind::Macos),
    ("pkg", Kind::Macos),
    ("deb", Kind::Linux),
    ("rpm", Kind::Linux),
    ("sh", Kind::Script),
    ("bash", Kind::Script),
];

/// Classify `path`. The extension wins over the file's magic bytes; with no
/// known extension the first four bytes are sniffed. `None` means the
/// payload is not recognised, including when it cannot be read.
pub fn detect(path: &Path) -> Option<Kind> {
    if let Some(kind) = kind_from_extension(path) {
        return Some(kind);
    }
    sniff_magic(path)
}

pub fn kind_from_extension(path: &Path) -> Option<Kind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, kind)| *kind)
}

fn sniff_magic(path: &Path) -> Option<Kind> {
    let mut header = Vec::with_capacity(4);
    let file = std::fs::File::open(path).ok()?;
    file.take(4).read_to_end(&mut header).ok()?;
    kind_from_magic(&header)
}

pub fn kind_from_magic(header: &[u8]) -> Option<Kind> {
    if header.starts_with(b"MZ") {
        Some(Kind::Exe)
    } else if header.starts_with(b"\x7fELF") {
        Some(Kind::Linux)
    } else {
        None
    }
}
