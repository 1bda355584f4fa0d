//! Translation of foreign mount paths (`/mnt/<letter>/...`) into native
//! drive-letter paths (`<LETTER>:\...`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

use crate::error::DotbridgeError;

/// Prefix under which the calling environment mounts host volumes
pub const MOUNT_PREFIX: &str = "/mnt/";

/// Path convention of the host that executes the toolchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostConvention {
    Windows,
    Posix,
}

impl HostConvention {
    pub fn current() -> Self {
        if cfg!(windows) {
            HostConvention::Windows
        } else {
            HostConvention::Posix
        }
    }
}

/// Configured path style; `Auto` follows the platform the server runs on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStyle {
    #[default]
    Auto,
    Windows,
    Posix,
}

impl PathStyle {
    pub fn resolve(self) -> HostConvention {
        match self {
            PathStyle::Auto => HostConvention::current(),
            PathStyle::Windows => HostConvention::Windows,
            PathStyle::Posix => HostConvention::Posix,
        }
    }
}

impl FromStr for PathStyle {
    type Err = DotbridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(PathStyle::Auto),
            "windows" => Ok(PathStyle::Windows),
            "posix" => Ok(PathStyle::Posix),
            other => Err(DotbridgeError::InvalidConfiguration(format!(
                "unknown path style '{}', expected auto, windows or posix",
                other
            ))),
        }
    }
}

impl fmt::Display for PathStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PathStyle::Auto => "auto",
            PathStyle::Windows => "windows",
            PathStyle::Posix => "posix",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PathTranslator {
    host: HostConvention,
}

impl PathTranslator {
    pub fn new(host: HostConvention) -> Self {
        Self { host }
    }

    pub fn from_style(style: PathStyle) -> Self {
        Self::new(style.resolve())
    }

    /// Whether foreign paths are rewritten at all on this host
    pub fn is_translating(&self) -> bool {
        self.host == HostConvention::Windows
    }

    /// Translate a foreign mount path into the native convention.
    ///
    /// Anything that is not shaped like `/mnt/<letter>/...` comes back
    /// unchanged, so translating an already-native path is a no-op.
    pub fn translate(&self, path: &str) -> String {
        if path.is_empty() || !self.is_translating() {
            return path.to_string();
        }

        match convert_mount_path(path) {
            Some(converted) => {
                debug!(input = %path, output = %converted, "Translated mount path");
                converted
            }
            None => {
                debug!(input = %path, "Path left unchanged");
                path.to_string()
            }
        }
    }

    /// Like [`translate`](Self::translate) but preserves absence
    pub fn translate_opt(&self, path: Option<&str>) -> Option<String> {
        path.map(|p| self.translate(p))
    }
}

impl Default for PathTranslator {
    fn default() -> Self {
        Self::new(HostConvention::current())
    }
}

fn convert_mount_path(path: &str) -> Option<String> {
    let rest = path.strip_prefix(MOUNT_PREFIX)?;
    let mut chars = rest.chars();
    let letter = chars.next().filter(char::is_ascii_alphabetic)?;
    let remainder = chars.as_str().strip_prefix('/')?;

    Some(format!(
        "{}:\\{}",
        letter.to_ascii_uppercase(),
        remainder.replace('/', "\\")
    ))
}

/// Directory containing `path`, accepting either separator.
///
/// Returns `None` for a bare file name.
pub fn project_dir(path: &str) -> Option<PathBuf> {
    let idx = path.rfind(['/', '\\'])?;
    let with_separator = &path[..=idx];
    let dir = with_separator.trim_end_matches(['/', '\\']);

    // Keep the separator for roots: "/" and "C:\"
    if dir.is_empty() || dir.ends_with(':') {
        Some(PathBuf::from(with_separator))
    } else {
        Some(PathBuf::from(dir))
    }
}
