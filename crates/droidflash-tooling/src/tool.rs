//! The three supported external tools and their executable resolution

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use droidflash_core::error::Error;

/// The external tools droidflash is allowed to invoke
///
/// The whitelist is the type: nothing outside these three binaries can be
/// spawned through this crate. Parsing an unknown tool name is a fatal
/// programming/configuration error, not a user-facing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Adb,
    Fastboot,
    Heimdall,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Adb, Tool::Fastboot, Tool::Heimdall];

    pub fn name(self) -> &'static str {
        match self {
            Tool::Adb => "adb",
            Tool::Fastboot => "fastboot",
            Tool::Heimdall => "heimdall",
        }
    }

    /// Resolve the platform-specific executable under the binaries directory
    ///
    /// Appends `.exe` on Windows. Falls back to a PATH install (via `which`)
    /// when the bundled binary is missing; if neither exists the bundled path
    /// is returned anyway and the spawn will report the failure.
    pub fn executable(self, bin_dir: &Path) -> PathBuf {
        let file_name = if cfg!(windows) {
            format!("{}.exe", self.name())
        } else {
            self.name().to_string()
        };
        let bundled = bin_dir.join(file_name);
        if bundled.exists() {
            return bundled;
        }
        which::which(self.name()).unwrap_or(bundled)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| Error::unknown_tool(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_parse() {
        for tool in Tool::ALL {
            assert_eq!(tool.name().parse::<Tool>().unwrap(), tool);
        }
    }

    #[test]
    fn test_unknown_tool_is_fatal() {
        let err = "magiskboot".parse::<Tool>().unwrap_err();
        assert!(matches!(err, Error::UnknownTool { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_bundled_binary_is_preferred() {
        let dir = tempfile::TempDir::new().unwrap();
        let name = if cfg!(windows) { "adb.exe" } else { "adb" };
        let bundled = dir.path().join(name);
        std::fs::write(&bundled, b"").unwrap();

        assert_eq!(Tool::Adb.executable(dir.path()), bundled);
    }
}
