//! Maps the host operating system onto bundle asset names.

use std::fmt;

/// File stem shared by every bundle asset.
pub const BUNDLE_ASSET_STEM: &str = "codeql-bundle";

/// Operating systems with a dedicated bundle asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// 64-bit Windows.
    Windows,
    /// 64-bit Linux.
    Linux,
    /// 64-bit macOS.
    MacOs,
    /// Any other platform; served the generic, platform-independent bundle.
    Other,
}

impl Platform {
    /// Detects the platform the process is running on.
    #[must_use]
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Maps a [`std::env::consts::OS`] value onto a platform.
    #[must_use]
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Self::Windows,
            "linux" => Self::Linux,
            "macos" => Self::MacOs,
            _ => Self::Other,
        }
    }

    /// Returns the release asset name carrying the bundle for this platform.
    ///
    /// # Examples
    ///
    /// ```
    /// use codeql_bundle_setup::release::Platform;
    ///
    /// assert_eq!(Platform::Linux.asset_name(), "codeql-bundle-linux64.tar.gz");
    /// assert_eq!(Platform::Other.asset_name(), "codeql-bundle.tar.gz");
    /// ```
    #[must_use]
    pub fn asset_name(self) -> String {
        match self.asset_suffix() {
            Some(suffix) => format!("{BUNDLE_ASSET_STEM}-{suffix}.tar.gz"),
            None => format!("{BUNDLE_ASSET_STEM}.tar.gz"),
        }
    }

    const fn asset_suffix(self) -> Option<&'static str> {
        match self {
            Self::Windows => Some("win64"),
            Self::Linux => Some("linux64"),
            Self::MacOs => Some("osx64"),
            Self::Other => None,
        }
    }

    /// Name of the CLI executable shipped inside the bundle.
    #[must_use]
    pub const fn cli_executable(self) -> &'static str {
        match self {
            Self::Windows => "codeql.exe",
            Self::Linux | Self::MacOs | Self::Other => "codeql",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}
