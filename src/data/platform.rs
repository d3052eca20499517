//! Platform conventions for locating executables
//!
//! Each supported operating system gets one static `PlatformStrategy`
//! describing executable suffixes, package-manager install directories and
//! common fixed install locations. The strategy is picked once with
//! [`PlatformStrategy::current`] and handed to the resolver.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Windows,
    MacOs,
    Linux,
    /// Any other Unix-like system
    Unix,
}

impl Os {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => Os::Windows,
            "macos" => Os::MacOs,
            "linux" => Os::Linux,
            _ => Os::Unix,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Os::Windows => "Windows",
            Os::MacOs => "macOS",
            Os::Linux => "Linux",
            Os::Unix => "Unix",
        }
    }
}

/// A directory template that expands against the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Absolute directory
    Absolute(&'static str),
    /// Directory relative to the user's home
    Home(&'static str),
    /// Directory relative to the value of an environment variable
    Env(&'static str, &'static str),
}

/// Snapshot of the environment variables the resolver looks at
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, OsString>,
    home: Option<PathBuf>,
}

impl EnvSnapshot {
    /// Capture the current process environment
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| k.into_string().ok().map(|k| (k, v)))
                .collect(),
            home: dirs::home_dir(),
        }
    }

    /// Empty environment (testing)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, key: &str, value: impl Into<OsString>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn var(&self, key: &str) -> Option<&OsString> {
        self.vars.get(key).filter(|v| !v.is_empty())
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }
}

impl Location {
    /// Expand to a concrete directory, if the environment provides the base
    pub fn expand(&self, env: &EnvSnapshot) -> Option<PathBuf> {
        match self {
            Location::Absolute(dir) => Some(PathBuf::from(dir)),
            Location::Home(rel) => env.home().map(|h| join_relative(h, rel)),
            Location::Env(var, rel) => env.var(var).map(|v| join_relative(Path::new(v), rel)),
        }
    }
}

fn join_relative(base: &Path, rel: &str) -> PathBuf {
    if rel.is_empty() {
        base.to_path_buf()
    } else {
        rel.split('/').fold(base.to_path_buf(), |acc, part| acc.join(part))
    }
}

/// Path conventions for one operating system
#[derive(Debug)]
pub struct PlatformStrategy {
    pub os: Os,
    /// Suffixes tried after the bare name, in order
    pub executable_suffixes: &'static [&'static str],
    /// Subdirectory of the npm prefix holding global executables
    pub npm_prefix_bin: &'static str,
    /// Package-manager global install directories
    pub package_manager_dirs: &'static [Location],
    /// Common fixed install locations
    pub fixed_dirs: &'static [Location],
    /// Package runner used as last resort for npm tools
    pub package_runner: &'static str,
}

static WINDOWS: PlatformStrategy = PlatformStrategy {
    os: Os::Windows,
    executable_suffixes: &[".exe", ".cmd", ".bat"],
    npm_prefix_bin: "",
    package_manager_dirs: &[
        Location::Env("NPM_CONFIG_PREFIX", ""),
        Location::Env("APPDATA", "npm"),
        Location::Env("PNPM_HOME", ""),
        Location::Env("LOCALAPPDATA", "pnpm"),
        Location::Env("LOCALAPPDATA", "Yarn/bin"),
        Location::Env("VOLTA_HOME", "bin"),
        Location::Env("NVM_SYMLINK", ""),
    ],
    fixed_dirs: &[
        Location::Env("LOCALAPPDATA", "Pandoc"),
        Location::Env("ProgramFiles", "Pandoc"),
        Location::Env("ProgramFiles", "nodejs"),
        Location::Absolute("C:\\Program Files\\Pandoc"),
        Location::Absolute("C:\\Program Files (x86)\\Pandoc"),
        Location::Env("ChocolateyInstall", "bin"),
        Location::Home("scoop/shims"),
    ],
    package_runner: "npx",
};

static MACOS: PlatformStrategy = PlatformStrategy {
    os: Os::MacOs,
    executable_suffixes: &[],
    npm_prefix_bin: "bin",
    package_manager_dirs: &[
        Location::Env("NPM_CONFIG_PREFIX", "bin"),
        Location::Home(".npm-global/bin"),
        Location::Env("PNPM_HOME", ""),
        Location::Home("Library/pnpm"),
        Location::Home(".yarn/bin"),
        Location::Home(".config/yarn/global/node_modules/.bin"),
        Location::Env("VOLTA_HOME", "bin"),
        Location::Home(".volta/bin"),
        Location::Env("NVM_BIN", ""),
    ],
    fixed_dirs: &[
        Location::Absolute("/opt/homebrew/bin"),
        Location::Absolute("/usr/local/bin"),
        Location::Absolute("/usr/bin"),
        Location::Absolute("/opt/local/bin"),
        Location::Home(".local/bin"),
        Location::Home(".cabal/bin"),
    ],
    package_runner: "npx",
};

static LINUX: PlatformStrategy = PlatformStrategy {
    os: Os::Linux,
    executable_suffixes: &[],
    npm_prefix_bin: "bin",
    package_manager_dirs: &[
        Location::Env("NPM_CONFIG_PREFIX", "bin"),
        Location::Home(".npm-global/bin"),
        Location::Env("PNPM_HOME", ""),
        Location::Home(".local/share/pnpm"),
        Location::Home(".yarn/bin"),
        Location::Home(".config/yarn/global/node_modules/.bin"),
        Location::Env("VOLTA_HOME", "bin"),
        Location::Home(".volta/bin"),
        Location::Env("NVM_BIN", ""),
    ],
    fixed_dirs: &[
        Location::Absolute("/usr/local/bin"),
        Location::Absolute("/usr/bin"),
        Location::Absolute("/snap/bin"),
        Location::Home(".local/bin"),
        Location::Home(".cabal/bin"),
        Location::Home(".nix-profile/bin"),
    ],
    package_runner: "npx",
};

static UNIX: PlatformStrategy = PlatformStrategy {
    os: Os::Unix,
    executable_suffixes: &[],
    npm_prefix_bin: "bin",
    package_manager_dirs: &[
        Location::Env("NPM_CONFIG_PREFIX", "bin"),
        Location::Home(".npm-global/bin"),
        Location::Env("PNPM_HOME", ""),
        Location::Env("NVM_BIN", ""),
    ],
    fixed_dirs: &[
        Location::Absolute("/usr/local/bin"),
        Location::Absolute("/usr/bin"),
        Location::Home(".local/bin"),
    ],
    package_runner: "npx",
};

impl PlatformStrategy {
    /// Strategy for the running operating system
    pub fn current() -> &'static PlatformStrategy {
        Self::for_os(Os::current())
    }

    pub fn for_os(os: Os) -> &'static PlatformStrategy {
        match os {
            Os::Windows => &WINDOWS,
            Os::MacOs => &MACOS,
            Os::Linux => &LINUX,
            Os::Unix => &UNIX,
        }
    }

    /// File names to look for in a directory, bare name first
    pub fn executable_names(&self, base: &str) -> Vec<String> {
        let mut names = vec![base.to_string()];
        names.extend(
            self.executable_suffixes
                .iter()
                .map(|suffix| format!("{}{}", base, suffix)),
        );
        names
    }

    /// Directory holding global executables for a given npm prefix
    pub fn npm_bin_dir(&self, prefix: &Path) -> PathBuf {
        join_relative(prefix, self.npm_prefix_bin)
    }
}
