//! Installation instruction tables
//!
//! Maps operating systems and Linux distributions to the commands that
//! install each external tool.

use phf::phf_map;

use super::platform::Os;
use super::tools::{Distribution, Tool};

/// Linux distribution ID (from os-release) to Pandoc install command
pub static LINUX_PANDOC_COMMANDS: phf::Map<&'static str, &'static str> = phf_map! {
    // ---- apt ----
    "ubuntu" => "sudo apt update && sudo apt install pandoc",
    "debian" => "sudo apt update && sudo apt install pandoc",
    "linuxmint" => "sudo apt update && sudo apt install pandoc",
    "pop" => "sudo apt update && sudo apt install pandoc",
    "raspbian" => "sudo apt update && sudo apt install pandoc",
    // ---- dnf / yum ----
    "fedora" => "sudo dnf install pandoc",
    "rhel" => "sudo dnf install pandoc",
    "rocky" => "sudo dnf install pandoc",
    "almalinux" => "sudo dnf install pandoc",
    "centos" => "sudo yum install pandoc",
    // ---- pacman ----
    "arch" => "sudo pacman -S pandoc",
    "manjaro" => "sudo pacman -S pandoc",
    "endeavouros" => "sudo pacman -S pandoc",
    // ---- others ----
    "opensuse" => "sudo zypper install pandoc",
    "opensuse-leap" => "sudo zypper install pandoc",
    "opensuse-tumbleweed" => "sudo zypper install pandoc",
    "suse" => "sudo zypper install pandoc",
    "alpine" => "sudo apk add pandoc",
    "nixos" => "nix-env -iA nixpkgs.pandoc",
};

/// Fallback when the distribution is unknown
pub const LINUX_PANDOC_GENERAL: &str = "sudo apt install pandoc (Ubuntu/Debian)";

/// Look up the Pandoc install command for a distribution and its parents
pub fn linux_pandoc_command<'a>(ids: impl IntoIterator<Item = &'a str>) -> Option<&'static str> {
    ids.into_iter()
        .find_map(|id| LINUX_PANDOC_COMMANDS.get(id).copied())
}

/// The shell command (or download pointer) that installs `tool` on `os`
///
/// `distro_ids` is the os-release `ID` followed by `ID_LIKE` entries and is
/// only consulted on Linux.
pub fn install_command(tool: Tool, os: Os, distro_ids: &[String]) -> String {
    match tool.distribution() {
        Distribution::Npm { package } => format!("npm install -g {}", package),
        Distribution::Native => match os {
            Os::Windows => format!("Download installer from {} (or: winget install JohnMacFarlane.Pandoc)", tool.homepage()),
            Os::MacOs => "brew install pandoc".to_string(),
            Os::Linux => linux_pandoc_command(distro_ids.iter().map(String::as_str))
                .unwrap_or(LINUX_PANDOC_GENERAL)
                .to_string(),
            Os::Unix => format!("See {}", tool.homepage()),
        },
    }
}
