//! Installation instructions and automatic installs
//!
//! Instructions are shown for every platform, with the Linux line tailored
//! to the detected distribution. Only npm-distributed tools can be installed
//! automatically; Pandoc needs a system installer.
//!
//! ## Example
//!
//! ```rust
//! use md2docx::installer::instructions;
//! use md2docx::{LinuxDistro, Tool};
//!
//! let distro = LinuxDistro::parse("ID=fedora\n");
//! let text = instructions(&[Tool::Pandoc], &distro);
//! assert!(text.contains("Linux (fedora): sudo dnf install pandoc"));
//! ```

use std::fmt::Write;

use tracing::{info, warn};

use crate::core::resolver::{Resolution, Resolver, ResolverConfig};
use crate::data::constants::INSTALL_TIMEOUT;
use crate::data::install::install_command;
use crate::data::platform::Os;
use crate::data::tools::{Distribution, Tool};
use crate::utils::error::{ConversionError, ConversionResult};
use crate::utils::files::LinuxDistro;
use crate::utils::process::{CommandRunner, Invocation, RunError};

const RULE_WIDTH: usize = 50;

/// Installation instructions for `tools` on every platform
pub fn instructions(tools: &[Tool], distro: &LinuxDistro) -> String {
    let mut out = String::new();
    if tools.is_empty() {
        out.push_str("All dependencies are already installed.\n");
        return out;
    }

    let _ = writeln!(out, "Installation Instructions:");
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));

    let ids = distro.ids();
    for tool in tools {
        let _ = writeln!(out, "\n{} ({}):", tool.display_name(), tool.binary_name());
        let _ = writeln!(out, "{}", "-".repeat(20));
        let _ = writeln!(out, "Windows: {}", install_command(*tool, Os::Windows, &[]));
        let _ = writeln!(out, "macOS: {}", install_command(*tool, Os::MacOs, &[]));

        let linux = install_command(*tool, Os::Linux, &ids);
        match (&tool.distribution(), &distro.id) {
            (Distribution::Native, Some(id)) => {
                let _ = writeln!(out, "Linux ({}): {}", id, linux);
            }
            _ => {
                let _ = writeln!(out, "Linux: {}", linux);
            }
        }
        let _ = writeln!(out, "More: {}", tool.homepage());
    }

    let _ = writeln!(out, "\n{}", "=".repeat(RULE_WIDTH));
    let _ = writeln!(out, "After installing dependencies, run `md2docx check` again to verify.");
    out
}

/// Installs npm-distributed tools through npm
pub struct Installer<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    config: &'a ResolverConfig,
}

impl<'a, R: CommandRunner + ?Sized> Installer<'a, R> {
    pub fn new(runner: &'a R, config: &'a ResolverConfig) -> Self {
        Self { runner, config }
    }

    /// The install command line, or why there is none
    pub fn invocation(&self, tool: Tool) -> ConversionResult<Invocation> {
        let Distribution::Npm { package } = tool.distribution() else {
            return Err(ConversionError::InstallUnsupported(tool));
        };
        let npm = Resolver::new(self.config, self.runner)
            .find_on_search_path("npm")
            .ok_or(ConversionError::PackageManagerMissing("npm"))?;
        Ok(Invocation::new(npm).args(["install", "-g", package]))
    }

    /// Install `tool`, then resolve it again
    ///
    /// A successful install whose binary is still not found usually means
    /// the npm global bin directory is not on `PATH`; the returned
    /// resolution shows it as missing.
    pub fn install(&self, tool: Tool) -> ConversionResult<Resolution> {
        let invocation = self.invocation(tool)?;
        info!(command = %invocation.command_line(), "installing {}", tool.display_name());

        match self.runner.run(&invocation, INSTALL_TIMEOUT) {
            Ok(out) if out.success() => {}
            Ok(out) => {
                return Err(ConversionError::InstallFailed {
                    tool,
                    detail: out.error_text().to_string(),
                })
            }
            Err(RunError::Timeout(timeout)) => {
                return Err(ConversionError::InstallFailed {
                    tool,
                    detail: format!("npm did not finish within {}s", timeout.as_secs()),
                })
            }
            Err(RunError::NotFound(_)) => return Err(ConversionError::PackageManagerMissing("npm")),
            Err(RunError::Io { source, .. }) => return Err(ConversionError::Io(source)),
        }

        let resolution = Resolver::new(self.config, self.runner).resolve(tool);
        if !resolution.is_found() {
            warn!(tool = %tool, "installed but not found; is the npm global bin directory on PATH?");
        }
        Ok(resolution)
    }
}
