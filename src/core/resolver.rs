//! Dependency resolver
//!
//! Locates the external tools and validates that each candidate actually
//! runs. Strategies are tried in order:
//!
//! 1. explicit user-supplied path
//! 2. the executable search path (`PATH`)
//! 3. package-manager global install directories (npm prefix, pnpm, yarn, ...)
//! 4. common fixed install locations
//! 5. `npx --no-install <tool>` for npm-distributed tools
//!
//! A candidate is accepted when `<candidate> --version` exits with status 0
//! within the probe timeout. Candidates that exist but fail the probe are
//! kept as [`RejectedCandidate`]s so the user can see why they were skipped.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::data::constants::{NPM_PREFIX_TIMEOUT, PROBE_TIMEOUT};
use crate::data::platform::{EnvSnapshot, PlatformStrategy};
use crate::data::tools::{Distribution, Tool};
use crate::utils::process::{CommandRunner, Invocation, RunError};

/// Resolution strategy that produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Explicit,
    SearchPath,
    PackageManager,
    FixedLocation,
    PackageRunner,
}

impl Strategy {
    pub fn describe(&self) -> &'static str {
        match self {
            Strategy::Explicit => "explicit path",
            Strategy::SearchPath => "PATH",
            Strategy::PackageManager => "package manager directory",
            Strategy::FixedLocation => "common install location",
            Strategy::PackageRunner => "package runner",
        }
    }
}

/// How to invoke a resolved tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolLocation {
    pub program: PathBuf,
    /// Arguments placed before the tool's own (only for the package runner)
    pub leading_args: Vec<String>,
    pub strategy: Strategy,
    /// First line of the version output
    pub version: Option<String>,
}

impl ToolLocation {
    /// Start an invocation of this tool
    pub fn invocation(&self) -> Invocation {
        Invocation::new(&self.program).args(&self.leading_args)
    }
}

/// A candidate that was found but did not pass validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedCandidate {
    pub path: PathBuf,
    pub strategy: Strategy,
    pub reason: String,
}

/// Outcome of resolving one tool
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub tool: Tool,
    pub location: Option<ToolLocation>,
    pub rejected: Vec<RejectedCandidate>,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        self.location.is_some()
    }
}

/// Resolutions for every tool of one run
///
/// This is the explicit resolved configuration handed to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ResolvedTools {
    resolutions: IndexMap<Tool, Resolution>,
}

impl ResolvedTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resolution: Resolution) {
        self.resolutions.insert(resolution.tool, resolution);
    }

    pub fn get(&self, tool: Tool) -> Option<&Resolution> {
        self.resolutions.get(&tool)
    }

    pub fn location(&self, tool: Tool) -> Option<&ToolLocation> {
        self.get(tool).and_then(|r| r.location.as_ref())
    }

    /// Tools that were looked for and not found
    pub fn missing(&self) -> Vec<Tool> {
        self.resolutions
            .values()
            .filter(|r| !r.is_found())
            .map(|r| r.tool)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resolution> {
        self.resolutions.values()
    }
}

/// Inputs to the resolver
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// User-supplied tool paths
    pub explicit: IndexMap<Tool, PathBuf>,
    /// Search path override; `PATH` from `env` when unset
    pub search_path: Option<OsString>,
    /// Directory relative search path entries are resolved against
    pub cwd: PathBuf,
    pub env: EnvSnapshot,
    pub platform: &'static PlatformStrategy,
    pub probe_timeout: Duration,
    pub npm_prefix_timeout: Duration,
    /// Allow the `npx --no-install` fallback
    pub use_package_runner: bool,
}

impl ResolverConfig {
    /// Configuration for the running process
    pub fn from_process() -> Self {
        Self {
            explicit: IndexMap::new(),
            search_path: None,
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env: EnvSnapshot::from_process(),
            platform: PlatformStrategy::current(),
            probe_timeout: PROBE_TIMEOUT,
            npm_prefix_timeout: NPM_PREFIX_TIMEOUT,
            use_package_runner: true,
        }
    }

    /// Configuration that only sees `search_path` and an empty environment
    pub fn isolated(search_path: impl Into<OsString>) -> Self {
        Self {
            explicit: IndexMap::new(),
            search_path: Some(search_path.into()),
            cwd: PathBuf::from("."),
            env: EnvSnapshot::empty(),
            platform: PlatformStrategy::current(),
            probe_timeout: PROBE_TIMEOUT,
            npm_prefix_timeout: NPM_PREFIX_TIMEOUT,
            use_package_runner: true,
        }
    }

    pub fn with_explicit(mut self, tool: Tool, path: impl Into<PathBuf>) -> Self {
        self.explicit.insert(tool, path.into());
        self
    }

    /// Add an explicit path when one is given
    pub fn with_optional(self, tool: Tool, path: Option<&Path>) -> Self {
        match path {
            Some(p) => self.with_explicit(tool, p),
            None => self,
        }
    }

    pub fn with_env(mut self, env: EnvSnapshot) -> Self {
        self.env = env;
        self
    }

    pub fn with_platform(mut self, platform: &'static PlatformStrategy) -> Self {
        self.platform = platform;
        self
    }

    pub fn without_package_runner(mut self) -> Self {
        self.use_package_runner = false;
        self
    }

    fn search_path(&self) -> Option<OsString> {
        self.search_path
            .clone()
            .or_else(|| self.env.var("PATH").cloned())
    }
}

/// Resolves tools with a runner used for validation probes
pub struct Resolver<'a, R: CommandRunner + ?Sized> {
    config: &'a ResolverConfig,
    runner: &'a R,
}

/// Candidate bookkeeping for one resolution
struct Search {
    seen: HashSet<PathBuf>,
    rejected: Vec<RejectedCandidate>,
}

impl<'a, R: CommandRunner + ?Sized> Resolver<'a, R> {
    pub fn new(config: &'a ResolverConfig, runner: &'a R) -> Self {
        Self { config, runner }
    }

    /// Resolve every tool in `tools`
    pub fn resolve_all(&self, tools: &[Tool]) -> ResolvedTools {
        let mut resolved = ResolvedTools::new();
        for tool in tools {
            resolved.insert(self.resolve(*tool));
        }
        resolved
    }

    /// Resolve one tool through every strategy
    pub fn resolve(&self, tool: Tool) -> Resolution {
        let mut search = Search {
            seen: HashSet::new(),
            rejected: Vec::new(),
        };

        let location = self
            .try_explicit(tool, &mut search)
            .or_else(|| self.try_search_path(tool, &mut search))
            .or_else(|| {
                let dirs = self.package_manager_dirs(tool);
                self.try_dirs(tool, &dirs, Strategy::PackageManager, &mut search)
            })
            .or_else(|| {
                let dirs = self.fixed_dirs();
                self.try_dirs(tool, &dirs, Strategy::FixedLocation, &mut search)
            })
            .or_else(|| self.try_package_runner(tool, &mut search));

        match &location {
            Some(loc) => info!(
                tool = %tool,
                program = %loc.program.display(),
                strategy = loc.strategy.describe(),
                "resolved"
            ),
            None => info!(tool = %tool, rejected = search.rejected.len(), "not found"),
        }

        Resolution {
            tool,
            location,
            rejected: search.rejected,
        }
    }

    /// Locate a helper program (e.g. `npm`) on the search path without probing it
    pub fn find_on_search_path(&self, name: &str) -> Option<PathBuf> {
        let paths = self.config.search_path()?;
        which::which_in(name, Some(paths), &self.config.cwd).ok()
    }

    fn try_explicit(&self, tool: Tool, search: &mut Search) -> Option<ToolLocation> {
        let path = self.config.explicit.get(&tool)?;
        debug!(tool = %tool, path = %path.display(), "trying explicit path");

        // A bare command name is looked up on the search path
        let is_bare_name = path.components().count() == 1 && !path.is_file();
        let candidate = if is_bare_name {
            match path.to_str().and_then(|name| self.find_on_search_path(name)) {
                Some(found) => found,
                None => {
                    search.reject(path, Strategy::Explicit, "not found on PATH");
                    return None;
                }
            }
        } else if path.is_file() {
            path.clone()
        } else {
            search.reject(path, Strategy::Explicit, "file does not exist");
            return None;
        };

        self.validate(tool, candidate, Vec::new(), Strategy::Explicit, search)
    }

    fn try_search_path(&self, tool: Tool, search: &mut Search) -> Option<ToolLocation> {
        let paths = self.config.search_path()?;
        debug!(tool = %tool, "trying search path");
        let candidates = which::which_in_all(tool.binary_name(), Some(paths), &self.config.cwd)
            .map(|iter| iter.collect::<Vec<_>>())
            .unwrap_or_default();

        candidates.into_iter().find_map(|candidate| {
            self.validate(tool, candidate, Vec::new(), Strategy::SearchPath, search)
        })
    }

    fn try_dirs(
        &self,
        tool: Tool,
        dirs: &[PathBuf],
        strategy: Strategy,
        search: &mut Search,
    ) -> Option<ToolLocation> {
        let names = self.config.platform.executable_names(tool.binary_name());
        dirs.iter()
            .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
            .filter(|candidate| candidate.is_file())
            .find_map(|candidate| self.validate(tool, candidate, Vec::new(), strategy, search))
    }

    fn try_package_runner(&self, tool: Tool, search: &mut Search) -> Option<ToolLocation> {
        if !self.config.use_package_runner {
            return None;
        }
        let Distribution::Npm { .. } = tool.distribution() else {
            return None;
        };
        let runner = self.find_on_search_path(self.config.platform.package_runner)?;
        debug!(tool = %tool, runner = %runner.display(), "trying package runner");
        let leading = vec!["--no-install".to_string(), tool.binary_name().to_string()];
        self.validate(tool, runner, leading, Strategy::PackageRunner, search)
    }

    /// Package-manager directories, npm prefix first
    fn package_manager_dirs(&self, tool: Tool) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Distribution::Npm { .. } = tool.distribution() {
            if let Some(prefix) = self.npm_prefix() {
                dirs.push(self.config.platform.npm_bin_dir(&prefix));
            }
        }
        dirs.extend(
            self.config
                .platform
                .package_manager_dirs
                .iter()
                .filter_map(|loc| loc.expand(&self.config.env)),
        );
        dedup(dirs)
    }

    fn fixed_dirs(&self) -> Vec<PathBuf> {
        dedup(
            self.config
                .platform
                .fixed_dirs
                .iter()
                .filter_map(|loc| loc.expand(&self.config.env))
                .collect(),
        )
    }

    /// `npm config get prefix`, when npm is available
    fn npm_prefix(&self) -> Option<PathBuf> {
        let npm = self.find_on_search_path("npm")?;
        let invocation = Invocation::new(npm).args(["config", "get", "prefix"]);
        match self.runner.run(&invocation, self.config.npm_prefix_timeout) {
            Ok(out) if out.success() => {
                let prefix = out.stdout.trim();
                (!prefix.is_empty()).then(|| PathBuf::from(prefix))
            }
            Ok(out) => {
                debug!(code = ?out.code, "npm prefix query failed");
                None
            }
            Err(e) => {
                debug!(error = %e, "npm prefix query failed");
                None
            }
        }
    }

    /// Probe a candidate with its version flag
    fn validate(
        &self,
        tool: Tool,
        program: PathBuf,
        leading_args: Vec<String>,
        strategy: Strategy,
        search: &mut Search,
    ) -> Option<ToolLocation> {
        let key = program.join(leading_args.join(" "));
        if !search.seen.insert(key) {
            return None;
        }

        let location = ToolLocation {
            program,
            leading_args,
            strategy,
            version: None,
        };
        let probe = location.invocation().arg(tool.version_flag());
        debug!(command = %probe.command_line(), "probing");

        let reason = match self.runner.run(&probe, self.config.probe_timeout) {
            Ok(out) if out.success() => {
                let version = out
                    .stdout
                    .lines()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .map(str::to_string);
                return Some(ToolLocation { version, ..location });
            }
            Ok(out) => format!(
                "version check exited with {}: {}",
                out.code
                    .map_or_else(|| "a signal".to_string(), |c| format!("code {}", c)),
                out.error_text().lines().next().unwrap_or("").trim()
            ),
            Err(RunError::Timeout(t)) => format!("version check timed out after {:?}", t),
            Err(RunError::NotFound(_)) => "could not be executed".to_string(),
            Err(e) => e.to_string(),
        };

        debug!(program = %location.program.display(), %reason, "rejected");
        search.reject(&location.program, strategy, reason);
        None
    }
}

impl Search {
    fn reject(&mut self, path: &Path, strategy: Strategy, reason: impl Into<String>) {
        self.rejected.push(RejectedCandidate {
            path: path.to_path_buf(),
            strategy,
            reason: reason.into(),
        });
    }
}

fn dedup(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    dirs.into_iter().filter(|d| seen.insert(d.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::platform::{Location, Os};
    use crate::utils::process::{ProcessOutput, ScriptedRunner};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    static TEST_PLATFORM: PlatformStrategy = PlatformStrategy {
        os: Os::Linux,
        executable_suffixes: &[],
        npm_prefix_bin: "bin",
        package_manager_dirs: &[Location::Home(".npm-global/bin")],
        fixed_dirs: &[Location::Home(".local/bin")],
        package_runner: "npx",
    };

    fn touch_executable(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    /// Home directory with an empty `bin` search path
    fn sandbox() -> (TempDir, ResolverConfig) {
        let home = tempdir().unwrap();
        let bin = home.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let config = ResolverConfig::isolated(bin.as_os_str())
            .with_env(EnvSnapshot::empty().with_home(home.path()))
            .with_platform(&TEST_PLATFORM);
        (home, config)
    }

    #[test]
    fn test_missing_everywhere() {
        let (_home, config) = sandbox();
        let runner = ScriptedRunner::new();
        let resolution = Resolver::new(&config, &runner).resolve(Tool::Pandoc);
        assert!(!resolution.is_found());
        assert!(resolution.rejected.is_empty());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_explicit_path_wins() {
        let (home, config) = sandbox();
        let custom = home.path().join("tools").join("mmdc");
        touch_executable(&custom);
        touch_executable(&home.path().join("bin").join("mmdc"));

        let config = config.with_explicit(Tool::Mmdc, &custom);
        let runner = ScriptedRunner::new().on_success("mmdc", "11.4.2\n");
        let resolution = Resolver::new(&config, &runner).resolve(Tool::Mmdc);

        let location = resolution.location.unwrap();
        assert_eq!(location.program, custom);
        assert_eq!(location.strategy, Strategy::Explicit);
        assert_eq!(location.version.as_deref(), Some("11.4.2"));
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_missing_explicit_falls_back_to_search_path() {
        let (home, config) = sandbox();
        let on_path = home.path().join("bin").join("pandoc");
        touch_executable(&on_path);

        let config = config.with_explicit(Tool::Pandoc, home.path().join("nope").join("pandoc"));
        let runner = ScriptedRunner::new().on_success("pandoc", "pandoc 3.1.11");
        let resolution = Resolver::new(&config, &runner).resolve(Tool::Pandoc);

        assert_eq!(resolution.location.as_ref().unwrap().strategy, Strategy::SearchPath);
        assert_eq!(resolution.rejected.len(), 1);
        assert_eq!(resolution.rejected[0].strategy, Strategy::Explicit);
        assert_eq!(resolution.rejected[0].reason, "file does not exist");
    }

    #[test]
    fn test_broken_candidate_is_rejected_and_search_continues() {
        let (home, config) = sandbox();
        let on_path = home.path().join("bin").join("mmdc");
        let npm_global = home.path().join(".npm-global").join("bin").join("mmdc");
        touch_executable(&on_path);
        touch_executable(&npm_global);

        let broken = on_path.clone();
        let runner = ScriptedRunner::new().on("mmdc", move |inv| {
            if inv.program == broken {
                Ok(ProcessOutput::failed(1, "Error: Cannot find module 'puppeteer'"))
            } else {
                Ok(ProcessOutput::ok("11.4.2"))
            }
        });
        let resolution = Resolver::new(&config, &runner).resolve(Tool::Mmdc);

        let location = resolution.location.unwrap();
        assert_eq!(location.program, npm_global);
        assert_eq!(location.strategy, Strategy::PackageManager);
        assert_eq!(resolution.rejected.len(), 1);
        assert_eq!(
            resolution.rejected[0].reason,
            "version check exited with code 1: Error: Cannot find module 'puppeteer'"
        );
    }

    #[test]
    fn test_fixed_location() {
        let (home, config) = sandbox();
        let local = home.path().join(".local").join("bin").join("pandoc");
        touch_executable(&local);

        let runner = ScriptedRunner::new().on_success("pandoc", "pandoc 2.19");
        let location = Resolver::new(&config, &runner)
            .resolve(Tool::Pandoc)
            .location
            .unwrap();
        assert_eq!(location.strategy, Strategy::FixedLocation);
        assert_eq!(location.program, local);
    }

    #[test]
    fn test_package_runner_last_resort() {
        let (home, config) = sandbox();
        touch_executable(&home.path().join("bin").join("npx"));

        let runner = ScriptedRunner::new().on("npx", |inv| {
            assert_eq!(inv.args, vec!["--no-install", "mmdc", "--version"]);
            Ok(ProcessOutput::ok("11.4.2"))
        });
        let location = Resolver::new(&config, &runner)
            .resolve(Tool::Mmdc)
            .location
            .unwrap();
        assert_eq!(location.strategy, Strategy::PackageRunner);
        assert_eq!(location.leading_args, vec!["--no-install", "mmdc"]);
        assert_eq!(
            location.invocation().arg("-i").args,
            vec!["--no-install", "mmdc", "-i"]
        );
    }

    #[test]
    fn test_package_runner_not_used_for_native_tools() {
        let (home, config) = sandbox();
        touch_executable(&home.path().join("bin").join("npx"));
        let runner = ScriptedRunner::new().on_success("npx", "ok");
        let resolution = Resolver::new(&config, &runner).resolve(Tool::Pandoc);
        assert!(!resolution.is_found());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_package_runner_can_be_disabled() {
        let (home, config) = sandbox();
        touch_executable(&home.path().join("bin").join("npx"));
        let config = config.without_package_runner();
        let runner = ScriptedRunner::new().on_success("npx", "ok");
        assert!(!Resolver::new(&config, &runner).resolve(Tool::Mmdc).is_found());
    }

    #[test]
    fn test_npm_prefix_directory() {
        let (home, config) = sandbox();
        touch_executable(&home.path().join("bin").join("npm"));
        let prefix = home.path().join("custom-prefix");
        let installed = prefix.join("bin").join("mmdc");
        touch_executable(&installed);

        let prefix_out = format!("{}\n", prefix.display());
        let runner = ScriptedRunner::new()
            .on_success("npm", &prefix_out)
            .on_success("mmdc", "11.0.0");
        let location = Resolver::new(&config, &runner)
            .resolve(Tool::Mmdc)
            .location
            .unwrap();
        assert_eq!(location.program, installed);
        assert_eq!(location.strategy, Strategy::PackageManager);
    }

    #[test]
    fn test_probe_timeout_is_reported() {
        let (home, config) = sandbox();
        touch_executable(&home.path().join("bin").join("pandoc"));
        let runner = ScriptedRunner::new().on("pandoc", |_| {
            Err(RunError::Timeout(Duration::from_secs(10)))
        });
        let resolution = Resolver::new(&config, &runner).resolve(Tool::Pandoc);
        assert!(!resolution.is_found());
        assert!(resolution.rejected[0].reason.contains("timed out"));
    }

    #[test]
    fn test_resolve_all_keeps_order() {
        let (home, config) = sandbox();
        touch_executable(&home.path().join("bin").join("pandoc"));
        let runner = ScriptedRunner::new().on_success("pandoc", "pandoc 3");
        let tools = Resolver::new(&config, &runner).resolve_all(&Tool::ALL);

        let order: Vec<Tool> = tools.iter().map(|r| r.tool).collect();
        assert_eq!(order, vec![Tool::Pandoc, Tool::Mmdc]);
        assert_eq!(tools.missing(), vec![Tool::Mmdc]);
        assert!(tools.location(Tool::Pandoc).is_some());
    }
}
