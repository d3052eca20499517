//! Subprocess execution for external tools
//!
//! The key abstraction is the `CommandRunner` trait, which allows different
//! implementations for real runs and tests:
//! - `SystemRunner`: spawns real processes with a bounded wait
//! - `ScriptedRunner`: answers invocations from in-memory handlers and
//!   records every call

use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::data::constants::POLL_INTERVAL;

/// A program plus its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Whether `flag` appears as a standalone argument
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// The argument following `flag`, if any
    pub fn value_of(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(OsString::as_os_str)
    }

    /// Shell-like rendering for logs and messages
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|s| {
                let s = s.to_string_lossy();
                if s.contains(' ') {
                    format!("\"{}\"", s)
                } else {
                    s.into_owned()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stderr if present, stdout otherwise
    pub fn error_text(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Failure to obtain a process result
#[derive(Debug, Error)]
pub enum RunError {
    #[error("executable not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to run {}: {source}", .program.display())]
    Io {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Trait for running external programs
pub trait CommandRunner: Send + Sync {
    /// Run to completion, giving up after `timeout`
    fn run(&self, invocation: &Invocation, timeout: Duration) -> Result<ProcessOutput, RunError>;
}

/// Runs real processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default()
}

/// Kill `child` and everything in its process group
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    match i32::try_from(child.id()) {
        // SAFETY: plain syscall; the group was created at spawn and the child
        // has not been reaped yet, so its id still names that group
        Ok(pgid) => unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        },
        Err(_) => {
            let _ = child.kill();
        }
    }
}

/// Kill `child`; processes it started are not tracked
#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation, timeout: Duration) -> Result<ProcessOutput, RunError> {
        debug!(command = %invocation.command_line(), ?timeout, "spawning");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so helpers the tool starts (npx, headless
        // browsers) can be killed along with it
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);

        let mut child = command
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => RunError::NotFound(invocation.program.clone()),
                _ => RunError::Io {
                    program: invocation.program.clone(),
                    source: e,
                },
            })?;

        // Drain both pipes so a chatty child never blocks on a full buffer
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() >= timeout {
                        debug!(command = %invocation.command_line(), "timed out, killing");
                        kill_tree(&mut child);
                        let _ = child.wait();
                        return Err(RunError::Timeout(timeout));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    let _ = child.kill();
                    return Err(RunError::Io {
                        program: invocation.program.clone(),
                        source: e,
                    });
                }
            }
        };

        let output = ProcessOutput {
            code: status.code(),
            stdout: join_reader(stdout),
            stderr: join_reader(stderr),
        };
        debug!(code = ?output.code, elapsed = ?start.elapsed(), "process finished");
        Ok(output)
    }
}

type Handler = Box<dyn Fn(&Invocation) -> Result<ProcessOutput, RunError> + Send + Sync>;

/// In-memory runner for tests
///
/// Handlers are keyed by program name. A key matches when it equals the
/// full program path or the program's file stem, so `"pandoc"` answers for
/// `/usr/bin/pandoc` and `pandoc.exe`. Unmatched programs are reported as
/// not found.
#[derive(Default)]
pub struct ScriptedRunner {
    handlers: Vec<(String, Handler)>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a program
    pub fn on<F>(mut self, program: &str, handler: F) -> Self
    where
        F: Fn(&Invocation) -> Result<ProcessOutput, RunError> + Send + Sync + 'static,
    {
        self.handlers.push((program.to_string(), Box::new(handler)));
        self
    }

    /// Program always succeeds with `stdout`
    pub fn on_success(self, program: &str, stdout: &str) -> Self {
        let stdout = stdout.to_string();
        self.on(program, move |_| Ok(ProcessOutput::ok(stdout.clone())))
    }

    /// Program always exits with `code` and `stderr`
    pub fn on_failure(self, program: &str, code: i32, stderr: &str) -> Self {
        let stderr = stderr.to_string();
        self.on(program, move |_| Ok(ProcessOutput::failed(code, stderr.clone())))
    }

    /// Every invocation seen so far
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Invocations of one program, excluding version probes
    pub fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|inv| matches_program(program, &inv.program))
            .filter(|inv| !inv.has_flag("--version"))
            .collect()
    }
}

fn matches_program(key: &str, program: &Path) -> bool {
    program == Path::new(key) || program.file_stem().and_then(OsStr::to_str) == Some(key)
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation, _timeout: Duration) -> Result<ProcessOutput, RunError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(invocation.clone());

        self.handlers
            .iter()
            .find(|(key, _)| matches_program(key, &invocation.program))
            .map(|(_, handler)| handler(invocation))
            .unwrap_or_else(|| Err(RunError::NotFound(invocation.program.clone())))
    }
}

impl std::fmt::Debug for ScriptedRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedRunner")
            .field(
                "handlers",
                &self.handlers.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_flags() {
        let inv = Invocation::new("pandoc")
            .arg("in.md")
            .args(["-o", "out.docx", "--toc"]);
        assert!(inv.has_flag("--toc"));
        assert!(!inv.has_flag("--reference-doc"));
        assert_eq!(inv.value_of("-o"), Some(OsStr::new("out.docx")));
        assert_eq!(inv.value_of("--toc"), None);
    }

    #[test]
    fn test_command_line_quotes_spaces() {
        let inv = Invocation::new("mmdc").args(["-i", "my notes.md"]);
        assert_eq!(inv.command_line(), "mmdc -i \"my notes.md\"");
    }

    #[test]
    fn test_error_text_prefers_stderr() {
        let out = ProcessOutput {
            code: Some(1),
            stdout: "progress".to_string(),
            stderr: "boom".to_string(),
        };
        assert_eq!(out.error_text(), "boom");

        let out = ProcessOutput {
            code: Some(1),
            stdout: "only stdout".to_string(),
            stderr: "  \n".to_string(),
        };
        assert_eq!(out.error_text(), "only stdout");
    }

    #[test]
    fn test_scripted_runner_matches_stem() {
        let runner = ScriptedRunner::new().on_success("pandoc", "pandoc 3.1");
        let out = runner
            .run(
                &Invocation::new("/usr/local/bin/pandoc").arg("--version"),
                Duration::from_secs(1),
            )
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "pandoc 3.1");
        assert_eq!(runner.calls().len(), 1);
        assert!(runner.calls_to("pandoc").is_empty());
    }

    #[test]
    fn test_scripted_runner_unknown_program() {
        let runner = ScriptedRunner::new();
        let err = runner
            .run(&Invocation::new("mmdc"), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, RunError::NotFound(_)));
    }

    #[test]
    fn test_system_runner_missing_program() {
        let err = SystemRunner::new()
            .run(
                &Invocation::new("md2docx-definitely-not-a-real-program"),
                Duration::from_secs(5),
            )
            .unwrap_err();
        assert!(matches!(err, RunError::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_output() {
        let out = SystemRunner::new()
            .run(
                &Invocation::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]),
                Duration::from_secs(10),
            )
            .unwrap();
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_timeout() {
        let start = Instant::now();
        let err = SystemRunner::new()
            .run(
                &Invocation::new("sleep").arg("5"),
                Duration::from_millis(200),
            )
            .unwrap_err();
        assert!(matches!(err, RunError::Timeout(_)));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_timeout_kills_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("late-write");
        let script = format!("(sleep 1; touch '{}') & wait", marker.display());

        let err = SystemRunner::new()
            .run(
                &Invocation::new("sh").args(["-c", script.as_str()]),
                Duration::from_millis(200),
            )
            .unwrap_err();
        assert!(matches!(err, RunError::Timeout(_)));

        thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists());
    }
}
