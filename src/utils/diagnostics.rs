//! Diagnostics and remediation hints
//!
//! External tools fail with free-form error text. This module matches that
//! text against known failure signatures and turns it into actionable hints,
//! and formats warnings and errors for the terminal.
//!
//! ## Example
//!
//! ```rust
//! use md2docx::diagnostics::classify_failure;
//! use md2docx::Tool;
//!
//! let hints = classify_failure(Tool::Mmdc, "Error: Failed to launch the browser process!");
//! assert!(hints[0].message.contains("browser"));
//! ```

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::data::install::install_command;
use crate::data::platform::Os;
use crate::data::tools::Tool;
use crate::utils::files::LinuxDistro;

lazy_static! {
    /// Known failure signatures: (tool filter, pattern, remediation)
    static ref FAILURE_SIGNATURES: Vec<(Option<Tool>, Regex, &'static str)> = vec![
        (
            Some(Tool::Mmdc),
            Regex::new(r"(?i)could not find (chrome|chromium|expected browser)|failed to launch the browser|browser was not found|chrome-headless-shell")
                .expect("valid browser regex"),
            "Mermaid CLI needs a headless browser. Run: npx puppeteer browsers install chrome-headless-shell \
             (or set PUPPETEER_EXECUTABLE_PATH to an installed Chrome/Chromium)",
        ),
        (
            Some(Tool::Mmdc),
            Regex::new(r"(?i)no usable sandbox|--no-sandbox|setuid sandbox")
                .expect("valid sandbox regex"),
            "Chromium cannot start its sandbox (common in containers or when running as root). \
             Pass --puppeteer-config <file> with {\"args\": [\"--no-sandbox\"]}",
        ),
        (
            Some(Tool::Mmdc),
            Regex::new(r"(?i)parse error|syntax error|lexical error")
                .expect("valid syntax regex"),
            "A Mermaid diagram contains a syntax error; check it at https://mermaid.live",
        ),
        (
            Some(Tool::Pandoc),
            Regex::new(r"(?i)reference-doc|withBinaryFile: does not exist|\.docx: openBinaryFile")
                .expect("valid reference-doc regex"),
            "The reference document could not be read; check --template or pass --no-template",
        ),
        (
            Some(Tool::Pandoc),
            Regex::new(r"(?i)could not fetch resource|could not find image|replacing image with description")
                .expect("valid resource regex"),
            "An image referenced by the document could not be found; image paths are resolved relative to the input file",
        ),
        (
            Some(Tool::Pandoc),
            Regex::new(r"(?i)unknown option|unrecognized option")
                .expect("valid option regex"),
            "The installed Pandoc does not support one of the options used; upgrade Pandoc",
        ),
        (
            None,
            Regex::new(r"(?i)eacces|eperm|permission denied")
                .expect("valid permission regex"),
            "Permission error: make sure the output directory is writable and the tool is executable \
             (avoid `sudo npm install`; configure an npm prefix in your home directory instead)",
        ),
        (
            None,
            Regex::new(r"(?i)enoent|no such file or directory")
                .expect("valid missing-file regex"),
            "A file the tool needs is missing; check the input path and any configured file paths",
        ),
    ];
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticLevel {
    /// Informational note
    Info,
    /// Warning - the run continues with reduced output
    Warning,
    /// Error - the run fails
    Error,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Info => write!(f, "info"),
            DiagnosticLevel::Warning => write!(f, "warning"),
            DiagnosticLevel::Error => write!(f, "error"),
        }
    }
}

/// A single remediation suggestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub message: String,
}

impl Hint {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// How to install `tool` on this machine
    pub fn install(tool: Tool) -> Self {
        let distro = LinuxDistro::detect();
        let command = install_command(tool, Os::current(), &distro.ids());
        Self::new(format!(
            "Install {}: {} ({})",
            tool.display_name(),
            command,
            tool.homepage()
        ))
    }

    pub fn timeout(tool: Tool) -> Self {
        match tool {
            Tool::Mmdc => Self::new(
                "Rendering took too long; the first run may be downloading a browser. \
                 Retry, or split very large diagrams",
            ),
            Tool::Pandoc => Self::new(
                "Conversion took too long; check the document for very large embedded images",
            ),
        }
    }
}

impl fmt::Display for Hint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Match a tool's error text against the known failure signatures
///
/// Returns at least one hint; when nothing matches, the hint points at
/// verbose mode.
pub fn classify_failure(tool: Tool, error_text: &str) -> Vec<Hint> {
    let hints: Vec<Hint> = FAILURE_SIGNATURES
        .iter()
        .filter(|(filter, _, _)| filter.map_or(true, |t| t == tool))
        .filter(|(_, pattern, _)| pattern.is_match(error_text))
        .map(|(_, _, message)| Hint::new(*message))
        .collect();

    if hints.is_empty() {
        vec![Hint::new(format!(
            "Run with --verbose to see the exact {} command line",
            tool.binary_name()
        ))]
    } else {
        hints
    }
}

/// A message for the user with optional hints
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub hints: Vec<Hint>,
}

impl Diagnostic {
    pub fn new(level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            hints: Vec::new(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, message)
    }

    pub fn with_hint(mut self, hint: Hint) -> Self {
        self.hints.push(hint);
        self
    }

    pub fn with_hints(mut self, hints: impl IntoIterator<Item = Hint>) -> Self {
        self.hints.extend(hints);
        self
    }

    /// ANSI colour for this level
    pub fn color_code(&self) -> &'static str {
        match self.level {
            DiagnosticLevel::Error => "\x1b[31m",   // Red
            DiagnosticLevel::Warning => "\x1b[33m", // Yellow
            DiagnosticLevel::Info => "\x1b[34m",    // Blue
        }
    }
}

impl From<&crate::utils::error::ConversionError> for Diagnostic {
    fn from(err: &crate::utils::error::ConversionError) -> Self {
        Diagnostic::error(err.to_string()).with_hints(err.hints())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: level: message
        //         = help: hint
        write!(f, "{}: {}", self.level, self.message)?;
        for hint in &self.hints {
            write!(f, "\n  = help: {}", hint)?;
        }
        Ok(())
    }
}

/// Format diagnostics for the terminal, one block per diagnostic
pub fn format_diagnostics(diagnostics: &[Diagnostic], use_color: bool) -> String {
    let mut output = String::new();

    for diag in diagnostics {
        if use_color {
            output.push_str(diag.color_code());
            output.push_str(&format!("{}", diag));
            output.push_str("\x1b[0m\n");
        } else {
            output.push_str(&format!("{}\n", diag));
        }
    }

    output
}
