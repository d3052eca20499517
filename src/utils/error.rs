//! Error handling for md2docx conversions
//!
//! This module provides a unified error type and result type for the
//! dependency check, the diagram preprocessing and the document conversion.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::data::tools::Tool;
use crate::utils::diagnostics::Hint;

/// Conversion error type
#[derive(Debug, Error)]
pub enum ConversionError {
    /// An external tool could not be found by any resolution strategy
    #[error("{} not found. Please install {}", .tool.binary_name(), .tool.display_name())]
    MissingExecutable { tool: Tool },

    /// An external tool did not finish within its time budget
    #[error("{} timed out after {}s", .tool.binary_name(), .timeout.as_secs())]
    ExecutableTimeout { tool: Tool, timeout: Duration },

    /// An external tool exited with a non-zero status
    #[error("{} failed{}: {}", .tool.binary_name(), exit_code_suffix(.code), stderr_summary(.stderr))]
    ExecutableNonZeroExit {
        tool: Tool,
        code: Option<i32>,
        stderr: String,
    },

    /// An external tool reported success but did not write its output file
    #[error("{} reported success but produced no output at {}", .tool.binary_name(), .path.display())]
    MissingOutput { tool: Tool, path: PathBuf },

    /// Input file does not exist
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Input file does not carry a Markdown extension
    #[error("Unsupported input extension '{extension}' for {}: expected .md or .markdown", .path.display())]
    UnsupportedInputExtension { path: PathBuf, extension: String },

    /// Automatic installation is not available for this tool
    #[error("{} cannot be installed automatically", .0.display_name())]
    InstallUnsupported(Tool),

    /// The package manager needed for an automatic install is missing
    #[error("{0} is required to install packages automatically. Please install Node.js first")]
    PackageManagerMissing(&'static str),

    /// The package manager ran but the install did not succeed
    #[error("Failed to install {}: {}", .tool.display_name(), stderr_summary(.detail))]
    InstallFailed { tool: Tool, detail: String },

    /// IO error (for file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_code_suffix(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!(" (exit code {})", c),
        None => " (terminated by signal)".to_string(),
    }
}

fn stderr_summary(stderr: &str) -> &str {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        "no error output"
    } else {
        trimmed
    }
}

/// Result type for conversion operations
pub type ConversionResult<T> = Result<T, ConversionError>;

impl ConversionError {
    pub fn missing(tool: Tool) -> Self {
        ConversionError::MissingExecutable { tool }
    }

    pub fn timeout(tool: Tool, timeout: Duration) -> Self {
        ConversionError::ExecutableTimeout { tool, timeout }
    }

    pub fn non_zero(tool: Tool, code: Option<i32>, stderr: impl Into<String>) -> Self {
        ConversionError::ExecutableNonZeroExit {
            tool,
            code,
            stderr: stderr.into(),
        }
    }

    /// The tool this error is about, if any
    pub fn tool(&self) -> Option<Tool> {
        match self {
            ConversionError::MissingExecutable { tool }
            | ConversionError::ExecutableTimeout { tool, .. }
            | ConversionError::ExecutableNonZeroExit { tool, .. }
            | ConversionError::MissingOutput { tool, .. }
            | ConversionError::InstallFailed { tool, .. } => Some(*tool),
            ConversionError::InstallUnsupported(tool) => Some(*tool),
            _ => None,
        }
    }

    /// Remediation hints for this error.
    ///
    /// Renderer failures are matched against the known failure signatures of
    /// a headless-browser based tool; everything else gets a generic hint.
    pub fn hints(&self) -> Vec<Hint> {
        match self {
            ConversionError::MissingExecutable { tool } | ConversionError::InstallUnsupported(tool) => {
                vec![Hint::install(*tool)]
            }
            ConversionError::ExecutableTimeout { tool, .. } => vec![Hint::timeout(*tool)],
            ConversionError::ExecutableNonZeroExit { tool, stderr, .. } => {
                crate::utils::diagnostics::classify_failure(*tool, stderr)
            }
            ConversionError::InstallFailed { tool, detail } => {
                crate::utils::diagnostics::classify_failure(*tool, detail)
            }
            ConversionError::PackageManagerMissing(_) => {
                vec![Hint::new("Install Node.js (which ships npm) from https://nodejs.org")]
            }
            ConversionError::UnsupportedInputExtension { .. } => vec![Hint::new(
                "Rename the input file to use a .md extension",
            )],
            _ => Vec::new(),
        }
    }
}
