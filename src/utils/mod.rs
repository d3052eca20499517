//! Utility modules
//!
//! This module contains utilities and helpers:
//! - Diagnostics and remediation hints
//! - Error types and result types
//! - File and path helpers
//! - Subprocess execution

pub mod diagnostics;
pub mod error;
pub mod files;
pub mod process;

// Re-export commonly used items
pub use diagnostics::{classify_failure, format_diagnostics, Diagnostic, DiagnosticLevel, Hint};
pub use error::{ConversionError, ConversionResult};
pub use files::{LinuxDistro, WorkDir};
pub use process::{CommandRunner, Invocation, ProcessOutput, RunError, ScriptedRunner, SystemRunner};
