//! # md2docx
//!
//! Markdown to Word converter with Mermaid diagram support, written in Rust.
//!
//! ## Features
//!
//! - **Diagrams**: Mermaid blocks are rendered to images with Mermaid CLI (`mmdc`)
//! - **Conversion**: Markdown → DOCX through Pandoc, with an optional reference document
//! - **Tool Discovery**: finds tools on `PATH`, in package-manager directories,
//!   in common install locations and through `npx`, and checks that each one runs
//! - **Diagnostics**: failures come with concrete remediation hints
//! - **Graceful Degradation**: a failed diagram render still produces a document
//!
//! ## Usage Examples
//!
//! ### Diagram Detection
//!
//! ```rust
//! use md2docx::contains_diagrams;
//!
//! assert!(contains_diagrams("```mermaid\ngraph TD; A-->B;\n```\n"));
//! assert!(!contains_diagrams("# Just text\n"));
//! ```
//!
//! ### Converting a Document
//!
//! ```rust,no_run
//! use md2docx::{convert_markdown, ConversionRequest};
//!
//! let request = ConversionRequest::new("notes.md").with_output("notes.docx");
//! match convert_markdown(&request) {
//!     Ok(outcome) => println!("{}", outcome.summary()),
//!     Err(err) => eprintln!("{}", err),
//! }
//! ```
//!
//! ### Checking Dependencies
//!
//! ```rust,no_run
//! use md2docx::{DependencyReport, Resolver, ResolverConfig, SystemRunner, Tool};
//!
//! let config = ResolverConfig::from_process();
//! let resolved = Resolver::new(&config, &SystemRunner::new()).resolve_all(&Tool::ALL);
//! let report = DependencyReport::from_resolved(&resolved);
//! print!("{}", report.render_text(false, false));
//! ```

/// Core conversion modules
pub mod core;

/// Data layer - static tables and constants
pub mod data;

/// Feature modules - dependency helper features
pub mod features;

/// Utility modules
pub mod utils;

// Re-export the pipeline
pub use core::{
    contains_diagrams, convert_markdown, convert_markdown_with, count_diagrams,
    ConversionOutcome, ConversionRequest, ConvertOptions, DiagramPreprocessor, DocumentConverter,
    ImageFormat, Pipeline, PreprocessOutcome,
};

// Re-export tool resolution
pub use core::resolver;
pub use core::{
    RejectedCandidate, Resolution, ResolvedTools, Resolver, ResolverConfig, Strategy, ToolLocation,
};

// Re-export data modules
pub use data::constants;
pub use data::{EnvSnapshot, Os, PlatformStrategy, Tool};

// Re-export feature modules
pub use features::installer;
pub use features::report;
pub use features::{instructions, DependencyReport, Installer, ToolStatus};

// Re-export utilities
pub use utils::diagnostics;
pub use utils::error::{ConversionError, ConversionResult};
pub use utils::files;
pub use utils::files::LinuxDistro;
pub use utils::process::{CommandRunner, Invocation, ProcessOutput, RunError, ScriptedRunner, SystemRunner};
pub use utils::diagnostics::{format_diagnostics, Diagnostic, DiagnosticLevel, Hint};
