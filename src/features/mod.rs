//! Feature modules - Dependency helper features
//!
//! This module contains the commands around the conversion itself:
//! - Installation instructions and automatic installs
//! - The dependency report shown by `md2docx check`

pub mod installer;
pub mod report;

// Re-export commonly used types
pub use installer::{instructions, Installer};
pub use report::{DependencyReport, ToolStatus};
