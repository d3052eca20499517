//! Data layer - Static tables and constants
//!
//! This module contains the static data used by the resolver and installer:
//! - External tool descriptors
//! - Per-OS path conventions
//! - Installation instruction tables
//! - Timeouts and file naming constants

pub mod constants;
pub mod install;
pub mod platform;
pub mod tools;

// Re-export commonly used items
pub use install::{install_command, LINUX_PANDOC_COMMANDS};
pub use platform::{EnvSnapshot, Location, Os, PlatformStrategy};
pub use tools::{Distribution, Tool};
