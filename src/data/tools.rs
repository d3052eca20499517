//! External tool descriptors
//!
//! md2docx drives two external programs. Everything the resolver and the
//! installer need to know about them lives here.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// An external tool md2docx depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Document converter (Markdown → DOCX)
    Pandoc,
    /// Mermaid diagram renderer
    Mmdc,
}

/// How a tool is normally distributed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    /// Installed through the system package manager or an installer
    Native,
    /// Installed as a global npm package
    Npm { package: &'static str },
}

impl Tool {
    /// Every tool, in the order they are checked and reported
    pub const ALL: [Tool; 2] = [Tool::Pandoc, Tool::Mmdc];

    /// Executable name without platform suffix
    pub fn binary_name(&self) -> &'static str {
        match self {
            Tool::Pandoc => "pandoc",
            Tool::Mmdc => "mmdc",
        }
    }

    /// Human readable product name
    pub fn display_name(&self) -> &'static str {
        match self {
            Tool::Pandoc => "Pandoc",
            Tool::Mmdc => "Mermaid CLI",
        }
    }

    /// Flag that prints the version and exits with status 0
    pub fn version_flag(&self) -> &'static str {
        "--version"
    }

    pub fn homepage(&self) -> &'static str {
        match self {
            Tool::Pandoc => "https://pandoc.org/installing.html",
            Tool::Mmdc => "https://github.com/mermaid-js/mermaid-cli",
        }
    }

    pub fn distribution(&self) -> Distribution {
        match self {
            Tool::Pandoc => Distribution::Native,
            Tool::Mmdc => Distribution::Npm {
                package: "@mermaid-js/mermaid-cli",
            },
        }
    }

    /// Whether a missing tool prevents any document from being produced
    pub fn is_required(&self) -> bool {
        matches!(self, Tool::Pandoc)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pandoc" => Ok(Tool::Pandoc),
            "mmdc" | "mermaid" | "mermaid-cli" => Ok(Tool::Mmdc),
            other => Err(format!("Unknown tool: {}", other)),
        }
    }
}
