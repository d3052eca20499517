//! Dependency report
//!
//! Summarizes a resolution run for `md2docx check`, as text for people or
//! JSON for scripts. Building a report never runs anything by itself.

use std::fmt::Write;

use serde::Serialize;

use crate::core::resolver::{RejectedCandidate, ResolvedTools, Strategy};
use crate::data::platform::Os;
use crate::data::tools::Tool;

/// Status of one tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub tool: Tool,
    pub name: &'static str,
    pub required: bool,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Full command line prefix, e.g. `npx --no-install mmdc`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedCandidate>,
}

/// Status of every tool looked for
#[derive(Debug, Clone, Serialize)]
pub struct DependencyReport {
    pub platform: &'static str,
    pub tools: Vec<ToolStatus>,
}

impl DependencyReport {
    pub fn from_resolved(resolved: &ResolvedTools) -> Self {
        let tools = resolved
            .iter()
            .map(|resolution| {
                let location = resolution.location.as_ref();
                ToolStatus {
                    tool: resolution.tool,
                    name: resolution.tool.display_name(),
                    required: resolution.tool.is_required(),
                    found: location.is_some(),
                    path: location.map(|l| l.program.display().to_string()),
                    command: location.map(|l| l.invocation().command_line()),
                    strategy: location.map(|l| l.strategy),
                    version: location.and_then(|l| l.version.clone()),
                    rejected: resolution.rejected.clone(),
                }
            })
            .collect();

        Self {
            platform: Os::current().label(),
            tools,
        }
    }

    pub fn all_present(&self) -> bool {
        self.tools.iter().all(|t| t.found)
    }

    pub fn missing(&self) -> Vec<Tool> {
        self.tools
            .iter()
            .filter(|t| !t.found)
            .map(|t| t.tool)
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human readable report
    ///
    /// Rejected candidates are listed only when `verbose` is set.
    pub fn render_text(&self, verbose: bool, use_color: bool) -> String {
        let (green, red, yellow, reset) = if use_color {
            ("\x1b[32m", "\x1b[31m", "\x1b[33m", "\x1b[0m")
        } else {
            ("", "", "", "")
        };

        let mut out = String::new();
        let _ = writeln!(out, "Checking dependencies ({})...", self.platform);
        let _ = writeln!(out, "{}", "-".repeat(40));

        for status in &self.tools {
            let bin = status.tool.binary_name();
            if let (Some(command), Some(strategy)) = (&status.command, status.strategy) {
                let version = status
                    .version
                    .as_deref()
                    .map(|v| format!(" [{}]", v))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "{}✓{} {}: {} (via {}){}",
                    green,
                    reset,
                    bin,
                    command,
                    strategy.describe(),
                    version
                );
            } else if status.required {
                let _ = writeln!(out, "{}✗{} {}: Not found", red, reset, bin);
            } else {
                let _ = writeln!(
                    out,
                    "{}✗{} {}: Not found (Mermaid diagrams will not be converted)",
                    yellow, reset, bin
                );
            }

            if verbose {
                for rejected in &status.rejected {
                    let _ = writeln!(
                        out,
                        "    skipped {} ({}): {}",
                        rejected.path.display(),
                        rejected.strategy.describe(),
                        rejected.reason
                    );
                }
            }
        }

        let _ = writeln!(out, "{}", "-".repeat(40));
        let missing = self.missing();
        if missing.is_empty() {
            let _ = writeln!(out, "{}✓{} All dependencies are installed!", green, reset);
        } else {
            let names: Vec<&str> = missing.iter().map(|t| t.binary_name()).collect();
            let _ = writeln!(out, "Missing dependencies: {}", names.join(", "));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::{Resolution, ToolLocation};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn resolved() -> ResolvedTools {
        let mut tools = ResolvedTools::new();
        tools.insert(Resolution {
            tool: Tool::Pandoc,
            location: Some(ToolLocation {
                program: PathBuf::from("/usr/bin/pandoc"),
                leading_args: Vec::new(),
                strategy: Strategy::SearchPath,
                version: Some("pandoc 3.1.11".to_string()),
            }),
            rejected: Vec::new(),
        });
        tools.insert(Resolution {
            tool: Tool::Mmdc,
            location: None,
            rejected: vec![RejectedCandidate {
                path: PathBuf::from("/usr/local/bin/mmdc"),
                strategy: Strategy::SearchPath,
                reason: "version check exited with code 1: Error".to_string(),
            }],
        });
        tools
    }

    #[test]
    fn test_report_status() {
        let report = DependencyReport::from_resolved(&resolved());
        assert!(!report.all_present());
        assert_eq!(report.missing(), vec![Tool::Mmdc]);
        assert!(report.tools[0].required);
        assert!(!report.tools[1].required);
    }

    #[test]
    fn test_render_text() {
        let report = DependencyReport::from_resolved(&resolved());
        let text = report.render_text(false, false);
        assert!(text.contains("✓ pandoc: /usr/bin/pandoc (via PATH) [pandoc 3.1.11]"));
        assert!(text.contains("✗ mmdc: Not found (Mermaid diagrams will not be converted)"));
        assert!(text.contains("Missing dependencies: mmdc"));
        assert!(!text.contains("skipped"));

        let verbose = report.render_text(true, false);
        assert!(verbose.contains(
            "    skipped /usr/local/bin/mmdc (PATH): version check exited with code 1: Error"
        ));
    }

    #[test]
    fn test_json_shape() {
        let report = DependencyReport::from_resolved(&resolved());
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["tools"][0]["tool"], "pandoc");
        assert_eq!(value["tools"][0]["strategy"], "search-path");
        assert_eq!(value["tools"][1]["found"], false);
        assert!(value["tools"][1].get("path").is_none());
        assert_eq!(value["tools"][1]["rejected"][0]["reason"], "version check exited with code 1: Error");
    }
}
