//! Constants shared by the conversion pipeline

use std::time::Duration;

// ============================================================================
// Timeouts
// ============================================================================

/// Version probe of a resolver candidate
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// `npm config get prefix`
pub const NPM_PREFIX_TIMEOUT: Duration = Duration::from_secs(5);

/// Diagram rendering
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Document conversion
pub const CONVERT_TIMEOUT: Duration = Duration::from_secs(60);

/// `npm install -g` of the renderer
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Interval between child status polls
pub const POLL_INTERVAL: Duration = Duration::from_millis(25);

// ============================================================================
// Diagram rendering
// ============================================================================

/// Fenced code block language handled by the renderer
pub const DIAGRAM_LANGUAGE: &str = "mermaid";

/// Default renderer scale factor
pub const DEFAULT_SCALE: u32 = 2;

/// Suffix appended to the input stem for the derived Markdown file
pub const PROCESSED_SUFFIX: &str = "_processed";

// ============================================================================
// Files
// ============================================================================

/// Accepted input extensions (compared case-insensitively)
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Extension of the generated document
pub const OUTPUT_EXTENSION: &str = "docx";

/// File name of the bundled reference document
pub const TEMPLATE_FILE_NAME: &str = "template.docx";

/// Directories (relative to the executable) searched for the bundled template
pub const TEMPLATE_SEARCH_DIRS: &[&str] = &["assets", "../assets", "../share/md2docx"];

/// Prefix for the temporary working directory
pub const TEMP_DIR_PREFIX: &str = "md2docx-";
