//! File and path helpers
//!
//! Input validation, output naming, the working directory for intermediate
//! files, bundled template lookup and Linux distribution detection.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::data::constants::{
    MARKDOWN_EXTENSIONS, OUTPUT_EXTENSION, PROCESSED_SUFFIX, TEMPLATE_FILE_NAME,
    TEMPLATE_SEARCH_DIRS, TEMP_DIR_PREFIX,
};
use crate::utils::error::{ConversionError, ConversionResult};

/// Check that `input` exists and carries a Markdown extension
pub fn validate_input(input: &Path) -> ConversionResult<()> {
    if !input.is_file() {
        return Err(ConversionError::InputNotFound(input.to_path_buf()));
    }

    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string();

    if !MARKDOWN_EXTENSIONS
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(&extension))
    {
        return Err(ConversionError::UnsupportedInputExtension {
            path: input.to_path_buf(),
            extension,
        });
    }

    Ok(())
}

/// Read the input text
///
/// Bytes that are not valid UTF-8 are replaced. The text is only scanned
/// for diagram fences; the tools read the file themselves.
pub fn read_markdown(input: &Path) -> ConversionResult<String> {
    let bytes = fs::read(input)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            debug!(input = %input.display(), "input is not valid UTF-8, reading lossily");
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// `notes.md` → `notes.docx`, next to the input
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension(OUTPUT_EXTENSION)
}

/// `notes.md` → `notes_processed.md`
pub fn derived_file_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    format!("{}{}.md", stem, PROCESSED_SUFFIX)
}

/// Directory that holds the derived Markdown file and rendered images
#[derive(Debug)]
pub enum WorkDir {
    /// Removed when dropped
    Temporary(TempDir),
    /// Kept after the run for inspection
    Retained(PathBuf),
}

impl WorkDir {
    pub fn temporary() -> ConversionResult<Self> {
        let dir = tempfile::Builder::new().prefix(TEMP_DIR_PREFIX).tempdir()?;
        debug!(path = %dir.path().display(), "created working directory");
        Ok(WorkDir::Temporary(dir))
    }

    pub fn retained(dir: impl Into<PathBuf>) -> ConversionResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(WorkDir::Retained(dir))
    }

    pub fn path(&self) -> &Path {
        match self {
            WorkDir::Temporary(dir) => dir.path(),
            WorkDir::Retained(dir) => dir,
        }
    }

    pub fn is_retained(&self) -> bool {
        matches!(self, WorkDir::Retained(_))
    }
}

/// Look for the bundled reference document around the executable
pub fn find_bundled_template(exe_dir: &Path) -> Option<PathBuf> {
    TEMPLATE_SEARCH_DIRS
        .iter()
        .map(|dir| exe_dir.join(dir).join(TEMPLATE_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Bundled template next to the running executable, if any
pub fn bundled_template() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    find_bundled_template(exe.parent()?)
}

/// Linux distribution as described by os-release
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinuxDistro {
    pub id: Option<String>,
    pub id_like: Vec<String>,
}

impl LinuxDistro {
    /// Parse the contents of an os-release file
    pub fn parse(content: &str) -> Self {
        let mut distro = LinuxDistro::default();

        for line in content.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            match key.trim() {
                "ID" if !value.is_empty() => distro.id = Some(value.to_lowercase()),
                "ID_LIKE" => {
                    distro.id_like = value
                        .split_whitespace()
                        .map(|s| s.to_lowercase())
                        .collect()
                }
                _ => {}
            }
        }

        distro
    }

    /// Read `/etc/os-release` (or `/usr/lib/os-release`); empty off Linux
    pub fn detect() -> Self {
        if !cfg!(target_os = "linux") {
            return Self::default();
        }
        ["/etc/os-release", "/usr/lib/os-release"]
            .iter()
            .find_map(|path| fs::read_to_string(path).ok())
            .map(|content| Self::parse(&content))
            .unwrap_or_default()
    }

    /// `ID` followed by the `ID_LIKE` entries
    pub fn ids(&self) -> Vec<String> {
        self.id
            .iter()
            .cloned()
            .chain(self.id_like.iter().cloned())
            .collect()
    }

    pub fn name(&self) -> &str {
        self.id.as_deref().unwrap_or("unknown")
    }
}
