//! Diagram preprocessing
//!
//! When the Markdown contains fenced Mermaid blocks, the renderer turns it
//! into a derived Markdown file whose diagrams are replaced by image
//! references. Without such blocks this step does nothing.
//!
//! A failed render never aborts the run: the outcome records the error and
//! the original Markdown is converted instead.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::core::options::ConvertOptions;
use crate::core::resolver::ToolLocation;
use crate::data::constants::DIAGRAM_LANGUAGE;
use crate::data::tools::Tool;
use crate::utils::error::{ConversionError, ConversionResult};
use crate::utils::files::{derived_file_name, read_markdown};
use crate::utils::process::{CommandRunner, Invocation, RunError};

lazy_static! {
    /// Opening fence of a Mermaid block: up to three spaces of indentation,
    /// three or more backticks or tildes, then the language tag
    static ref DIAGRAM_FENCE: Regex = Regex::new(&format!(
        r"(?m)^ {{0,3}}(?:`{{3,}}|~{{3,}})[ \t]*{}\b",
        DIAGRAM_LANGUAGE
    ))
    .expect("valid fence regex");
}

/// Whether `markdown` contains at least one Mermaid block
pub fn contains_diagrams(markdown: &str) -> bool {
    DIAGRAM_FENCE.is_match(markdown)
}

/// Number of Mermaid blocks in `markdown`
pub fn count_diagrams(markdown: &str) -> usize {
    DIAGRAM_FENCE.find_iter(markdown).count()
}

/// Result of the preprocessing step
#[derive(Debug)]
pub enum PreprocessOutcome {
    /// No diagrams; the input passes through unchanged
    Unchanged,
    /// Diagrams rendered into `derived`
    Rendered { derived: PathBuf, diagrams: usize },
    /// Rendering failed; the input is used as is
    Failed {
        error: ConversionError,
        diagrams: usize,
    },
}

impl PreprocessOutcome {
    /// The Markdown file the converter should read
    pub fn markdown_for_conversion<'a>(&'a self, original: &'a Path) -> &'a Path {
        match self {
            PreprocessOutcome::Rendered { derived, .. } => derived,
            _ => original,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, PreprocessOutcome::Rendered { .. })
    }

    pub fn diagram_count(&self) -> usize {
        match self {
            PreprocessOutcome::Unchanged => 0,
            PreprocessOutcome::Rendered { diagrams, .. }
            | PreprocessOutcome::Failed { diagrams, .. } => *diagrams,
        }
    }
}

/// Runs the diagram renderer over a Markdown file
pub struct DiagramPreprocessor<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    renderer: Option<&'a ToolLocation>,
    options: &'a ConvertOptions,
}

impl<'a, R: CommandRunner + ?Sized> DiagramPreprocessor<'a, R> {
    /// `renderer` is `None` when the renderer could not be resolved
    pub fn new(runner: &'a R, renderer: Option<&'a ToolLocation>, options: &'a ConvertOptions) -> Self {
        Self {
            runner,
            renderer,
            options,
        }
    }

    /// Renderer command line for `input` → `derived`
    pub fn invocation(&self, renderer: &ToolLocation, input: &Path, derived: &Path) -> Invocation {
        let mut invocation = renderer
            .invocation()
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(derived)
            .arg("-e")
            .arg(self.options.image_format.as_str());

        if let Some(scale) = self.options.scale {
            invocation = invocation.arg("-s").arg(scale.to_string());
        }
        if let Some(config) = &self.options.puppeteer_config {
            invocation = invocation.arg("-p").arg(config);
        }
        invocation
    }

    /// Render diagrams of `input` into `work_dir`
    ///
    /// Only an unreadable input is an error; renderer problems are reported
    /// through [`PreprocessOutcome::Failed`].
    pub fn run(&self, input: &Path, work_dir: &Path) -> ConversionResult<PreprocessOutcome> {
        let markdown = read_markdown(input)?;
        self.run_source(input, &markdown, work_dir)
    }

    /// Like [`run`](Self::run), with the text of `input` already read
    pub fn run_source(
        &self,
        input: &Path,
        markdown: &str,
        work_dir: &Path,
    ) -> ConversionResult<PreprocessOutcome> {
        let diagrams = count_diagrams(markdown);
        if diagrams == 0 {
            info!(input = %input.display(), "no Mermaid diagrams, skipping renderer");
            return Ok(PreprocessOutcome::Unchanged);
        }

        let Some(renderer) = self.renderer else {
            warn!("Mermaid diagrams found but mmdc is not available");
            return Ok(PreprocessOutcome::Failed {
                error: ConversionError::missing(Tool::Mmdc),
                diagrams,
            });
        };

        let derived = work_dir.join(derived_file_name(input));
        let invocation = self.invocation(renderer, input, &derived);
        info!(diagrams, command = %invocation.command_line(), "rendering Mermaid diagrams");

        let error = match self.runner.run(&invocation, self.options.render_timeout) {
            Ok(out) if out.success() && derived.is_file() => {
                return Ok(PreprocessOutcome::Rendered { derived, diagrams });
            }
            Ok(out) if out.success() => ConversionError::MissingOutput {
                tool: Tool::Mmdc,
                path: derived,
            },
            Ok(out) => ConversionError::non_zero(Tool::Mmdc, out.code, out.error_text()),
            Err(RunError::Timeout(timeout)) => ConversionError::timeout(Tool::Mmdc, timeout),
            Err(RunError::NotFound(_)) => ConversionError::missing(Tool::Mmdc),
            Err(RunError::Io { source, .. }) => ConversionError::Io(source),
        };

        warn!(%error, "diagram rendering failed, using original Markdown");
        Ok(PreprocessOutcome::Failed { error, diagrams })
    }
}
