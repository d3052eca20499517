//! Conversion pipeline
//!
//! Validate input → dependency check → diagram preprocessing → conversion.
//! Each external tool is run at most once per conversion; there are no
//! retries.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::convert::DocumentConverter;
use crate::core::options::ConversionRequest;
use crate::core::preprocess::{contains_diagrams, DiagramPreprocessor, PreprocessOutcome};
use crate::core::resolver::{ResolvedTools, Resolver, ResolverConfig};
use crate::data::tools::Tool;
use crate::utils::diagnostics::{Diagnostic, Hint};
use crate::utils::error::{ConversionError, ConversionResult};
use crate::utils::files::{read_markdown, validate_input, WorkDir};
use crate::utils::process::{CommandRunner, SystemRunner};

/// What a successful conversion produced
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub output: PathBuf,
    /// Markdown file handed to the converter
    pub converted_from: PathBuf,
    pub diagrams_found: usize,
    pub diagrams_rendered: bool,
    /// Reference document that was applied
    pub template: Option<PathBuf>,
    /// Retained derived Markdown, with `--keep-intermediate`
    pub intermediate: Option<PathBuf>,
    pub warnings: Vec<Diagnostic>,
}

impl ConversionOutcome {
    /// One-line summary for the user
    pub fn summary(&self) -> String {
        let diagrams = match (self.diagrams_found, self.diagrams_rendered) {
            (0, _) => String::new(),
            (n, true) => format!(" ({} Mermaid diagram{} rendered)", n, plural(n)),
            (_, false) => " (Mermaid diagrams were not converted)".to_string(),
        };
        format!("Created {}{}", self.output.display(), diagrams)
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Runs conversions against an already resolved set of tools
pub struct Pipeline<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    tools: &'a ResolvedTools,
}

impl<'a, R: CommandRunner + ?Sized> Pipeline<'a, R> {
    pub fn new(runner: &'a R, tools: &'a ResolvedTools) -> Self {
        Self { runner, tools }
    }

    /// Fail when a tool the run cannot do without is missing
    ///
    /// The converter is always required. The renderer is required only in
    /// strict mode; otherwise diagrams are left as code blocks.
    pub fn check_dependencies(&self, strict: bool) -> ConversionResult<()> {
        if self.tools.location(Tool::Pandoc).is_none() {
            return Err(ConversionError::missing(Tool::Pandoc));
        }
        if strict && self.tools.location(Tool::Mmdc).is_none() {
            return Err(ConversionError::missing(Tool::Mmdc));
        }
        Ok(())
    }

    pub fn run(&self, request: &ConversionRequest) -> ConversionResult<ConversionOutcome> {
        validate_input(&request.input)?;
        let markdown = read_markdown(&request.input)?;
        self.run_source(request, &markdown)
    }

    /// Like [`run`](Self::run), with the input text already read
    pub fn run_source(
        &self,
        request: &ConversionRequest,
        text: &str,
    ) -> ConversionResult<ConversionOutcome> {
        validate_input(&request.input)?;
        self.check_dependencies(request.strict)?;
        let pandoc = self
            .tools
            .location(Tool::Pandoc)
            .ok_or_else(|| ConversionError::missing(Tool::Pandoc))?;

        let mut warnings = Vec::new();
        let work = if request.keep_intermediate {
            WorkDir::retained(request.intermediate_dir())?
        } else {
            WorkDir::temporary()?
        };

        let options = &request.options;
        let preprocessed = DiagramPreprocessor::new(self.runner, self.tools.location(Tool::Mmdc), options)
            .run_source(&request.input, text, work.path())?;
        if let PreprocessOutcome::Failed { error, .. } = &preprocessed {
            warnings.push(
                Diagnostic::warning(format!("Mermaid diagrams were not converted: {}", error))
                    .with_hints(error.hints()),
            );
        }

        let template = self.select_template(request, &mut warnings);

        let output = request.output_path();
        ensure_parent_dir(&output)?;

        let markdown = preprocessed.markdown_for_conversion(&request.input);
        let mut resource_dirs = Vec::new();
        if preprocessed.is_rendered() {
            resource_dirs.push(work.path().to_path_buf());
        }
        resource_dirs.push(request.input_dir());
        // Pandoc's own default, for images relative to where md2docx was run
        resource_dirs.push(PathBuf::from("."));

        DocumentConverter::new(self.runner, pandoc, options).convert(
            markdown,
            &output,
            template.as_deref(),
            &resource_dirs,
        )?;
        info!(output = %output.display(), "conversion finished");

        let intermediate = (work.is_retained() && preprocessed.is_rendered())
            .then(|| markdown.to_path_buf());

        Ok(ConversionOutcome {
            output,
            converted_from: markdown.to_path_buf(),
            diagrams_found: preprocessed.diagram_count(),
            diagrams_rendered: preprocessed.is_rendered(),
            template,
            intermediate,
            warnings,
        })
    }

    fn select_template(
        &self,
        request: &ConversionRequest,
        warnings: &mut Vec<Diagnostic>,
    ) -> Option<PathBuf> {
        let template = request.requested_template()?;
        if template.is_file() {
            debug!(template = %template.display(), "using reference document");
            return Some(template);
        }
        warn!(template = %template.display(), "template not found");
        warnings.push(
            Diagnostic::warning("Template file not found, using default styling").with_hint(
                Hint::new(format!(
                    "No file at {}; pass --no-template to silence this warning",
                    template.display()
                )),
            ),
        );
        None
    }
}

fn ensure_parent_dir(path: &Path) -> ConversionResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Convert one document with the real tools of this machine
///
/// Tool paths given in the request take precedence over discovery.
pub fn convert_markdown(request: &ConversionRequest) -> ConversionResult<ConversionOutcome> {
    convert_markdown_with(request, &ResolverConfig::from_process(), &SystemRunner::new())
}

/// Convert one document with a custom resolver configuration and runner
///
/// The input is validated before any tool is probed, and the renderer is
/// only looked for when the document has diagrams or strict mode is on.
pub fn convert_markdown_with<R: CommandRunner + ?Sized>(
    request: &ConversionRequest,
    config: &ResolverConfig,
    runner: &R,
) -> ConversionResult<ConversionOutcome> {
    validate_input(&request.input)?;

    let config = config
        .clone()
        .with_optional(Tool::Pandoc, request.pandoc_path.as_deref())
        .with_optional(Tool::Mmdc, request.mmdc_path.as_deref());

    let markdown = read_markdown(&request.input)?;
    let tools: &[Tool] = if request.strict || contains_diagrams(&markdown) {
        &Tool::ALL
    } else {
        debug!("no diagrams, skipping renderer lookup");
        &[Tool::Pandoc]
    };

    let resolved = Resolver::new(&config, runner).resolve_all(tools);
    Pipeline::new(runner, &resolved).run_source(request, &markdown)
}
