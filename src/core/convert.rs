//! Markdown → DOCX conversion through pandoc

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::options::ConvertOptions;
use crate::core::resolver::ToolLocation;
use crate::data::tools::Tool;
use crate::utils::error::{ConversionError, ConversionResult};
use crate::utils::process::{CommandRunner, Invocation, RunError};

/// Drives the document converter
pub struct DocumentConverter<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    pandoc: &'a ToolLocation,
    options: &'a ConvertOptions,
}

impl<'a, R: CommandRunner + ?Sized> DocumentConverter<'a, R> {
    pub fn new(runner: &'a R, pandoc: &'a ToolLocation, options: &'a ConvertOptions) -> Self {
        Self {
            runner,
            pandoc,
            options,
        }
    }

    /// Converter command line
    ///
    /// `resource_dirs` are searched for images referenced by the Markdown,
    /// in order. Directories that cannot be joined into a search path (they
    /// contain the separator) are skipped.
    pub fn invocation(
        &self,
        markdown: &Path,
        output: &Path,
        template: Option<&Path>,
        resource_dirs: &[PathBuf],
    ) -> Invocation {
        let mut invocation = self.pandoc.invocation().arg(markdown).arg("-o").arg(output);

        if self.options.table_of_contents {
            invocation = invocation.arg("--toc");
        }

        let usable: Vec<&PathBuf> = resource_dirs
            .iter()
            .filter(|dir| env::join_paths([dir]).is_ok())
            .collect();
        if !usable.is_empty() {
            match env::join_paths(usable) {
                Ok(joined) => invocation = invocation.arg("--resource-path").arg(joined),
                Err(e) => debug!(error = %e, "skipping --resource-path"),
            }
        }

        if let Some(template) = template {
            invocation = invocation.arg("--reference-doc").arg(template);
        }
        invocation
    }

    /// Convert `markdown` to `output`
    pub fn convert(
        &self,
        markdown: &Path,
        output: &Path,
        template: Option<&Path>,
        resource_dirs: &[PathBuf],
    ) -> ConversionResult<()> {
        let invocation = self.invocation(markdown, output, template, resource_dirs);
        info!(command = %invocation.command_line(), "converting to DOCX");

        let out = match self.runner.run(&invocation, self.options.convert_timeout) {
            Ok(out) => out,
            Err(RunError::Timeout(timeout)) => {
                return Err(ConversionError::timeout(Tool::Pandoc, timeout))
            }
            Err(RunError::NotFound(_)) => return Err(ConversionError::missing(Tool::Pandoc)),
            Err(RunError::Io { source, .. }) => return Err(ConversionError::Io(source)),
        };

        if !out.success() {
            return Err(ConversionError::non_zero(Tool::Pandoc, out.code, out.error_text()));
        }
        if !output.is_file() {
            return Err(ConversionError::MissingOutput {
                tool: Tool::Pandoc,
                path: output.to_path_buf(),
            });
        }

        // pandoc reports missing images as warnings on an otherwise successful run
        if !out.stderr.trim().is_empty() {
            debug!(stderr = %out.stderr.trim(), "pandoc warnings");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::Strategy;
    use crate::utils::process::{ProcessOutput, ScriptedRunner};
    use std::ffi::OsStr;
    use std::fs;
    use tempfile::tempdir;

    fn pandoc_location() -> ToolLocation {
        ToolLocation {
            program: PathBuf::from("/usr/bin/pandoc"),
            leading_args: Vec::new(),
            strategy: Strategy::SearchPath,
            version: Some("3.1.11".to_string()),
        }
    }

    fn writes_output() -> ScriptedRunner {
        ScriptedRunner::new().on("pandoc", |inv| {
            let out = PathBuf::from(inv.value_of("-o").unwrap());
            fs::write(out, b"PK\x03\x04").unwrap();
            Ok(ProcessOutput::ok(""))
        })
    }

    #[test]
    fn test_invocation_shape() {
        let runner = ScriptedRunner::new();
        let loc = pandoc_location();
        let options = ConvertOptions::default();
        let conv = DocumentConverter::new(&runner, &loc, &options);
        let inv = conv.invocation(
            Path::new("in.md"),
            Path::new("out.docx"),
            Some(Path::new("template.docx")),
            &[PathBuf::from("work"), PathBuf::from("docs")],
        );

        assert_eq!(inv.args[0].as_os_str(), OsStr::new("in.md"));
        assert_eq!(inv.value_of("-o"), Some(OsStr::new("out.docx")));
        assert!(inv.has_flag("--toc"));
        assert_eq!(
            inv.value_of("--reference-doc"),
            Some(OsStr::new("template.docx"))
        );
        let expected = env::join_paths(["work", "docs"]).unwrap();
        assert_eq!(inv.value_of("--resource-path"), Some(expected.as_os_str()));
    }

    #[test]
    fn test_invocation_without_toc_or_template() {
        let runner = ScriptedRunner::new();
        let loc = pandoc_location();
        let options = ConvertOptions {
            table_of_contents: false,
            ..ConvertOptions::default()
        };
        let conv = DocumentConverter::new(&runner, &loc, &options);
        let inv = conv.invocation(Path::new("in.md"), Path::new("out.docx"), None, &[]);

        assert!(!inv.has_flag("--toc"));
        assert!(!inv.has_flag("--reference-doc"));
        assert!(!inv.has_flag("--resource-path"));
    }

    #[test]
    fn test_convert_success() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.docx");
        let runner = writes_output();
        let loc = pandoc_location();
        let options = ConvertOptions::default();

        DocumentConverter::new(&runner, &loc, &options)
            .convert(Path::new("in.md"), &output, None, &[])
            .unwrap();
        assert!(output.is_file());
        assert_eq!(runner.calls_to("pandoc").len(), 1);
    }

    #[test]
    fn test_convert_non_zero_exit() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::new().on_failure("pandoc", 64, "Unknown option --toc");
        let loc = pandoc_location();
        let options = ConvertOptions::default();

        let err = DocumentConverter::new(&runner, &loc, &options)
            .convert(Path::new("in.md"), &dir.path().join("out.docx"), None, &[])
            .unwrap_err();
        assert!(matches!(
            err,
            ConversionError::ExecutableNonZeroExit {
                tool: Tool::Pandoc,
                code: Some(64),
                ..
            }
        ));
        assert!(err.hints()[0].message.contains("upgrade Pandoc"));
    }

    #[test]
    fn test_convert_missing_output() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::new().on_success("pandoc", "");
        let loc = pandoc_location();
        let options = ConvertOptions::default();

        let err = DocumentConverter::new(&runner, &loc, &options)
            .convert(Path::new("in.md"), &dir.path().join("out.docx"), None, &[])
            .unwrap_err();
        assert!(matches!(err, ConversionError::MissingOutput { .. }));
    }

    #[test]
    fn test_convert_timeout() {
        let runner = ScriptedRunner::new().on("pandoc", |_| {
            Err(RunError::Timeout(std::time::Duration::from_secs(60)))
        });
        let loc = pandoc_location();
        let options = ConvertOptions::default();

        let err = DocumentConverter::new(&runner, &loc, &options)
            .convert(Path::new("in.md"), Path::new("out.docx"), None, &[])
            .unwrap_err();
        assert_eq!(err.to_string(), "pandoc timed out after 60s");
    }
}
