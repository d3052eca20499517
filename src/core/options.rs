//! Conversion request and options

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::data::constants::{CONVERT_TIMEOUT, DEFAULT_SCALE, RENDER_TIMEOUT};
use crate::utils::files::{bundled_template, default_output_path};

/// Image format produced by the diagram renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
    Pdf,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
            ImageFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for the rendering and conversion steps
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Format of rendered diagram images
    /// Default: png
    pub image_format: ImageFormat,

    /// Renderer scale factor, `None` leaves the renderer's default
    /// Default: 2
    pub scale: Option<u32>,

    /// Ask the converter for a table of contents
    /// Default: true
    pub table_of_contents: bool,

    /// Puppeteer configuration file handed to the renderer
    /// Default: none
    pub puppeteer_config: Option<PathBuf>,

    /// Upper bound for diagram rendering
    /// Default: 60s
    pub render_timeout: Duration,

    /// Upper bound for document conversion
    /// Default: 60s
    pub convert_timeout: Duration,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            image_format: ImageFormat::Png,
            scale: Some(DEFAULT_SCALE),
            table_of_contents: true,
            puppeteer_config: None,
            render_timeout: RENDER_TIMEOUT,
            convert_timeout: CONVERT_TIMEOUT,
        }
    }
}

impl ConvertOptions {
    /// Create new options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Short timeouts, for tests and quick checks
    pub fn fast() -> Self {
        Self {
            render_timeout: Duration::from_secs(5),
            convert_timeout: Duration::from_secs(5),
            ..Self::default()
        }
    }
}

/// One conversion, as requested on the command line
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    /// Explicit reference document; the bundled one is used when absent
    pub template: Option<PathBuf>,
    pub use_template: bool,
    /// Abort when the diagram renderer is missing
    pub strict: bool,
    /// Keep the derived Markdown and its images next to the output
    pub keep_intermediate: bool,
    /// Explicit renderer location
    pub mmdc_path: Option<PathBuf>,
    /// Explicit converter location
    pub pandoc_path: Option<PathBuf>,
    pub options: ConvertOptions,
}

impl ConversionRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            template: None,
            use_template: true,
            strict: false,
            keep_intermediate: false,
            mmdc_path: None,
            pandoc_path: None,
            options: ConvertOptions::default(),
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn without_template(mut self) -> Self {
        self.use_template = false;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn keep_intermediate(mut self, keep: bool) -> Self {
        self.keep_intermediate = keep;
        self
    }

    pub fn with_mmdc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.mmdc_path = Some(path.into());
        self
    }

    pub fn with_pandoc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.pandoc_path = Some(path.into());
        self
    }

    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    /// Output path, defaulting to the input with a `.docx` extension
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input))
    }

    /// Template the request asks for, whether or not it exists
    ///
    /// `None` when templates are disabled, or when none was given and no
    /// bundled template ships with the executable.
    pub fn requested_template(&self) -> Option<PathBuf> {
        if !self.use_template {
            return None;
        }
        self.template.clone().or_else(bundled_template)
    }

    /// Directory of the input file, `.` for bare file names
    pub fn input_dir(&self) -> PathBuf {
        match self.input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Directory where a retained intermediate file goes
    pub fn intermediate_dir(&self) -> PathBuf {
        let output = self.output_path();
        match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        }
    }
}
