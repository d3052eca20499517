//! Core conversion modules
//!
//! This module contains the conversion pipeline and its steps:
//! - `resolver`: locates and validates the external tools
//! - `preprocess`: renders Mermaid diagrams into a derived Markdown file
//! - `convert`: turns Markdown into a Word document
//! - `pipeline`: sequences the steps for one request

pub mod convert;
pub mod options;
pub mod pipeline;
pub mod preprocess;
pub mod resolver;

pub use convert::DocumentConverter;
pub use options::{ConversionRequest, ConvertOptions, ImageFormat};
pub use pipeline::{convert_markdown, convert_markdown_with, ConversionOutcome, Pipeline};
pub use preprocess::{contains_diagrams, count_diagrams, DiagramPreprocessor, PreprocessOutcome};
pub use resolver::{
    RejectedCandidate, Resolution, ResolvedTools, Resolver, ResolverConfig, Strategy, ToolLocation,
};
