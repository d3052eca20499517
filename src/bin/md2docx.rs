//! md2docx CLI - Markdown to Word converter with Mermaid diagram support

#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};
#[cfg(feature = "cli")]
use md2docx::{
    constants::DEFAULT_SCALE, convert_markdown_with, format_diagnostics, instructions,
    ConversionError, ConversionRequest, ConvertOptions, DependencyReport, Diagnostic, ImageFormat,
    Installer, LinuxDistro, Resolver, ResolverConfig, SystemRunner, Tool,
};
#[cfg(feature = "cli")]
use std::io::{self, IsTerminal};
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use std::process::ExitCode;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "md2docx")]
#[command(version)]
#[command(about = "Convert Markdown to Word, rendering Mermaid diagrams to images", long_about = None)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input Markdown file (.md or .markdown)
    input: Option<PathBuf>,

    /// Output file path (defaults to the input with a .docx extension)
    #[arg(value_name = "OUTPUT")]
    output_file: Option<PathBuf>,

    /// Output file path
    #[arg(short, long, conflicts_with = "output_file")]
    output: Option<PathBuf>,

    /// Reference document used for styling
    #[arg(long, env = "MD2DOCX_TEMPLATE", value_name = "FILE")]
    template: Option<PathBuf>,

    /// Use Pandoc's default styling, ignoring any template
    #[arg(long)]
    no_template: bool,

    /// Check dependencies and exit
    #[arg(long)]
    check_deps: bool,

    #[command(flatten)]
    tools: ToolPaths,

    /// Strict mode: fail when Mermaid CLI is missing instead of skipping diagrams
    #[arg(long)]
    strict: bool,

    /// Keep the processed Markdown and rendered images next to the output
    #[arg(long)]
    keep_intermediate: bool,

    /// Puppeteer configuration file passed to Mermaid CLI
    #[arg(long, value_name = "FILE")]
    puppeteer_config: Option<PathBuf>,

    /// Diagram scale factor
    #[arg(long, default_value_t = DEFAULT_SCALE, value_parser = clap::value_parser!(u32).range(1..=10))]
    scale: u32,

    /// Diagram image format
    #[arg(long, value_enum, default_value_t = ImageFormat::Png)]
    image_format: ImageFormat,

    /// Do not add a table of contents
    #[arg(long)]
    no_toc: bool,

    #[command(flatten)]
    output_style: OutputStyle,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ToolPaths {
    /// Path to the Mermaid CLI executable
    #[arg(long, env = "MD2DOCX_MMDC", value_name = "PATH", global = true)]
    mmdc_path: Option<PathBuf>,

    /// Path to the Pandoc executable
    #[arg(long, env = "MD2DOCX_PANDOC", value_name = "PATH", global = true)]
    pandoc_path: Option<PathBuf>,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct OutputStyle {
    /// Quiet mode: suppress warnings and progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose mode: debug logging and rejected tool candidates
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Check that Pandoc and Mermaid CLI are installed and runnable
    Check {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show installation instructions (for every missing tool by default)
    Instructions {
        /// Tool to show instructions for (pandoc or mmdc)
        tool: Option<Tool>,
    },

    /// Install a tool automatically (Mermaid CLI only, through npm)
    Install {
        /// Tool to install
        tool: Tool,
    },

    /// Show version and feature info
    Info,
}

#[cfg(feature = "cli")]
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.output_style.verbose);

    let config = ResolverConfig::from_process()
        .with_optional(Tool::Pandoc, cli.tools.pandoc_path.as_deref())
        .with_optional(Tool::Mmdc, cli.tools.mmdc_path.as_deref());

    let result = match &cli.command {
        Some(cmd) => handle_subcommand(cmd, &cli, &config),
        None if cli.check_deps => check(&cli, &config, false),
        None => convert(&cli, &config),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            let use_color = !cli.output_style.no_color && io::stderr().is_terminal();
            eprint!("{}", format_diagnostics(&[Diagnostic::from(&err)], use_color));
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "cli")]
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    // RUST_LOG sets the baseline; -v raises everything to debug on top of it
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if verbose {
        filter = filter.add_directive(tracing::Level::DEBUG.into());
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[cfg(feature = "cli")]
fn convert(cli: &Cli, config: &ResolverConfig) -> Result<ExitCode, ConversionError> {
    let Some(input) = &cli.input else {
        eprintln!("error: an input Markdown file is required");
        eprintln!();
        eprintln!("Usage: md2docx <INPUT> [OUTPUT] [OPTIONS]");
        eprintln!("For more information, try '--help'.");
        return Ok(ExitCode::FAILURE);
    };
    let style = &cli.output_style;

    let options = ConvertOptions {
        image_format: cli.image_format,
        scale: Some(cli.scale),
        table_of_contents: !cli.no_toc,
        puppeteer_config: cli.puppeteer_config.clone(),
        ..ConvertOptions::default()
    };

    let mut request = ConversionRequest::new(input)
        .strict(cli.strict)
        .keep_intermediate(cli.keep_intermediate)
        .with_options(options);
    if let Some(output) = cli.output.as_ref().or(cli.output_file.as_ref()) {
        request = request.with_output(output);
    }
    if let Some(template) = &cli.template {
        request = request.with_template(template);
    }
    if cli.no_template {
        request = request.without_template();
    }

    if !style.quiet {
        eprintln!("Converting {} ...", input.display());
    }
    let outcome = convert_markdown_with(&request, config, &SystemRunner::new())?;

    if !style.quiet && !outcome.warnings.is_empty() {
        let use_color = !style.no_color && io::stderr().is_terminal();
        eprint!("{}", format_diagnostics(&outcome.warnings, use_color));
    }

    println!("✓ {}", outcome.summary());
    if let Some(template) = &outcome.template {
        if style.verbose {
            println!("  template: {}", template.display());
        }
    }
    if let Some(intermediate) = &outcome.intermediate {
        println!("  intermediate: {}", intermediate.display());
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(feature = "cli")]
fn check(cli: &Cli, config: &ResolverConfig, json: bool) -> Result<ExitCode, ConversionError> {
    let resolved = Resolver::new(config, &SystemRunner::new()).resolve_all(&Tool::ALL);
    let report = DependencyReport::from_resolved(&resolved);

    if json {
        println!("{}", report.to_json().map_err(io::Error::from)?);
    } else {
        let use_color = !cli.output_style.no_color && io::stdout().is_terminal();
        print!("{}", report.render_text(cli.output_style.verbose, use_color));

        let missing = report.missing();
        if !missing.is_empty() {
            println!();
            print!("{}", instructions(&missing, &LinuxDistro::detect()));
        }
    }

    Ok(if report.all_present() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(feature = "cli")]
fn handle_subcommand(
    cmd: &Commands,
    cli: &Cli,
    config: &ResolverConfig,
) -> Result<ExitCode, ConversionError> {
    match cmd {
        Commands::Check { json } => check(cli, config, *json),

        Commands::Instructions { tool } => {
            let tools = match tool {
                Some(tool) => vec![*tool],
                None => Resolver::new(config, &SystemRunner::new())
                    .resolve_all(&Tool::ALL)
                    .missing(),
            };
            print!("{}", instructions(&tools, &LinuxDistro::detect()));
            Ok(ExitCode::SUCCESS)
        }

        Commands::Install { tool } => {
            let runner = SystemRunner::new();
            let installer = Installer::new(&runner, config);
            if !cli.output_style.quiet {
                eprintln!("Attempting to install {} ...", tool.display_name());
            }
            match installer.install(*tool) {
                Ok(resolution) if resolution.is_found() => {
                    println!("✓ {} installed successfully!", tool.display_name());
                    Ok(ExitCode::SUCCESS)
                }
                Ok(_) => {
                    println!(
                        "⚠ {} was installed but cannot be found; add the npm global bin directory to PATH",
                        tool.display_name()
                    );
                    Ok(ExitCode::FAILURE)
                }
                Err(err @ ConversionError::InstallUnsupported(_)) => {
                    print!("{}", instructions(&[*tool], &LinuxDistro::detect()));
                    println!();
                    Err(err)
                }
                Err(err) => Err(err),
            }
        }

        Commands::Info => {
            println!("md2docx - Markdown to Word converter");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Features:");
            println!("  ✓ Markdown → DOCX conversion (Pandoc)");
            println!("  ✓ Mermaid diagrams rendered to PNG/SVG/PDF (Mermaid CLI)");
            println!("  ✓ Reference document styling (--template)");
            println!("  ✓ Tool discovery: PATH, npm/pnpm/yarn/Volta dirs, common locations, npx");
            println!("  ✓ Dependency check, install instructions and npm install");
            println!();
            println!("External tools:");
            for tool in Tool::ALL {
                println!(
                    "  - {} ({}){}: {}",
                    tool.display_name(),
                    tool.binary_name(),
                    if tool.is_required() { "" } else { ", optional" },
                    tool.homepage()
                );
            }
            println!();
            println!("Environment:");
            println!("  MD2DOCX_PANDOC, MD2DOCX_MMDC   tool paths");
            println!("  MD2DOCX_TEMPLATE               reference document");
            println!("  RUST_LOG                       log filter");
            println!();
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Build with --features cli");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  cargo install md2docx --features cli");
    eprintln!("  md2docx [OPTIONS] <INPUT> [OUTPUT]");
}
