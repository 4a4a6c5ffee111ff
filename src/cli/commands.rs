use crate::config::{
    pick, Config, DEFAULT_HANDLERS_INPUT, DEFAULT_HANDLERS_OUTPUT, DEFAULT_HANDLERS_PACKAGE,
    DEFAULT_LISTING_INPUT, DEFAULT_LISTING_OUTPUT, DEFAULT_LISTING_PACKAGE,
};
use crate::generator::{
    generate_handlers, generate_listing, route_table, scan, HandlerOptions, ListingOptions,
    RouteEntry,
};
use crate::logging::LogConfig;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Command-line interface for handlergen
#[derive(Parser, Debug)]
#[command(name = "handlergen", version)]
#[command(about = "Generate Go request dispatchers from controller packages", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Debug-level pretty logs with source locations, ignoring HANDLERGEN_LOG_*
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Logging setup for this invocation.
    pub fn log_config(&self) -> LogConfig {
        if self.verbose {
            LogConfig::default_dev()
        } else {
            LogConfig::from_env()
        }
    }
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate Go source
    Generate {
        #[command(subcommand)]
        target: GenerateTarget,
    },
    /// Print the routes of a controller package without generating anything
    Routes {
        /// Controller package directory (default: ./controllers)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Path to handlergen.toml; auto-detected next to the input or in the current directory
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// What `generate` produces
#[derive(Subcommand, Debug)]
pub enum GenerateTarget {
    /// One dispatcher per controller plus init.go
    Handlers(GenerateArgs),
    /// listing.go with every file below the input directory
    Listing(GenerateArgs),
}

/// Flags shared by every generator
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateArgs {
    /// Input directory
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output directory, created when missing
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Go package name of the generated code
    #[arg(short, long)]
    pub package: Option<String>,

    /// Path to handlergen.toml; auto-detected next to the input or in the current directory
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Render everything but do not write files
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

/// Execute a parsed command line.
pub fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate {
            target: GenerateTarget::Handlers(args),
        } => {
            let config = Config::discover(
                args.config.as_deref(),
                &probe_dir(args.input.as_deref(), DEFAULT_HANDLERS_INPUT),
            )?;
            let mut options = handler_options(args.input, &config)?;
            options.output = pick(args.output, config.handlers.output.as_ref(), DEFAULT_HANDLERS_OUTPUT.into());
            options.package = pick(
                args.package,
                config.handlers.package.as_ref(),
                DEFAULT_HANDLERS_PACKAGE.to_string(),
            );
            options.dry_run = args.dry_run;

            let report = generate_handlers(&options)?;
            tracing::info!(
                files = report.files.len(),
                warnings = report.diagnostics.len(),
                output = %options.output.display(),
                dry_run = options.dry_run,
                "handlers generated"
            );
            Ok(())
        }
        Commands::Generate {
            target: GenerateTarget::Listing(args),
        } => {
            let config = Config::discover(
                args.config.as_deref(),
                &probe_dir(args.input.as_deref(), DEFAULT_LISTING_INPUT),
            )?;
            let mut options = ListingOptions::new(
                pick(args.input, config.listing.input.as_ref(), DEFAULT_LISTING_INPUT.into()),
                pick(args.output, config.listing.output.as_ref(), DEFAULT_LISTING_OUTPUT.into()),
                pick(args.package, config.listing.package.as_ref(), DEFAULT_LISTING_PACKAGE.to_string()),
            );
            options.templates_dir = config.templates_dir.clone();
            options.dry_run = args.dry_run;

            let path = generate_listing(&options)?;
            tracing::info!(path = %path.display(), dry_run = options.dry_run, "listing generated");
            Ok(())
        }
        Commands::Routes {
            input,
            config,
            json,
        } => {
            let config = Config::discover(
                config.as_deref(),
                &probe_dir(input.as_deref(), DEFAULT_HANDLERS_INPUT),
            )?;
            let options = handler_options(input, &config)?;
            let (_, resolution) = scan(&options)?;
            let table = route_table(&resolution);
            if json {
                let out = serde_json::to_string_pretty(&table).context("Failed to encode routes")?;
                println!("{out}");
            } else {
                print!("{}", format_route_table(&table));
            }
            Ok(())
        }
    }
}

/// Directory the configuration file is looked up in.
fn probe_dir(flag: Option<&Path>, default: &str) -> PathBuf {
    flag.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(default))
}

/// Scan settings for the handlers input; output and package stay at their defaults.
pub fn handler_options(input: Option<PathBuf>, config: &Config) -> Result<HandlerOptions> {
    let mut options = HandlerOptions::new(
        pick(input, config.handlers.input.as_ref(), DEFAULT_HANDLERS_INPUT.into()),
        DEFAULT_HANDLERS_OUTPUT,
        DEFAULT_HANDLERS_PACKAGE,
    );
    options.output_import = config.handlers.output_import.clone();
    options.strconv_import = config.strconv_import.clone();
    options.prefixes = config.prefixes()?;
    options.markers = config.markers.clone();
    options.roots = config.roots.clone();
    options.templates_dir = config.templates_dir.clone();
    Ok(options)
}

/// Plain-text route table, one route per line.
pub fn format_route_table(entries: &[RouteEntry]) -> String {
    let method_width = entries
        .iter()
        .map(|e| e.route.method.as_str().len())
        .max()
        .unwrap_or(0);
    let pattern_width = entries.iter().map(|e| e.route.pattern.len()).max().unwrap_or(0);

    let mut out = String::new();
    for entry in entries {
        let route = &entry.route;
        let line = format!(
            "{:<mw$}  {:<pw$}  {}",
            route.method.as_str(),
            route.pattern,
            route.handler_name,
            mw = method_width,
            pw = pattern_width,
        );
        out.push_str(&line);
        if let Some(label) = &route.label {
            out.push_str("  ");
            out.push_str(label);
        }
        out.push('\n');
    }
    out
}
