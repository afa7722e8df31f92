//! xpatch CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod inputs;

#[derive(Parser)]
#[command(name = "xpatch")]
#[command(version)]
#[command(about = "Apply declarative patches to XML documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply patches to a document
    Apply {
        /// Document to patch (defaults to `document` in xpatch.toml)
        document: Option<PathBuf>,

        /// Patch files or directories of patches, applied in order
        patches: Vec<PathBuf>,

        /// Write the result to FILE instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Pretty-print with N spaces per level
        #[arg(long, value_name = "N")]
        indent: Option<usize>,

        /// Record the evaluation and print it to stderr
        #[arg(long)]
        trace: bool,

        /// How to print the trace
        #[arg(long, value_enum, default_value_t = TraceFormat::Text)]
        trace_format: TraceFormat,

        /// Apply `<Patch>` elements found inside the document first
        #[arg(long)]
        embedded: bool,

        /// Manifest to read defaults from
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
    },

    /// Load patches and report errors without applying them
    Check {
        /// Patch files or directories of patches
        patches: Vec<PathBuf>,

        /// Manifest to read defaults from
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TraceFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    // XPATCH_LOG takes precedence over RUST_LOG
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("XPATCH_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| "xpatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            document,
            patches,
            output,
            indent,
            trace,
            trace_format,
            embedded,
            config,
        } => commands::apply::execute(commands::apply::ApplyArgs {
            document,
            patches,
            output,
            indent,
            trace,
            trace_format,
            embedded,
            config,
        }),
        Commands::Check { patches, config } => {
            commands::check::execute(commands::check::CheckArgs { patches, config })
        }
    }
}
