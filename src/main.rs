// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Procboard CLI - process diagrams and their KPIs, straight from the repository

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use procboard::commands::{self, flow::FlowFormat, GlobalOptions, SourceArgs};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "procboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "PROCBOARD_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", global = true)]
    no_color: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List process folders at the repository root
    Folders,

    /// List the diagrams in a folder
    Files {
        /// Folder to list
        folder: String,
    },

    /// Refresh once and print both panels
    Show {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// List the named tasks of a diagram
    Tasks {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the sequence-flow order of a diagram
    Flow {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = FlowFormat::Text)]
        format: FlowFormat,
    },

    /// Write the HTML viewer page for a diagram
    Render {
        #[command(flatten)]
        source: SourceArgs,

        /// Output file (default: `<diagram>.html`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Launch the interactive dashboard
    View {
        #[command(flatten)]
        source: SourceArgs,

        /// Auto-refresh interval in seconds (0 = off, max 600)
        #[arg(long)]
        auto_refresh: Option<u64>,

        /// Where `o` writes the HTML viewer (default: `<diagram>.html`)
        #[arg(long)]
        viewer: Option<PathBuf>,
    },

    /// Draft a KPI table for a diagram's tasks
    Suggest {
        #[command(flatten)]
        source: SourceArgs,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config {
        /// Dotted key, e.g. `repo.branch` (omit to print everything)
        key: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; the dashboard owns the terminal, so it stays silent unless asked
    let log_level = match cli.verbose {
        0 if matches!(cli.command, Commands::View { .. }) => LevelFilter::OFF,
        0 if cli.quiet => LevelFilter::ERROR,
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = procboard::config::load(cli.config.as_deref())?;
    let opts = GlobalOptions {
        config,
        json: cli.json,
        color: !cli.no_color,
    };

    // Execute command
    match cli.command {
        Commands::Folders => commands::folders::run(&opts).await,
        Commands::Files { folder } => commands::files::run(&opts, &folder).await,
        Commands::Show { source } => commands::show::run(&opts, &source).await,
        Commands::Tasks { source } => commands::tasks::run(&opts, &source).await,
        Commands::Flow { source, format } => commands::flow::run(&opts, &source, format).await,
        Commands::Render { source, output } => commands::render::run(&opts, &source, output).await,
        Commands::View { source, auto_refresh, viewer } => {
            commands::view::run(&opts, &source, auto_refresh, viewer).await
        }
        Commands::Suggest { source, output } => commands::suggest::run(&opts, &source, output).await,
        Commands::Config { key } => commands::config::run(&opts, key.as_deref()),
        Commands::Completions { shell } => commands::completions::run(shell, &mut Cli::command()),
    }
}
