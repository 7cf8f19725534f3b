//! Command-line interface definition and dispatch.

use crate::commands;
use crate::common::CommonParams;
use crate::log_debug;
use crate::ui;
use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand, crate_version};

const LOG_FILE: &str = "git-chronicle-debug.log";

/// CLI structure defining the available commands and global arguments
#[derive(Parser)]
#[command(
    author,
    version = crate_version!(),
    about = "Git-Chronicle: AI-powered repository historian",
    long_about = "Git-Chronicle analyzes a repository's commit history and produces a \
        stakeholder narrative, a structured changelog, and a daily activity log.",
    styles = get_styles(),
)]
pub struct Cli {
    /// Subcommands available for the CLI
    #[command(subcommand)]
    pub command: Commands,

    /// Log debug messages to a file
    #[arg(
        short = 'l',
        long = "log",
        global = true,
        help = "Log debug messages to a file"
    )]
    pub log: bool,

    /// Specify a custom log file path
    #[arg(
        long = "log-file",
        global = true,
        help = "Specify a custom log file path"
    )]
    pub log_file: Option<String>,

    /// Suppress non-essential output (spinners, progress messages)
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress non-essential output"
    )]
    pub quiet: bool,
}

/// Enumeration of available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a window of history and update the three artifacts
    #[command(about = "Analyze a window of history and update the three artifacts")]
    Report {
        #[command(flatten)]
        common: CommonParams,

        /// Start of the analysis window (RFC 3339 or YYYY-MM-DD)
        #[arg(long, help = "Start of the analysis window (RFC 3339 or YYYY-MM-DD)")]
        since: Option<String>,

        /// End of the analysis window (RFC 3339 or YYYY-MM-DD, defaults to now)
        #[arg(long, help = "End of the analysis window (defaults to now)")]
        until: Option<String>,

        /// Analyze the last N weeks instead of an explicit range
        #[arg(short, long, help = "Analyze the last N weeks", conflicts_with_all = ["since", "until"])]
        weeks: Option<u32>,

        /// Promote the Unreleased changelog section under this version tag
        #[arg(long, help = "Promote the Unreleased changelog section under this version tag")]
        release_tag: Option<String>,

        /// Directory for the output artifacts (defaults to the repository root)
        #[arg(short, long, help = "Directory for the output artifacts")]
        output: Option<String>,
    },

    /// Remove cached LLM results
    #[command(about = "Remove cached LLM results")]
    ClearCache {
        /// Limit clearing to one namespace (commit, daily, weekly-narrative, weekly-changelog)
        #[arg(long, help = "Limit clearing to one namespace")]
        namespace: Option<String>,
    },

    /// View or update configuration
    #[command(about = "View or update configuration")]
    Config {
        #[command(flatten)]
        common: CommonParams,

        /// Set the API key for the current provider
        #[arg(long, help = "Set the API key for the current provider")]
        api_key: Option<String>,

        /// Set the model for the balanced and deep tiers
        #[arg(long, help = "Set the model for the balanced and deep tiers")]
        model: Option<String>,

        /// Set the model for the fast tier
        #[arg(long, help = "Set the model for the fast tier")]
        fast_model: Option<String>,

        /// Set the input token limit for the current provider
        #[arg(long, help = "Set the input token limit for the current provider")]
        token_limit: Option<usize>,
    },
}

/// Define custom styles for Clap
fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Magenta.on_default().bold())
        .usage(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Green.on_default().bold())
        .placeholder(AnsiColor::Yellow.on_default())
}

/// Parse the command-line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Entry point for handling CLI commands
pub async fn main() -> anyhow::Result<()> {
    let cli = parse_args();

    if cli.log {
        crate::logger::enable_logging();
        let log_file = cli.log_file.as_deref().unwrap_or(LOG_FILE);
        crate::logger::set_log_file(log_file)?;
    } else {
        crate::logger::disable_logging();
    }

    handle_command(cli).await
}

/// Handle the parsed CLI command
pub async fn handle_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Report {
            common,
            since,
            until,
            weeks,
            release_tag,
            output,
        } => {
            log_debug!("Handling 'report' command");
            commands::handle_report(
                common,
                since,
                until,
                weeks,
                release_tag,
                output,
                cli.quiet,
            )
            .await
        }
        Commands::ClearCache { namespace } => {
            log_debug!("Handling 'clear-cache' command");
            commands::handle_clear_cache(namespace.as_deref())
        }
        Commands::Config {
            common,
            api_key,
            model,
            fast_model,
            token_limit,
        } => {
            log_debug!("Handling 'config' command");
            commands::handle_config(common, api_key, model, fast_model, token_limit)
        }
    }
    .inspect_err(|e| ui::print_error(&format!("Error: {e}")))
}
