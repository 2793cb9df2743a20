//! channel-archiver CLI entry point

use anyhow::Context;
use channel_archiver::{
    commands::{
        cmd_backfill_ocr, cmd_dump, cmd_init, cmd_sync, print_backfill_stats, print_dump_stats,
        print_init_summary, print_sync_stats,
    },
    config::{Config, Credentials},
    ocr::OcrClient,
    progress::{json_log_layer, record_spinner, LogWriterFactory},
    source::HttpMessageSource,
};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "channel-archiver")]
#[command(version, about = "Archive a channel's messages and the text in their images", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "ARCHIVER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON (results on stdout, JSON log lines on stderr)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Channel to archive
        channel: String,

        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Archive messages newer than the last archived one and print how many were added
    Sync,

    /// Seed the archive from the entire channel history
    Dump,

    /// Recognize text on archived images that have none
    BackfillOcr,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // JSON output mode logs as JSON lines on stderr; stdout carries the result
    let json_logs = cli
        .json
        .then(|| json_log_layer(std::io::stderr));
    let text_logs = (!cli.json).then(|| fmt::layer().with_writer(LogWriterFactory));

    tracing_subscriber::registry()
        .with(json_logs)
        .with(text_logs)
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_config_path);

    match cli.command {
        Commands::Init { channel, force } => {
            let config = cmd_init(&config_path, &channel, force)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print_init_summary(&config);
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "channel-archiver", &mut std::io::stdout());
        }

        Commands::Sync => {
            let config = load_config(&config_path)?;
            let credentials = config
                .credentials()
                .context("resolving credentials from the environment")?;
            let (source, ocr) = build_clients(&config, &credentials)?;

            let stats = cmd_sync(&config, &source, &ocr, spinner("sync", cli.json)).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_sync_stats(&stats);
            }
        }

        Commands::Dump => {
            let config = load_config(&config_path)?;
            let credentials = config
                .credentials()
                .context("resolving credentials from the environment")?;
            let (source, ocr) = build_clients(&config, &credentials)?;

            let stats = cmd_dump(&config, &source, &ocr, spinner("dump", cli.json)).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_dump_stats(&stats);
            }
        }

        Commands::BackfillOcr => {
            let config = load_config(&config_path)?;
            let credentials = config
                .credentials()
                .context("resolving credentials from the environment")?;
            let (source, ocr) = build_clients(&config, &credentials)?;

            let stats =
                cmd_backfill_ocr(&config, &source, &ocr, spinner("backfill", cli.json)).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_backfill_stats(&stats);
            }
        }
    }

    Ok(())
}

fn load_config(path: &std::path::Path) -> anyhow::Result<Config> {
    Config::load_or_default(path)
        .with_context(|| format!("invalid configuration in {}", path.display()))
}

fn build_clients(
    config: &Config,
    credentials: &Credentials,
) -> anyhow::Result<(HttpMessageSource, OcrClient)> {
    let source = HttpMessageSource::new(&config.source, &config.channel, credentials)?;
    let ocr = OcrClient::new(&config.ocr, credentials)?;
    Ok((source, ocr))
}

fn spinner(label: &str, json: bool) -> indicatif::ProgressBar {
    record_spinner(label, !json && std::io::stderr().is_terminal())
}
