//! Newswire CLI
//!
//! Polls the configured news homepage and posts new articles to a webhook.

use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand};
use newswire::{
    error::{AppError, Result},
    models::Config,
    pipeline::{self, poll},
    services::{ArticleParser, WebhookNotifier},
    storage::{HistoryStore, SeenMarker},
    utils::http::HttpPageSource,
};

/// Newswire - news homepage to chat webhook relay
#[derive(Parser, Debug)]
#[command(
    name = "newswire",
    version,
    about = "Relay new articles from a news homepage to a chat webhook"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "newswire.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll forever (until Ctrl-C)
    Run,

    /// Run a single cycle and exit
    Once,

    /// Fetch and resolve the page without posting anything
    Preview {
        /// Show every article on the page, ignoring history and date policy
        #[arg(long)]
        all: bool,

        /// Write the JSON result to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration
    Validate,

    /// Show what the history file contains
    History {
        /// List every stored identifier
        #[arg(long)]
        list: bool,
    },
}

/// Initialize logging at the given default level.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Load the config file; a missing file means defaults plus env overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let loaded = Config::load(&cli.config);

    let level = if cli.verbose {
        "debug"
    } else {
        loaded
            .as_ref()
            .map(|c| c.logging.level.as_str())
            .unwrap_or("info")
    };
    init_logging(level);

    let mut config = match loaded {
        Ok(config) => {
            log::info!("Loaded configuration from {}", cli.config.display());
            config
        }
        Err(AppError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            log::warn!(
                "No config file at {}, using defaults",
                cli.config.display()
            );
            Config::default()
        }
        Err(e) => {
            log::error!("Failed to load {}: {}", cli.config.display(), e);
            return Err(e);
        }
    };

    config.apply_env_overrides();
    Ok(config)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::Run => {
            config.validate()?;
            let source = HttpPageSource::new(&config.source)?;
            let sink = WebhookNotifier::new(&config.delivery)?;

            log::info!("Newswire starting...");
            poll::run(&config, &source, &sink).await?;
        }

        Command::Once => {
            config.validate()?;
            let source = HttpPageSource::new(&config.source)?;
            let sink = WebhookNotifier::new(&config.delivery)?;
            let parser = ArticleParser::new(&config.selectors)?;
            let mut history = HistoryStore::load(&config.history.path);

            let today = Local::now().date_naive();
            let report =
                pipeline::run_cycle(&config, &parser, &source, &sink, &mut history, today).await?;
            report.log_summary();
        }

        Command::Preview { all, output } => {
            config.validate_source()?;
            config.selectors.validate()?;
            let source = HttpPageSource::new(&config.source)?;
            let parser = ArticleParser::new(&config.selectors)?;
            let history = HistoryStore::read(&config.history.path);

            let today = Local::now().date_naive();
            let articles =
                pipeline::preview(&config, &parser, &source, &history, today, all).await?;
            let json = serde_json::to_string_pretty(&articles)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    log::info!("Wrote {} article(s) to {}", articles.len(), path.display());
                }
                None => println!("{json}"),
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }

        Command::History { list } => {
            let history = HistoryStore::read(&config.history.path);
            log::info!("History file: {}", history.path().display());
            log::info!("Stored articles: {}", history.len());

            if list {
                for (id, marker) in history.iter() {
                    match marker {
                        SeenMarker::Entry(entry) => println!(
                            "{}\t{}\t{}",
                            entry.posted_at.as_deref().unwrap_or("-"),
                            id,
                            entry.title.as_deref().unwrap_or("")
                        ),
                        SeenMarker::Other(_) => println!("-\t{id}\t"),
                    }
                }
            }
        }
    }

    Ok(())
}
