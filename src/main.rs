//! schedulai CLI entry point.
//!
//! This is the main binary for schedulai.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use schedulai::cli::{self, DEFAULT_CONFIG_PATH};
use schedulai::gateway::{AssistantConfig, Gateway, GatewayServer};
use schedulai::{parse_time_range, TimePhraseParser};

/// Conversational scheduling assistant.
#[derive(Parser)]
#[command(name = "schedulai")]
#[command(about = "Book, check and cancel meetings by chatting.")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, env = "SCHEDULAI_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
    },

    /// Send a message, or start an interactive chat when none is given
    Chat {
        /// Message text
        message: Vec<String>,

        /// Session id
        #[arg(short, long, default_value = "cli")]
        session: String,
    },

    /// Show what the time-phrase parser reads from a text
    Parse {
        /// Text to parse
        text: Vec<String>,

        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// List open slots on a day
    Slots {
        /// Day, e.g. "tomorrow" or "2026-06-16"
        date: Vec<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current config
    Show,

    /// Validate config
    Validate,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, found) = cli::load_or_default(&cli.config)
        .with_context(|| format!("reading config {}", cli.config.display()))?;

    init_logging(&config, cli.verbose);
    if !found {
        tracing::debug!(path = %cli.config.display(), "no config file, using defaults");
    }

    match cli.command {
        Commands::Serve { port, host } => {
            let gateway = Arc::new(connect(&config).await?);
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            GatewayServer::new(gateway, &host, port)
                .with_cors(config.server.cors_enabled)
                .with_sweep_interval(Duration::from_secs(config.session.sweep_interval_seconds))
                .start()
                .await?;
        }

        Commands::Chat { message, session } => {
            let gateway = connect(&config).await?;
            if message.is_empty() {
                chat_loop(&gateway, &session).await?;
            } else {
                println!("{}", gateway.handle_message(&session, &message.join(" ")).await);
            }
        }

        Commands::Parse { text, today } => {
            let text = text.join(" ");
            let today = match today {
                Some(date) => date,
                None => {
                    let tz = config.schedule_rules()?.timezone;
                    chrono::Utc::now().with_timezone(&tz).date_naive()
                }
            };

            let found = TimePhraseParser::new().parse(&text, today);
            println!("{}", cli::describe_extracted(&found));
            if let Some(range) = parse_time_range(&text) {
                println!(
                    "range: {} - {}{}",
                    range.start.format("%H:%M"),
                    range.end.format("%H:%M"),
                    if range.crosses_midnight() { " (next day)" } else { "" }
                );
            }
        }

        Commands::Slots { date } => {
            let gateway = connect(&config).await?;
            let negotiator = gateway.negotiator();
            let text = date.join(" ");
            let date = negotiator
                .parser()
                .parse(&text, negotiator.today())
                .date
                .with_context(|| format!("no date recognized in {:?}", text))?;

            let slots = negotiator.open_slots(date).await?;
            println!("{}", date.format("%A, %B %-d, %Y"));
            println!("{}", cli::describe_slots(&slots));
        }

        Commands::Config { action } => match action {
            ConfigCommands::Show => {
                println!("Config path: {}", cli::expand_path(&cli.config).display());
                if !found {
                    println!("(file not found, showing defaults)");
                }
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigCommands::Validate => {
                config.validate()?;
                println!("Config is valid.");
            }
            ConfigCommands::Init { force } => {
                let path = cli::init_config(&cli.config, force)?;
                println!("Wrote default config to {}", path.display());
            }
        },
    }

    Ok(())
}

fn init_logging(config: &AssistantConfig, verbose: bool) {
    let log_level = if verbose { "debug" } else { config.logging.level.as_str() };
    let json = config.logging.json_format;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

async fn connect(config: &AssistantConfig) -> anyhow::Result<Gateway> {
    Gateway::connect(config)
        .await
        .context("could not set up the calendar and language model")
}

async fn chat_loop(gateway: &Gateway, session: &str) -> anyhow::Result<()> {
    println!("schedulai {} - type a message, or \"quit\" to exit.", schedulai::VERSION);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }
        println!("{}\n", gateway.handle_message(session, line).await);
    }
    Ok(())
}
