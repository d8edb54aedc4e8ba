//! Command-line host for OddBot.

mod host;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use oddbot_core::config::env_vars;
use oddbot_core::extension::{ExtensionRegistry, FactoryLoader};
use oddbot_core::host::{ConsoleNotifier, DynNotifier, HostContext, UserRef};
use oddbot_core::BotConfig;
use oddbot_silly_id::extension::parse_user_id;
use oddbot_silly_id::SillyIdExtension;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::host::{Flow, Host};

/// OddBot - silly ids for everyone.
#[derive(Parser, Debug)]
#[command(name = "oddbot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Config file (defaults to ./oddbot.toml when present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Start the bot and read commands from stdin.
    Run,
    /// Show the silly id of a user, assigning one if needed.
    Lookup {
        /// User id or mention.
        user: String,
        /// Display name for the embed.
        #[arg(short, long)]
        name: Option<String>,
        /// Print the embed as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List extensions found in the extensions directory.
    Extensions {
        /// Directory to scan instead of the configured one.
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = BotConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        Command::Run => run(config).await,
        Command::Lookup { user, name, json } => lookup(config, &user, name, json).await,
        Command::Extensions { dir } => list_extensions(config, dir).await,
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };

    // Check if JSON logging is requested (for production/container environments)
    let json_logging = std::env::var(env_vars::LOG_JSON)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "oddbot={lvl},oddbot_core={lvl},oddbot_storage={lvl},oddbot_silly_id={lvl},warn",
            lvl = default_level
        ))
    });

    // Logs go to stderr; stdout carries command output.
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Run the interactive host until `quit` or end of input.
async fn run(config: BotConfig) -> Result<()> {
    let activity = config.activity.clone();
    let host = Host::new(config, Arc::new(ConsoleNotifier::new()));
    host.start().await?;

    info!(category = "host", %activity, "Presence set");
    println!("\nBot started successfully!\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if host.execute(&line).await == Flow::Quit {
            break;
        }
    }

    host.shutdown().await;
    println!("Goodbye!");
    Ok(())
}

/// One-shot lookup without going through the registry.
async fn lookup(config: BotConfig, user: &str, name: Option<String>, json: bool) -> Result<()> {
    config.ensure_data_dir()?;

    let notifier: DynNotifier = if json {
        Arc::new(ConsoleNotifier::json())
    } else {
        Arc::new(ConsoleNotifier::new())
    };
    let ctx = HostContext::new(config, notifier);
    let ext = SillyIdExtension::open(&ctx).context("Failed to open silly id database")?;

    let id = parse_user_id(user)?;
    let user = UserRef::new(id, name.unwrap_or_else(|| format!("user {}", id)));
    ext.check_user(&user).await?;
    ext.flush()?;
    Ok(())
}

/// Print the extensions the registry would see.
async fn list_extensions(config: BotConfig, dir: Option<PathBuf>) -> Result<()> {
    let root = dir.unwrap_or_else(|| config.extensions_dir.clone());
    let registry = ExtensionRegistry::new(Arc::new(FactoryLoader::new()));
    let found = registry.discover(&root).await?;

    if found.is_empty() {
        println!("No extensions found in {}", root.display());
        return Ok(());
    }

    println!("Extensions in {}:", root.display());
    for descriptor in found {
        let description = descriptor.manifest.description.as_deref().unwrap_or("-");
        let version = descriptor.manifest.version.as_deref().unwrap_or("-");
        println!("  {:<16} {:<8} {}", descriptor.name, version, description);
    }
    Ok(())
}
