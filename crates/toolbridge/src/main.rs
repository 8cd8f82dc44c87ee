//! toolbridge - stream Gemini function-calling chats to an IDE.
//!
//! Usage:
//!   toolbridge                      Start the bridge on the configured address
//!   toolbridge serve --root <dir>   Serve a specific workspace
//!   toolbridge check-config         Print the effective configuration

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use toolbridge_core::{Config, ConfigOverrides};
use toolbridge_provider::GeminiProvider;
use toolbridge_server::{create_router, AppState};
use toolbridge_util::log::{LogConfig, LogLevel};
use tracing::info;

#[derive(Parser)]
#[command(name = "toolbridge")]
#[command(author, version, about = "Gemini tool-calling bridge for IDEs", long_about = None)]
struct Cli {
    /// Listen address (host:port)
    #[arg(long, global = true)]
    address: Option<String>,

    /// Workspace root all file access is confined to
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Config file (defaults to toolbridge.json in the workspace root)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Model to use
    #[arg(long, short, global = true)]
    model: Option<String>,

    /// Log level for toolbridge crates (trace, debug, info, warn, error)
    #[arg(long, global = true, value_parser = parse_log_level)]
    log_level: Option<LogLevel>,

    /// Enable debug logging (overrides --log-level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP bridge (default)
    Serve,
    /// Print the effective configuration and exit
    CheckConfig,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            workspace_root: self.root.clone(),
            model: self.model.clone(),
            address: self.address.clone(),
        }
    }

    fn log_config(&self) -> LogConfig {
        LogConfig {
            level: if self.verbose {
                LogLevel::Debug
            } else {
                self.log_level.unwrap_or_default()
            },
            include_location: self.verbose,
            ansi: std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

fn parse_log_level(value: &str) -> Result<LogLevel, String> {
    LogLevel::parse(value).ok_or_else(|| {
        format!("unknown log level '{value}' (expected trace, debug, info, warn or error)")
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    toolbridge_util::log::init(cli.log_config());

    let config = Config::load(&cli.overrides()).context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await,
        Commands::CheckConfig => check_config(&config),
    }
}

/// Start the bridge and serve until the process is stopped.
async fn run_server(config: Config) -> anyhow::Result<()> {
    config.validate()?;
    let api_key = config.api_key().context("No API key configured")?;

    let provider = GeminiProvider::new(api_key, &config.model)
        .context("Failed to create Gemini client")?
        .with_api_base(config.api_base.clone());

    let address = config.address.clone();
    info!(
        model = %config.model,
        root = %config.workspace_root().display(),
        tools = config.enable_tools,
        "Starting toolbridge"
    );

    let state = AppState::new(config, Arc::new(provider));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server listening on http://{}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Print the effective configuration with the API key redacted.
fn check_config(config: &Config) -> anyhow::Result<()> {
    let mut value = serde_json::to_value(config)?;
    if let Some(map) = value.as_object_mut() {
        let key_state = if config.api_key().is_some() {
            "<set>"
        } else {
            "<missing>"
        };
        map.insert("api_key".to_string(), serde_json::Value::from(key_state));
    }
    println!("{}", serde_json::to_string_pretty(&value)?);

    config.validate()?;
    Ok(())
}
