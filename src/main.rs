//! Media Bridge - entry point
//!
//! Bridges a control surface host to a remote media playback app.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_bridge::api::{self, ApiState};
use media_bridge::config::{AppConfig, ConfigWatcher};
use media_bridge::drivers::media::{CommandDispatcher, TransportCommand};
use media_bridge::drivers::{Driver, ExecutionContext, MediaDriver};
use media_bridge::status::ActivityTracker;
use media_bridge::surface::{ConditionKind, ACTIONS, CONDITIONS, VARIABLES};

/// Media Bridge - control a remote media app from a control surface
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Media app host (overrides the config file)
    #[arg(long, env = "MEDIA_BRIDGE_HOST")]
    host: Option<String>,

    /// Media app port (overrides the config file)
    #[arg(long, env = "MEDIA_BRIDGE_PORT")]
    port: Option<u16>,

    /// Send one transport command (play, pause, toggle, next, previous) and exit
    #[arg(long, value_name = "ACTION")]
    send: Option<String>,

    /// Print the action, condition and variable definitions and exit
    #[arg(long)]
    list_definitions: bool,
}

impl Args {
    fn apply_overrides(&self, config: &mut AppConfig) -> Result<()> {
        if let Some(host) = &self.host {
            config.media.host = host.clone();
        }
        if let Some(port) = self.port {
            config.media.port = port;
        }
        config.validate()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.log_json)?;

    if args.list_definitions {
        print_definitions();
        return Ok(());
    }

    info!("Starting Media Bridge...");
    info!("Configuration file: {}", args.config);

    // Hot reload only applies to a config file that exists at startup
    let (config_watcher, mut config) = if Path::new(&args.config).exists() {
        let (watcher, config) = ConfigWatcher::new(args.config.clone()).await?;
        info!("Configuration loaded successfully with hot-reload enabled");
        (Some(watcher), config)
    } else {
        warn!("Config file not found, using defaults: {}", args.config);
        (None, AppConfig::default())
    };
    args.apply_overrides(&mut config)
        .context("Invalid configuration")?;

    if let Some(action) = &args.send {
        return send_once(&config, action).await;
    }

    run_app(&args, config, config_watcher, shutdown_signal()).await?;

    info!("Media Bridge shutdown complete");
    Ok(())
}

async fn run_app(
    args: &Args,
    config: AppConfig,
    mut config_watcher: Option<ConfigWatcher>,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let tracker = Arc::new(ActivityTracker::default());
    let ctx = ExecutionContext::new(config.clone()).with_activity_tracker(tracker);

    let driver = Arc::new(MediaDriver::from_config(&config));
    let api_state = ApiState::new(driver.clone(), driver.store(), ctx.clone());

    driver.subscribe_connection_status(Arc::new(|status| {
        info!("Media app connection: {}", status);
    }));

    let api_task = if config.api.enabled {
        let bind = config.api.bind.clone();
        let port = config.api.port;
        Some(tokio::spawn(async move {
            if let Err(e) = api::start_server(api_state, &bind, port).await {
                error!("API server failed: {:#}", e);
            }
        }))
    } else {
        info!("API server disabled");
        None
    };

    driver.init(ctx.clone()).await?;
    info!("Ready to bridge media events!");

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            // Handle config reload
            Some(mut new_config) = next_config(&mut config_watcher) => {
                info!("📝 Configuration file changed, reloading...");

                if let Err(e) = args.apply_overrides(&mut new_config) {
                    warn!("⚠️  Failed to reload config (keeping old config): {:#}", e);
                    continue;
                }

                let endpoint_changed = {
                    let mut current = ctx.config.write().await;
                    let changed = current.media != new_config.media;
                    if current.api != new_config.api {
                        warn!("API settings changed; restart to apply them");
                    }
                    *current = new_config;
                    changed
                };

                if endpoint_changed {
                    match driver.sync().await {
                        Ok(()) => info!("✅ Media endpoint reloaded"),
                        Err(e) => warn!("⚠️  Failed to apply new media endpoint: {:#}", e),
                    }
                } else {
                    info!("✅ Configuration reloaded (media endpoint unchanged)");
                }
            }

            // Handle shutdown signal
            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }

    // Cleanup
    info!("Shutting down...");
    driver.shutdown().await?;
    if let Some(task) = api_task {
        task.abort();
    }

    Ok(())
}

/// Wait for the next config reload; never resolves without a watcher
async fn next_config(watcher: &mut Option<ConfigWatcher>) -> Option<AppConfig> {
    match watcher {
        Some(watcher) => watcher.next_config().await,
        None => std::future::pending().await,
    }
}

async fn send_once(config: &AppConfig, action: &str) -> Result<()> {
    let command: TransportCommand = action.parse()?;
    let response = CommandDispatcher::default()
        .send(&config.media, command)
        .await
        .with_context(|| format!("{} action failed", command.label()))?;

    println!("{}", serde_json::to_string_pretty(&response.body)?);
    Ok(())
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .init();
    }

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}

fn print_definitions() {
    use colored::*;

    println!("\n{}", "=== Actions ===".bold().cyan());
    for action in ACTIONS {
        println!("  {:<10} {}", action.id.yellow(), action.name);
    }

    println!("\n{}", "=== Conditions ===".bold().cyan());
    for condition in CONDITIONS {
        match condition.kind {
            ConditionKind::Boolean { default_style, .. } => println!(
                "  {:<16} {} {}",
                condition.id.yellow(),
                condition.name,
                format!(
                    "(bg #{:06x}, fg #{:06x})",
                    default_style.bgcolor, default_style.color
                )
                .dimmed()
            ),
            ConditionKind::Advanced => println!(
                "  {:<16} {} {}",
                condition.id.yellow(),
                condition.name,
                "(image)".dimmed()
            ),
        }
    }

    println!("\n{}", "=== Variables ===".bold().cyan());
    for variable in VARIABLES {
        println!("  {:<10} {}", variable.id.green(), variable.name);
    }
    println!();
}
