//! Entry point for the in-house matchmaking bot
//!
//! Reads commands line by line from stdin, one per chat message, and prints
//! the replies. The health and metrics endpoints run alongside.

use anyhow::Result;
use clap::Parser;
use inhouse::config::{validate_config, AppConfig};
use inhouse::service::{execute, AppState, Command, Reply};
use inhouse::types::MatchmakingMode;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

/// In-house matchmaking: queue, balanced 5v5 teams, Elo ratings and rank tiers
#[derive(Parser)]
#[command(
    name = "inhouse",
    version,
    about = "Matchmaking queue, Elo ratings and rank tiers for 5v5 in-house games",
    long_about = "Keeps a queue of participants with role preferences, splits every ten \
                 of them into two balanced (or random) teams that can cover all five \
                 positions, and updates persistent Elo ratings and rank tiers when a \
                 result is reported. Commands are read from stdin; type 'help'."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Database URL override
    #[arg(long, value_name = "URL", help = "Override the SQLite database URL")]
    database_url: Option<String>,

    /// Matchmaking mode override
    #[arg(long, value_name = "MODE", help = "Starting matchmaking mode (balanced, random)")]
    mode: Option<MatchmakingMode>,

    /// Role-aware composition override
    #[arg(long, value_name = "BOOL", help = "Whether role preferences constrain teams")]
    role_aware: Option<bool>,

    /// Health port override
    #[arg(long, value_name = "PORT", help = "Override health/metrics server port")]
    health_port: Option<u16>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🚀 In-house matchmaking");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Database: {}", config.storage.database_url);
    info!(
        "   Health port: {} (enabled: {})",
        config.service.health_port, config.service.health_enabled
    );
    info!("   Mode: {}", config.queue.mode);
    info!(
        "   Role aware: {} (window {})",
        config.queue.role_aware, config.queue.max_candidate_window
    );
    info!(
        "   Elo: initial {}, K {}",
        config.rating.initial_rating, config.rating.k_factor
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from file or environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(database_url) = &args.database_url {
        config.storage.database_url = database_url.clone();
    }

    if let Some(mode) = args.mode {
        config.queue.mode = mode;
    }

    if let Some(role_aware) = args.role_aware {
        config.queue.role_aware = role_aware;
    }

    if let Some(health_port) = args.health_port {
        config.service.health_port = health_port;
    }

    validate_config(&config)?;
    Ok(config)
}

/// Read commands until stdin closes, `quit` is entered or a signal arrives
async fn run_console(app_state: &AppState) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let session = app_state.session();

    let shutdown = wait_for_shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            info!("Input closed");
            break;
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let mut session = session.lock().await;
        match execute(&mut session, command).await {
            Ok(Reply::Text(text)) => println!("{}", text),
            Ok(Reply::Quit) => break,
            Err(e) => {
                warn!("Command failed: {:#}", e);
                println!("{}", e);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    let mut app_state = match AppState::new(config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    info!("✅ Ready for commands (type 'help')");
    if let Err(e) = run_console(&app_state).await {
        error!("Console stopped: {:#}", e);
    }

    info!("🛑 Shutting down...");
    if let Err(e) = app_state.shutdown().await {
        warn!("Shutdown did not complete cleanly: {}", e);
    }

    info!("🛑 In-house service stopped");
    Ok(())
}
