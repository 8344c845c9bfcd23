//! Parking service CLI server
//!
//! Headless parking lot search and reservation API, suitable for
//! deployment as a systemd service, Docker container, or standalone process.
//!
//! ```sh
//! # Run with default config (~/.config/parking-service/config.toml)
//! parking-service
//!
//! # Custom config path
//! parking-service --config /etc/parking-service/config.toml
//!
//! # Override port and log level
//! parking-service --api-port 9090 --log-level debug
//!
//! # Validate config without starting
//! parking-service --check
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use parking_service::config::{default_config_path, AppConfig, CONFIG_PATH_ENV};
use parking_service::server::{init_tracing, ServerHandle, ServerOptions};

/// Parking lot discovery and reservation server.
#[derive(Parser, Debug)]
#[command(
    name = "parking-service",
    version,
    about = "Find parking lots near a location and reserve spots",
    long_about = "REST API server for proximity search over parking lots and \
                  concurrency-safe spot reservations.\n\n\
                  Default config: ~/.config/parking-service/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let loaded = AppConfig::load(&config_path);

    if cli.check {
        return check(&cli, &config_path, loaded);
    }

    let (mut config, load_error) = match loaded {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    apply_overrides(&cli, &mut config);

    init_tracing(&config);
    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }

    // ── Start server ───────────────────────────────────────────
    let handle = match ServerHandle::start(ServerOptions { config }).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start parking service: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Install OS signal handlers (SIGTERM, SIGINT)
    handle.install_signal_handler();

    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    ExitCode::SUCCESS
}

fn apply_overrides(cli: &Cli, config: &mut AppConfig) {
    if let Some(port) = cli.api_port {
        config.server.api_port = port;
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
}

/// `--check`: report the effective configuration, or why it is invalid.
fn check(
    cli: &Cli,
    config_path: &std::path::Path,
    loaded: Result<AppConfig, parking_service::config::ConfigError>,
) -> ExitCode {
    let mut config = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };
    apply_overrides(cli, &mut config);

    if let Err(e) = config.validate() {
        eprintln!("❌ {}", e);
        return ExitCode::FAILURE;
    }

    let hold = config
        .reservations
        .hold_ttl_secs
        .map(|secs| format!("{}s", secs))
        .unwrap_or_else(|| "until released".to_string());

    println!("✅ Configuration is valid");
    println!("   Config file  : {}", config_path.display());
    println!("   API address  : {}", config.api_address());
    println!("   Log level    : {} ({})", config.logging.level, config.logging.format);
    println!("   Lock timeout : {}ms", config.reservations.lock_timeout_ms);
    println!("   Hold time    : {}", hold);
    println!("   Geo cell     : {}°", config.geo.cell_size_degrees);
    ExitCode::SUCCESS
}
