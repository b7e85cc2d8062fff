#![cfg_attr(not(test), deny(clippy::panic))]

use cadence_server::config;
use cadence_server::logging;
use cadence_server::server::GameServer;
use cadence_server::websocket;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;

/// Cadence -- real-time multiplayer backend for a competitive rhythm game
#[derive(Parser, Debug)]
#[command(name = "cadence-server")]
#[command(about = "Real-time multiplayer backend for a competitive rhythm game")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = Arc::new(config::load());

    if cli.print_config {
        let json = serde_json::to_string_pretty(&*cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    // load() only reports validation problems; startup must fail on them.
    let validation_result = config::validate_config(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Ping interval: {}s", cfg.server.ping_interval_secs);
                println!("  Ping timeout: {}s", cfg.server.ping_timeout_secs);
                println!("  Countdown: {}ms", cfg.multiplayer.countdown_ms);
                println!(
                    "  Max concurrent games: {}",
                    cfg.multiplayer.max_concurrent_games
                );
                println!("  Guests allowed: {}", cfg.auth.allow_guests);
                println!("  Static users: {}", cfg.auth.users.len());
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    let _log_guard = logging::init_with_config(&cfg.logging);

    let game_server = GameServer::new(cfg.clone()).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        cors_origins = %cfg.server.cors_origins,
        "Server started - protocol: /ws, metrics: /metrics"
    );

    websocket::serve(listener, game_server).await
}
