//! pg-dumper server - Main entry point
//!
//! Resolves the connection target, opens the pool once, and serves the
//! browser until SIGINT or SIGTERM.

use clap::Parser;
use pg_dumper::{ConnectionResolver, PgDumperLayer};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use config::Config;

/// Initialize the tracing subscriber for logging
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber.with(fmt::layer().with_target(true)).init();
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            error!(error = %error, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                error!(error = %error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let target = config.connection_settings().resolve()?;
    info!(database = %target, schema = %config.schema, "Connecting to database");

    let resolver = ConnectionResolver::new(target).with_pool_settings(config.pool_settings());
    let pool = resolver.connect().await?;

    let browser = PgDumperLayer::postgres(&config.base_path, pool.clone(), &config.schema, config.limits());
    let base_path = browser.base_path().to_string();
    let app = browser.into_router();

    let listener = TcpListener::bind(config.bind).await?;
    info!(
        address = %config.bind,
        browser = %format!("http://{}{}/", config.bind, base_path),
        "pg-dumper v{} listening",
        env!("CARGO_PKG_VERSION")
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    info!("Closing database connections");
    pool.close().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    let config = Config::parse();
    init_tracing(&config);

    if let Err(error) = run(config).await {
        error!(error = %error, "Server failed");
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
