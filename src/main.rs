//! chatrelay HTTP server
//!
//! Starts an Axum web server that forwards chat requests to the configured
//! completion API.

use chatrelay::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    handlers::{self, AppState},
    telemetry,
};
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        match output {
            Some(path) => {
                std::fs::write(&path, generate_config_template())?;
                println!("Wrote configuration template to {}", path);
            }
            None => print!("{}", generate_config_template()),
        }
        return Ok(());
    }

    // A missing file means defaults; a present but broken file is fatal
    let config_present = Path::new(&cli.config).exists();
    let config = if config_present {
        Config::from_file(&cli.config)?
    } else {
        Config::default()
    };

    telemetry::init(&config.observability);

    if !config_present {
        tracing::info!(path = %cli.config, "Config file not found, using defaults");
    }

    tracing::info!(
        "Starting chatrelay on {}:{} (upstream {} via {:?})",
        config.server.host,
        config.server.port,
        config.upstream.base_url,
        config.upstream.api
    );

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    let state = AppState::from_env(Arc::new(config))?;
    let app = handlers::router(state);

    tracing::info!("Listening on {}", addr);
    tracing::info!("Chat endpoint available at http://{}{}", addr, handlers::CHAT_PATH);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
