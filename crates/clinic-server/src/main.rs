//! Clinic server binary.
//!
//! Loads configuration, sets up structured logging, opens and bootstraps the
//! shared database, then serves the health endpoint with graceful shutdown on
//! SIGTERM/SIGINT. Any database initialization failure stops the process.

use std::fmt::Display;
use std::net::SocketAddr;

use clinic_db::ConnectionProvider;
use clinic_server::{app, config};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("CLINIC_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

/// Logs the diagnostic and terminates the process.
fn fatal(context: &str, err: impl Display) -> ! {
    tracing::error!(error = %err, "{context}");
    eprintln!("fatal: {context}: {err}");
    std::process::exit(1)
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().unwrap_or("config.toml");

    let config = match config::load_config(Some(selected_config_path)) {
        Ok(config) => config,
        Err(e) => fatal("failed to load configuration", e),
    };

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path,
        "resolved startup configuration path"
    );

    // Initialize database
    let paths = match config.database.paths() {
        Ok(paths) => paths,
        Err(e) => fatal("failed to resolve database location", e),
    };
    tracing::info!(
        database = %paths.database.display(),
        init_script = %paths.init_script.display(),
        "resolved database paths"
    );

    let provider = match clinic_db::install(ConnectionProvider::new(paths)) {
        Ok(provider) => provider,
        Err(e) => fatal("failed to install connection provider", e),
    };

    if let Err(e) = provider.get_connection() {
        fatal("database initialization failed", e);
    }
    if let Some(outcome) = provider.bootstrap_outcome() {
        tracing::info!(?outcome, "database ready");
    }

    // Build application
    let app = app(provider);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting clinic server");

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => fatal("failed to bind to address", e),
    };

    // Serve with graceful shutdown
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        fatal("server error", e);
    }

    tracing::info!("clinic server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
