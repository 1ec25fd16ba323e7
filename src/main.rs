mod charts;
mod clients;
mod config;
mod error;
mod helpers;
mod models;
mod routes;
mod state;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use clients::ApiClient;
use state::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub api: ApiClient,
    pub config: Arc<config::Config>,
    pub sessions: Arc<SessionStore>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("klaw_console=info")),
        )
        .init();

    let config_path = config_path_from_args(std::env::args().skip(1).collect());

    let cfg = config::Config::load(&PathBuf::from(&config_path)).unwrap_or_else(|e| {
        eprintln!("error loading config: {}", e);
        std::process::exit(1);
    });

    let api = ApiClient::new(
        &cfg.api_base_url,
        Duration::from_secs(cfg.request_timeout_secs),
    )
    .unwrap_or_else(|e| {
        eprintln!("error creating api client: {}", e);
        std::process::exit(1);
    });
    info!("using backend at {}", api.base_url());

    let sessions = Arc::new(SessionStore::new(
        cfg.default_theme,
        Duration::from_secs(cfg.session_idle_secs),
    ));
    let cfg = Arc::new(cfg);

    // Shutdown signal
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(());

    // Start session reaper
    let reaper = sessions.clone();
    tokio::spawn(async move {
        reaper.run_reaper(shutdown_rx).await;
    });

    let state = AppState {
        api,
        config: cfg.clone(),
        sessions,
    };

    let router = routes::build_router(state);

    let listen_addr = cfg.listen_addr();
    let listener = TcpListener::bind(&listen_addr).await.unwrap_or_else(|e| {
        eprintln!("failed to bind {}: {}", listen_addr, e);
        std::process::exit(1);
    });

    info!("klaw-console listening on {}", listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(());
        })
        .await
        .unwrap_or_else(|e| {
            eprintln!("server error: {}", e);
            std::process::exit(1);
        });
}

const DEFAULT_CONFIG_PATH: &str = "/etc/klaw-console/config.yaml";

/// `--config <path>` (or `-config`) wins; otherwise the first bare argument.
fn config_path_from_args(args: Vec<String>) -> String {
    if let Some(pos) = args.iter().position(|a| a == "--config" || a == "-config") {
        if let Some(path) = args.get(pos + 1) {
            return path.clone();
        }
    }
    args.into_iter()
        .find(|a| !a.starts_with('-'))
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn config_path_resolution() {
        assert_eq!(config_path_from_args(args(&[])), DEFAULT_CONFIG_PATH);
        assert_eq!(config_path_from_args(args(&["/tmp/c.yaml"])), "/tmp/c.yaml");
        assert_eq!(
            config_path_from_args(args(&["--config", "/srv/console.yaml"])),
            "/srv/console.yaml"
        );
    }
}
