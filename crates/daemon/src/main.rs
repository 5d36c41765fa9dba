// SPDX-License-Identifier: MIT

//! `swarmd`: the Coordinator daemon binary. The wider CLI surface (`status`,
//! `fleet`, `queue`, `monitor`, `control`, ...) is a client of this server
//! and lives in `sw-cli`'s `swarmctl`; `swarmd` itself only serves.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::middleware as axum_middleware;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use sw_daemon::config::Config;
use sw_daemon::{background, protocol_capture, routes, Coordinator, DaemonError};

#[derive(Parser, Debug)]
#[command(name = "swarmd", version, about = "Coordinator control-plane daemon")]
struct Cli {
    /// Control-plane port; overrides config file and environment.
    #[arg(long)]
    port: Option<u16>,
    /// Path to the swarm database; overrides config file and environment.
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("swarmd: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), DaemonError> {
    let cli = Cli::parse();
    let config = Config::load(cli.port, cli.db)?;
    init_tracing(config.log_file.as_deref());

    tracing::info!(port = config.control_plane_port, admin_port = config.admin_port, db = %config.db_path.display(), "starting swarmd");

    let coordinator = Coordinator::new(config)?;
    background::spawn_all(coordinator.clone());

    let control_plane = build_control_plane_router(coordinator.clone());
    let admin = sw_daemon::admin::router(coordinator.clone()).with_state(coordinator.clone());

    let control_addr: SocketAddr = format!("0.0.0.0:{}", coordinator.config.lock().await.control_plane_port).parse().map_err(|_| DaemonError::Config("invalid control-plane bind address".to_string()))?;
    let admin_addr: SocketAddr = format!("0.0.0.0:{}", coordinator.config.lock().await.admin_port).parse().map_err(|_| DaemonError::Config("invalid admin bind address".to_string()))?;

    let control_listener = tokio::net::TcpListener::bind(control_addr).await.map_err(DaemonError::Io)?;
    let admin_listener = tokio::net::TcpListener::bind(admin_addr).await.map_err(DaemonError::Io)?;

    tracing::info!(%control_addr, %admin_addr, "listening");

    tokio::spawn(watch_for_shutdown_signal(coordinator.clone()));

    let control_server = axum::serve(control_listener, control_plane.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(await_shutdown(coordinator.clone()));
    let admin_server = axum::serve(admin_listener, admin.into_make_service())
        .with_graceful_shutdown(await_shutdown(coordinator.clone()));

    let (control_result, admin_result) = tokio::join!(control_server, admin_server);
    control_result.map_err(DaemonError::Io)?;
    admin_result.map_err(DaemonError::Io)?;

    let _ = coordinator.protocol.flush();
    coordinator.store.checkpoint().map_err(DaemonError::Store)?;
    tracing::info!("swarmd shut down cleanly");
    Ok(())
}

fn build_control_plane_router(state: sw_daemon::AppState) -> axum::Router {
    routes::router()
        .layer(axum_middleware::from_fn_with_state(state.clone(), protocol_capture::capture))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Listens for Ctrl+C/SIGTERM and flips the shared shutdown flag. Runs as
/// its own task since both the control-plane and admin servers need to
/// observe the same flag via [`await_shutdown`].
async fn watch_for_shutdown_signal(state: sw_daemon::AppState) {
    let ctrl_c = async { tokio::signal::ctrl_c().await.ok() };
    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            sig.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received, draining");
    state.request_shutdown();
}

async fn await_shutdown(state: sw_daemon::AppState) {
    while !state.is_shutting_down() {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }
}

fn init_tracing(log_file: Option<&std::path::Path>) {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let registry = tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer());

    match log_file {
        Some(path) => {
            let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("swarmd.log"));
            let appender = tracing_appender::rolling::daily(directory, file_name);
            registry.with(tracing_subscriber::fmt::layer().with_writer(appender).with_ansi(false)).init();
        }
        None => registry.init(),
    }
}
