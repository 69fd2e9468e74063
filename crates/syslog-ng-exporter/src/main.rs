mod access_log;
mod handlers;
mod metrics;
mod openapi;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use clap::Parser;
use tower_http::compression::CompressionLayer;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use syslog_ng_ctl::control::{DEFAULT_SOCKET_PATH, UnixControlSocket};

use access_log::AccessLogLayer;
use state::{AppInner, SharedState};

const OPENAPI_PATH: &str = "/api-docs/openapi.json";
const RESERVED_PATHS: [&str; 4] = ["/", "/reload", "/healthcheck", OPENAPI_PATH];

// ============================================================
// CLI
// ============================================================

#[derive(Parser)]
#[command(
    name = "syslog_ng_exporter",
    about = "Prometheus exporter and control API for syslog-ng",
    version = syslog_ng_ctl::VERSION
)]
struct Args {
    /// Address to listen on for web interface and telemetry.
    #[arg(
        long = "telemetry.address",
        default_value = ":9577",
        env = "SYSLOG_NG_EXPORTER_LISTEN",
        value_parser = parse_listen_addr
    )]
    listen: SocketAddr,

    /// Path under which to expose metrics.
    #[arg(
        long = "telemetry.endpoint",
        default_value = "/metrics",
        value_parser = validate_metrics_path
    )]
    metrics_path: String,

    /// Path to the syslog-ng control socket.
    #[arg(
        long = "socket.path",
        default_value = DEFAULT_SOCKET_PATH,
        env = "SYSLOG_NG_EXPORTER_SOCKET"
    )]
    socket_path: PathBuf,

    /// Deadline in seconds for one control socket session.
    #[arg(long = "socket.timeout", default_value = "1", value_parser = parse_timeout)]
    socket_timeout: Duration,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Accepts `host:port`, or `:port` for all interfaces.
fn parse_listen_addr(s: &str) -> Result<SocketAddr, String> {
    let full = match s.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => s.to_string(),
    };
    full.parse()
        .map_err(|e| format!("invalid listen address {s:?}: {e}"))
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .parse()
        .map_err(|e| format!("invalid timeout {s:?}: {e}"))?;
    if secs <= 0.0 {
        return Err(format!("timeout must be positive, got {s}"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid timeout {s:?}: {e}"))
}

fn validate_metrics_path(s: &str) -> Result<String, String> {
    if !s.starts_with('/') {
        return Err(format!("metrics path must start with '/', got {s:?}"));
    }
    if RESERVED_PATHS.contains(&s) {
        return Err(format!("metrics path {s:?} is already in use"));
    }
    Ok(s.to_string())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["syslog_ng_exporter", "syslog_ng_ctl"] {
        match format!("{target}={level}").parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("invalid log directive for {target}: {e}"),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// ============================================================
// Router
// ============================================================

pub(crate) fn build_router(state: SharedState) -> Router {
    let metrics_path = state.metrics_path.clone();

    Router::new()
        .route(&metrics_path, get(handlers::handle_metrics))
        .route(
            "/reload",
            get(handlers::handle_reload).post(handlers::handle_reload),
        )
        .route(
            "/healthcheck",
            get(handlers::handle_healthcheck).post(handlers::handle_healthcheck),
        )
        .route(OPENAPI_PATH, get(handlers::handle_openapi))
        .route("/", get(handlers::handle_index))
        .with_state(state)
        .layer(AccessLogLayer::new(&metrics_path))
        .layer(CompressionLayer::new())
}

// ============================================================
// Main
// ============================================================

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(async_main(args)) {
        error!(error = %e, "exporter stopped");
        process::exit(1);
    }
}

async fn async_main(args: Args) -> std::io::Result<()> {
    info!(version = syslog_ng_ctl::VERSION, "starting syslog_ng_exporter");
    let socket = UnixControlSocket::new(&args.socket_path);
    info!(
        socket = %socket.path().display(),
        timeout_ms = args.socket_timeout.as_millis() as u64,
        metrics_path = args.metrics_path.as_str(),
        "config"
    );

    let state: SharedState = Arc::new(AppInner::new(
        Arc::new(socket),
        args.socket_timeout,
        args.metrics_path,
    ));

    let app = build_router(state).into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!(addr = %args.listen, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
