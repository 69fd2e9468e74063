//! Stand-in for a syslog-ng control socket.
//!
//! Answers `STATS`, `RELOAD` and `HEALTHCHECK` with canned responses so the
//! exporter can be run without a syslog-ng installation.

use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use syslog_ng_ctl::mock::scenarios;

#[derive(Parser)]
#[command(
    name = "syslog-ng-ctl-mock",
    about = "Mock syslog-ng control socket server",
    version = syslog_ng_ctl::VERSION
)]
struct Args {
    /// Unix socket to listen on.
    #[arg(long, default_value = "/tmp/echo.sock")]
    socket: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
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
    match format!("syslog_ng_ctl_mock={level}").parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("invalid log directive: {e}"),
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Removes a socket file left behind by an earlier run.
fn remove_stale_socket(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale socket");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Reads one request line and writes the matching canned response.
///
/// Returns the request as received, without the line terminator.
fn serve_connection<S: io::Read + Write>(stream: S) -> io::Result<String> {
    let mut reader = BufReader::new(stream);
    let mut request = String::new();
    reader.read_line(&mut request)?;
    let request = request.trim_end().to_string();

    let response = scenarios::response_for(&request);
    let stream = reader.get_mut();
    stream.write_all(response.as_bytes())?;
    stream.flush()?;
    Ok(request)
}

fn handle_client(stream: UnixStream) {
    match serve_connection(stream) {
        Ok(request) => info!(request = request.as_str(), "answered request"),
        Err(e) => warn!(error = %e, "connection failed"),
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = remove_stale_socket(&args.socket) {
        error!(path = %args.socket.display(), error = %e, "failed to remove old socket");
        process::exit(1);
    }

    let listener = match UnixListener::bind(&args.socket) {
        Ok(listener) => listener,
        Err(e) => {
            error!(path = %args.socket.display(), error = %e, "failed to bind socket");
            process::exit(1);
        }
    };

    let socket_path = args.socket.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("received shutdown signal");
        if let Err(e) = fs::remove_file(&socket_path) {
            warn!(path = %socket_path.display(), error = %e, "failed to remove socket");
        }
        process::exit(0);
    }) {
        warn!(error = %e, "failed to set Ctrl-C handler");
    }

    info!(path = %args.socket.display(), "listening");

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                thread::spawn(move || handle_client(stream));
            }
            Err(e) => warn!(error = %e, "accept failed"),
        }
    }
}
