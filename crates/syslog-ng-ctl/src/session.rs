//! One-shot sessions against the control socket.
//!
//! A session opens one connection, sends one request and drains the response:
//!
//! ```text
//! Connecting ─▶ AwaitingHeader (STATS only) ─▶ StreamingLines ─▶ Terminated
//!      │                 │
//!      └─────────────────┴──▶ Terminated(error)
//! ```
//!
//! Every blocking step shares one absolute deadline. Nothing is retried.

use std::fmt;
use std::io::{self, BufReader};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::command::{Command, CommandResult};
use crate::control::{ControlSocket, ControlStream, LineReader, Request, Termination};
use crate::stats::{MetricEmission, classify, parse_stat_line};

/// Default bound for one session.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Error type for session failures.
#[derive(Debug)]
pub enum SessionError {
    /// The control socket could not be reached.
    Connect(io::Error),
    /// Sending the request failed.
    Write(io::Error),
    /// No response arrived (missing `STATS` header or first command line).
    Header(io::Error),
    /// The response stream broke off after it had started.
    Stream(io::Error),
}

impl SessionError {
    /// Whether part of the response had been read before the failure.
    pub fn is_partial(&self) -> bool {
        matches!(self, SessionError::Stream(_))
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Connect(e) => write!(f, "error connecting to syslog-ng: {}", e),
            SessionError::Write(e) => write!(f, "error writing to control socket: {}", e),
            SessionError::Header(e) => {
                write!(f, "error reading header from control socket: {}", e)
            }
            SessionError::Stream(e) => write!(f, "error reading from control socket: {}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Connect(e)
            | SessionError::Write(e)
            | SessionError::Header(e)
            | SessionError::Stream(e) => Some(e),
        }
    }
}

/// Receives the output of a `STATS` pass.
pub trait MetricSink {
    /// Reports whether the control socket answered.
    fn set_up(&mut self, up: bool);

    fn record(&mut self, emission: &MetricEmission);
}

/// A sink that keeps everything in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedStats {
    pub up: Option<bool>,
    pub emissions: Vec<MetricEmission>,
}

impl MetricSink for CollectedStats {
    fn set_up(&mut self, up: bool) {
        self.up = Some(up);
    }

    fn record(&mut self, emission: &MetricEmission) {
        self.emissions.push(emission.clone());
    }
}

/// Line counts of one `STATS` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub lines: usize,
    pub emitted: usize,
    pub skipped: usize,
}

/// Runs one `STATS` pass, feeding `sink`.
///
/// `up` is reported as soon as the outcome of the header read is known:
/// false for connection, write and header failures, true otherwise. After
/// the header, malformed lines are skipped and unclassified records ignored.
/// If the stream breaks off mid-way, what was recorded stays in the sink and
/// [`SessionError::Stream`] is returned.
pub fn collect_stats<S, K>(
    socket: &S,
    timeout: Duration,
    sink: &mut K,
) -> Result<PassSummary, SessionError>
where
    S: ControlSocket + ?Sized,
    K: MetricSink + ?Sized,
{
    let deadline = Instant::now() + timeout;

    let mut reader = match open(socket, Request::Stats, deadline) {
        Ok(reader) => reader,
        Err(e) => {
            sink.set_up(false);
            return Err(e);
        }
    };

    if let Err(e) = reader.read_header() {
        sink.set_up(false);
        return Err(SessionError::Header(e));
    }
    sink.set_up(true);

    let mut summary = PassSummary::default();
    for line in reader.by_ref() {
        summary.lines += 1;
        let record = match parse_stat_line(&line) {
            Ok(record) => record,
            Err(e) => {
                debug!(error = %e, line = line.trim_end(), "skipping STATS line");
                summary.skipped += 1;
                continue;
            }
        };
        match classify(&record) {
            Some(emission) => {
                sink.record(&emission);
                summary.emitted += 1;
            }
            None => trace!(
                object_type = record.object_type.as_str(),
                metric = record.metric.as_str(),
                id = record.id.as_str(),
                "unclassified STATS record"
            ),
        }
    }

    match reader.into_termination() {
        Some(Termination::Error(e)) => {
            warn!(error = %e, lines = summary.lines, "STATS stream ended early");
            Err(SessionError::Stream(e))
        }
        _ => {
            debug!(
                lines = summary.lines,
                emitted = summary.emitted,
                skipped = summary.skipped,
                "reached end of STATS output"
            );
            Ok(summary)
        }
    }
}

/// Runs one `RELOAD` or `HEALTHCHECK` session.
///
/// Semantic failures (reload not acknowledged, odd healthcheck lines) end up
/// in the result's error list. I/O failures before the first response line
/// are errors; a stream that breaks off later keeps what was parsed.
pub fn run_command<S>(
    socket: &S,
    command: Command,
    timeout: Duration,
) -> Result<CommandResult, SessionError>
where
    S: ControlSocket + ?Sized,
{
    info!(%command, "processing command");
    let deadline = Instant::now() + timeout;
    let mut reader = open(socket, command.request(), deadline)?;

    let mut result = CommandResult::default();
    let mut count = 0;
    for (index, line) in reader.by_ref().enumerate() {
        debug!(%command, index, line = line.trim_end(), "command response line");
        result.apply(command.parse_line(index, &line));
        count = index + 1;
    }

    match reader.into_termination() {
        Some(Termination::Error(e)) if count == 0 => return Err(SessionError::Header(e)),
        Some(Termination::Error(e)) => {
            warn!(%command, error = %e, lines = count, "command response ended early");
        }
        _ => debug!(%command, lines = count, "reached end of command output"),
    }

    let result = result.finish();
    info!(%command, status = ?result.status, "command finished");
    Ok(result)
}

/// Connects and sends `request`.
fn open<S>(
    socket: &S,
    request: Request,
    deadline: Instant,
) -> Result<LineReader<BufReader<Box<dyn ControlStream>>>, SessionError>
where
    S: ControlSocket + ?Sized,
{
    let mut stream = socket.connect(deadline).map_err(SessionError::Connect)?;
    request.send(&mut stream).map_err(SessionError::Write)?;
    debug!(%request, endpoint = %socket.describe(), "sent request");
    Ok(LineReader::new(BufReader::new(stream)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandStatus, RELOAD_FAILED};
    use crate::mock::scenarios::{self, STATS_EMISSIONS};
    use crate::mock::{MockBehavior, MockControlSocket};
    use crate::stats::{MetricFamily, MetricKind};

    #[test]
    fn test_collect_typical_stats() {
        let socket = MockControlSocket::typical();
        let mut sink = CollectedStats::default();

        let summary = collect_stats(&socket, DEFAULT_TIMEOUT, &mut sink).unwrap();

        assert_eq!(socket.requests(), vec!["STATS"]);
        assert_eq!(sink.up, Some(true));
        assert_eq!(sink.emissions.len(), STATS_EMISSIONS);
        assert_eq!(summary.lines, 38);
        assert_eq!(summary.emitted, STATS_EMISSIONS);
        assert_eq!(summary.skipped, 0);

        let dropped = &sink.emissions[0];
        assert_eq!(dropped.family, MetricFamily::DestinationMessagesDropped);
        assert_eq!(
            dropped.label_values(),
            ["dst.file", "d_mesg#0", "/var/log/messages"]
        );

        assert!(
            sink.emissions
                .iter()
                .all(|e| !e.object_type.starts_with("global")
                    && !e.object_type.starts_with("center"))
        );
        let connections: Vec<_> = sink
            .emissions
            .iter()
            .filter(|e| e.family == MetricFamily::SourceConnections)
            .collect();
        assert_eq!(connections.len(), 2);
        assert!(
            sink.emissions
                .iter()
                .filter(|e| e.family == MetricFamily::DestinationMessagesStored)
                .all(|e| e.kind() == MetricKind::Gauge)
        );
    }

    #[test]
    fn test_collect_skips_malformed_lines() {
        let socket = MockControlSocket::new().with_response(
            Request::Stats,
            "SourceName;SourceId;SourceInstance;State;Type;Number\n\
             garbage\n\
             src;x;y;a;processed;1\n\
             dst.file;d;i;a;processed;NaNa\n\
             \n\
             src.file;s;/dev/kmsg;a;processed;25\n\
             .\n",
        );
        let mut sink = CollectedStats::default();

        let summary = collect_stats(&socket, DEFAULT_TIMEOUT, &mut sink).unwrap();

        assert_eq!(summary.skipped, 4);
        assert_eq!(sink.emissions.len(), 1);
        assert_eq!(sink.emissions[0].value, 25.0);
    }

    #[test]
    fn test_collect_without_sentinel() {
        let socket = MockControlSocket::new().with_response(
            Request::Stats,
            "header\nsrc.file;s;i;a;processed;1\n",
        );
        let mut sink = CollectedStats::default();
        collect_stats(&socket, DEFAULT_TIMEOUT, &mut sink).unwrap();
        assert_eq!(sink.emissions.len(), 1);
    }

    #[test]
    fn test_collect_survives_invalid_utf8() {
        let socket = MockControlSocket::new().with_response(
            Request::Stats,
            &b"header\n\
               src.file;s;i;a;processed;1\n\
               dst.file;d;/var/log/caf\xe9;a;processed;2\n\
               dst.file;d;/var/log/b;a;dropped;3\n\
               src.file;s;j;a;processed;4\n\
               .\n"[..],
        );
        let mut sink = CollectedStats::default();

        let summary = collect_stats(&socket, DEFAULT_TIMEOUT, &mut sink).unwrap();

        assert_eq!(sink.up, Some(true));
        assert_eq!(summary.emitted, 4);
        assert_eq!(sink.emissions[1].instance, "/var/log/caf\u{FFFD}");
        assert_eq!(sink.emissions[3].value, 4.0);
    }

    #[test]
    fn test_collect_stream_break_keeps_emissions() {
        const HEAD: &str = "header\nsrc.file;s;i;a;processed;1\ndst.file;d;i;a;dropped;3\n";
        let socket = MockControlSocket::new()
            .with_response(
                Request::Stats,
                format!("{HEAD}src.file;s;j;a;processed;9\n.\n"),
            )
            .with_behavior(MockBehavior::BreakAfter(HEAD.len()));
        let mut sink = CollectedStats::default();

        let err = collect_stats(&socket, DEFAULT_TIMEOUT, &mut sink).unwrap_err();

        assert!(matches!(err, SessionError::Stream(_)));
        assert!(err.is_partial());
        assert_eq!(sink.up, Some(true));
        assert_eq!(sink.emissions.len(), 2);
        assert_eq!(sink.emissions[1].family, MetricFamily::DestinationMessagesDropped);
    }

    #[test]
    fn test_collect_unreachable() {
        let mut sink = CollectedStats::default();
        let err = collect_stats(&MockControlSocket::unreachable(), DEFAULT_TIMEOUT, &mut sink)
            .unwrap_err();
        assert!(matches!(err, SessionError::Connect(_)));
        assert!(!err.is_partial());
        assert_eq!(sink.up, Some(false));
        assert!(sink.emissions.is_empty());
    }

    #[test]
    fn test_collect_write_failure() {
        let socket = MockControlSocket::typical().with_behavior(MockBehavior::BrokenPipe);
        let mut sink = CollectedStats::default();
        let err = collect_stats(&socket, DEFAULT_TIMEOUT, &mut sink).unwrap_err();
        assert!(matches!(err, SessionError::Write(_)));
        assert_eq!(sink.up, Some(false));
    }

    #[test]
    fn test_collect_header_timeout() {
        let socket = MockControlSocket::typical().with_behavior(MockBehavior::Silent);
        let mut sink = CollectedStats::default();
        let err = collect_stats(&socket, DEFAULT_TIMEOUT, &mut sink).unwrap_err();
        assert!(matches!(err, SessionError::Header(_)));
        assert!(err.to_string().starts_with("error reading header"));
        assert_eq!(sink.up, Some(false));
    }

    #[test]
    fn test_collect_empty_response() {
        let mut sink = CollectedStats::default();
        let err = collect_stats(&MockControlSocket::new(), DEFAULT_TIMEOUT, &mut sink).unwrap_err();
        assert!(matches!(err, SessionError::Header(_)));
        assert_eq!(sink.up, Some(false));
    }

    #[test]
    fn test_reload() {
        let socket = MockControlSocket::typical();
        let result = run_command(&socket, Command::Reload, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(socket.requests(), vec!["RELOAD"]);
        assert_eq!(result.status, CommandStatus::Success);
        assert_eq!(result.message.as_deref(), Some("OK Config reload successful"));
        assert!(result.error_messages.is_empty());
    }

    #[test]
    fn test_reload_rejected() {
        let socket = MockControlSocket::new()
            .with_response(Request::Reload, scenarios::RELOAD_FAILED_RESPONSE);
        let result = run_command(&socket, Command::Reload, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(result.status, CommandStatus::Failed);
        assert_eq!(result.error_messages, vec![RELOAD_FAILED]);
        assert!(result.message.unwrap().starts_with("FAIL"));
    }

    #[test]
    fn test_healthcheck() {
        let socket = MockControlSocket::typical();
        let result = run_command(&socket, Command::Healthcheck, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(result.status, CommandStatus::Success);
        assert_eq!(result.message.as_deref(), Some("OK"));
        assert_eq!(result.data.len(), 3);
        assert_eq!(
            result.data["syslogng_io_worker_latency_seconds"],
            "6.0819000000000002e-05"
        );
        assert_eq!(result.data["syslogng_internal_events_queue_usage_ratio"], "0");
    }

    #[test]
    fn test_healthcheck_stream_break_keeps_partial_result() {
        let first_line = scenarios::HEALTHCHECK_RESPONSE.find('\n').unwrap() + 1;
        let socket =
            MockControlSocket::typical().with_behavior(MockBehavior::BreakAfter(first_line));

        let result = run_command(&socket, Command::Healthcheck, DEFAULT_TIMEOUT).unwrap();

        assert!(result.is_success());
        assert_eq!(result.message.as_deref(), Some("OK"));
        assert_eq!(result.data.len(), 1);
        assert!(result.data.contains_key("syslogng_io_worker_latency_seconds"));
    }

    #[test]
    fn test_healthcheck_invalid_utf8_line() {
        let socket = MockControlSocket::new().with_response(
            Request::Healthcheck,
            &b"OK latency 0.1\nqueue\xff 0\nratio 0\n.\n"[..],
        );

        let result = run_command(&socket, Command::Healthcheck, DEFAULT_TIMEOUT).unwrap();

        assert!(result.is_success());
        assert_eq!(result.data.len(), 3);
        assert_eq!(result.data["queue\u{FFFD}"], "0");
        assert_eq!(result.data["ratio"], "0");
    }

    #[test]
    fn test_command_failures() {
        let err = run_command(
            &MockControlSocket::unreachable(),
            Command::Healthcheck,
            DEFAULT_TIMEOUT,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("error connecting to syslog-ng"));

        let silent = MockControlSocket::typical().with_behavior(MockBehavior::Silent);
        let err = run_command(&silent, Command::Reload, DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, SessionError::Header(_)));
    }

    #[test]
    fn test_command_against_unix_socket() {
        use std::io::{BufRead, Write};
        use std::os::unix::net::UnixListener;

        use crate::control::UnixControlSocket;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("syslog-ng.ctl");
        let listener = UnixListener::bind(&path).unwrap();
        let server = std::thread::spawn(move || {
            let (conn, _) = listener.accept().unwrap();
            let mut reader = std::io::BufReader::new(conn);
            let mut request = String::new();
            reader.read_line(&mut request).unwrap();
            reader
                .get_mut()
                .write_all(scenarios::response_for(&request).as_bytes())
                .unwrap();
        });

        let socket = UnixControlSocket::new(&path);
        let result = run_command(&socket, Command::Healthcheck, DEFAULT_TIMEOUT).unwrap();
        server.join().unwrap();
        assert!(result.is_success());
        assert_eq!(result.data.len(), 3);
    }
}
