//! In-memory control socket.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::control::{ControlSocket, ControlStream, Request};

use super::scenarios;

/// How a [`MockControlSocket`] misbehaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MockBehavior {
    /// Answer requests from the response table.
    #[default]
    Respond,
    /// Refuse connections.
    Unreachable,
    /// Accept connections, fail every write.
    BrokenPipe,
    /// Accept requests, never answer (reads time out).
    Silent,
    /// Answer with the first `n` bytes of the response, then time out.
    BreakAfter(usize),
}

/// Control socket that answers from an in-memory response table.
///
/// Each connection reads the first request line written to it and replies with
/// the matching response, or nothing (EOF) when the request is unknown.
/// Requests are recorded and can be inspected with [`requests`](Self::requests).
#[derive(Debug, Clone, Default)]
pub struct MockControlSocket {
    responses: HashMap<String, Vec<u8>>,
    behavior: MockBehavior,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockControlSocket {
    /// Creates a socket with an empty response table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `STATS`, `RELOAD` and `HEALTHCHECK` with the canned scenarios.
    pub fn typical() -> Self {
        Self::new()
            .with_response(Request::Stats, scenarios::STATS_RESPONSE)
            .with_response(Request::Reload, scenarios::RELOAD_RESPONSE)
            .with_response(Request::Healthcheck, scenarios::HEALTHCHECK_RESPONSE)
    }

    /// A socket nobody listens on.
    pub fn unreachable() -> Self {
        Self::new().with_behavior(MockBehavior::Unreachable)
    }

    /// Sets the raw response for `request`; it need not be valid UTF-8.
    pub fn with_response(mut self, request: Request, response: impl Into<Vec<u8>>) -> Self {
        self.responses
            .insert(request.token().to_string(), response.into());
        self
    }

    pub fn with_behavior(mut self, behavior: MockBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Request lines received so far, without newlines.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ControlSocket for MockControlSocket {
    fn connect(&self, _deadline: Instant) -> io::Result<Box<dyn ControlStream>> {
        if self.behavior == MockBehavior::Unreachable {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "mock control socket is unreachable",
            ));
        }
        Ok(Box::new(MockStream {
            responses: self.responses.clone(),
            behavior: self.behavior,
            requests: Arc::clone(&self.requests),
            written: Vec::new(),
            response: None,
        }))
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

struct MockStream {
    responses: HashMap<String, Vec<u8>>,
    behavior: MockBehavior,
    requests: Arc<Mutex<Vec<String>>>,
    written: Vec<u8>,
    response: Option<Cursor<Vec<u8>>>,
}

impl MockStream {
    /// Picks the response on first read, from the first line written.
    fn response(&mut self) -> &mut Cursor<Vec<u8>> {
        if self.response.is_none() {
            let request = String::from_utf8_lossy(&self.written);
            let request = request.lines().next().unwrap_or_default().trim().to_string();
            let body = self.responses.get(&request).cloned().unwrap_or_default();
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request);
            self.response = Some(Cursor::new(body));
        }
        self.response.get_or_insert_with(Cursor::default)
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.behavior == MockBehavior::Silent {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "control socket deadline exceeded",
            ));
        }
        let limit = match self.behavior {
            MockBehavior::BreakAfter(n) => n,
            _ => usize::MAX,
        };
        let response = self.response();
        let left = limit.saturating_sub(response.position() as usize);
        if left == 0 {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "control socket deadline exceeded",
            ));
        }
        let n = buf.len().min(left);
        response.read(&mut buf[..n])
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.behavior == MockBehavior::BrokenPipe {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
