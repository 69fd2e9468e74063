//! Line reader for control socket responses.

use std::io::{self, BufRead};
use std::iter::FusedIterator;

/// Why a [`LineReader`] stopped yielding lines.
#[derive(Debug)]
pub enum Termination {
    /// A line starting with `.` was read.
    Sentinel,
    /// The peer closed the connection.
    Eof,
    /// A read failed (including deadline expiry).
    Error(io::Error),
}

/// Yields response lines until the `.` sentinel, EOF, or the first read error.
///
/// Lines are returned verbatim, trailing newline included; invalid UTF-8 is
/// decoded lossily. The reader is
/// single-pass: once it has stopped it never yields again, and the cause is
/// kept in [`termination`](Self::termination).
pub struct LineReader<R> {
    inner: R,
    termination: Option<Termination>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            termination: None,
        }
    }

    /// Reads the response header line.
    ///
    /// Unlike iteration, EOF here is an error: a response without a header
    /// means the endpoint did not answer.
    pub fn read_header(&mut self) -> io::Result<String> {
        self.read_raw_line()?.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before response header",
            )
        })
    }

    /// Reads one line, `None` at EOF.
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD, so a stray
    /// Latin-1 path in one line does not end the stream.
    fn read_raw_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = Vec::new();
        if self.inner.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(match String::from_utf8(buf) {
            Ok(line) => line,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }))
    }

    /// Cause of the end of the stream, once iteration has stopped.
    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    pub fn into_termination(self) -> Option<Termination> {
        self.termination
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.termination.is_some() {
            return None;
        }

        let stop = match self.read_raw_line() {
            Ok(None) => Termination::Eof,
            Ok(Some(line)) if line.starts_with('.') => Termination::Sentinel,
            Ok(Some(line)) => return Some(line),
            Err(e) => Termination::Error(e),
        };
        self.termination = Some(stop);
        None
    }
}

impl<R: BufRead> FusedIterator for LineReader<R> {}
