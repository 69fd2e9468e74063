//! Connections to the control socket, bounded by an absolute deadline.

use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// A bidirectional byte stream to the control socket.
pub trait ControlStream: Read + Write + Send {}

impl<T: Read + Write + Send> ControlStream for T {}

/// Opens connections to a syslog-ng control endpoint.
///
/// Every session opens exactly one connection; implementations must be
/// shareable across threads because command sessions run in parallel.
pub trait ControlSocket: Send + Sync {
    /// Connects and returns a stream whose reads and writes fail once
    /// `deadline` has passed.
    fn connect(&self, deadline: Instant) -> io::Result<Box<dyn ControlStream>>;

    /// Endpoint description for log messages.
    fn describe(&self) -> String;
}

/// The real control socket at a filesystem path.
#[derive(Debug, Clone)]
pub struct UnixControlSocket {
    path: PathBuf,
}

impl UnixControlSocket {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ControlSocket for UnixControlSocket {
    fn connect(&self, deadline: Instant) -> io::Result<Box<dyn ControlStream>> {
        remaining(deadline)?;
        let stream = UnixStream::connect(&self.path)?;
        Ok(Box::new(DeadlineStream::new(stream, deadline)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Streams whose blocking reads and writes can be bounded.
pub trait SetTimeouts {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
}

impl SetTimeouts for UnixStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        UnixStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        UnixStream::set_write_timeout(self, timeout)
    }
}

/// Wraps a stream so that every read and write shares one absolute deadline.
///
/// Before each operation the socket timeout is set to the time left until the
/// deadline; once it has passed, operations fail with `TimedOut` without
/// touching the socket.
#[derive(Debug)]
pub struct DeadlineStream<T> {
    inner: T,
    deadline: Instant,
}

impl<T: SetTimeouts> DeadlineStream<T> {
    pub fn new(inner: T, deadline: Instant) -> Self {
        Self { inner, deadline }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + SetTimeouts> Read for DeadlineStream<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let left = remaining(self.deadline)?;
        self.inner.set_read_timeout(Some(left))?;
        self.inner.read(buf).map_err(timed_out)
    }
}

impl<T: Write + SetTimeouts> Write for DeadlineStream<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let left = remaining(self.deadline)?;
        self.inner.set_write_timeout(Some(left))?;
        self.inner.write(buf).map_err(timed_out)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Time left until `deadline`, or `TimedOut` if none is left.
fn remaining(deadline: Instant) -> io::Result<Duration> {
    let now = Instant::now();
    if now >= deadline {
        return Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "control socket deadline exceeded",
        ));
    }
    Ok(deadline - now)
}

// A socket timeout surfaces as WouldBlock on Unix.
fn timed_out(e: io::Error) -> io::Error {
    if e.kind() == io::ErrorKind::WouldBlock {
        io::Error::new(io::ErrorKind::TimedOut, "control socket deadline exceeded")
    } else {
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::{BufRead, BufReader, Cursor};
    use std::os::unix::net::UnixListener;
    use std::thread;

    struct RecordingStream {
        data: Cursor<Vec<u8>>,
        timeouts: RefCell<Vec<Duration>>,
    }

    impl SetTimeouts for RecordingStream {
        fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
            self.timeouts.borrow_mut().extend(timeout);
            Ok(())
        }

        fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
            self.timeouts.borrow_mut().extend(timeout);
            Ok(())
        }
    }

    impl Read for RecordingStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.data.read(buf)
        }
    }

    #[test]
    fn test_deadline_stream_sets_remaining_time() {
        let inner = RecordingStream {
            data: Cursor::new(b"abc".to_vec()),
            timeouts: RefCell::new(Vec::new()),
        };
        let mut stream = DeadlineStream::new(inner, Instant::now() + Duration::from_secs(5));

        let mut buf = [0u8; 8];
        assert_eq!(stream.read(&mut buf).unwrap(), 3);

        let inner = stream.into_inner();
        let timeouts = inner.timeouts.borrow();
        assert_eq!(timeouts.len(), 1);
        assert!(timeouts[0] <= Duration::from_secs(5));
        assert!(timeouts[0] > Duration::ZERO);
    }

    #[test]
    fn test_deadline_stream_expired() {
        let inner = RecordingStream {
            data: Cursor::new(b"abc".to_vec()),
            timeouts: RefCell::new(Vec::new()),
        };
        let mut stream = DeadlineStream::new(inner, Instant::now());

        let mut buf = [0u8; 8];
        let err = stream.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(stream.into_inner().timeouts.borrow().is_empty());
    }

    #[test]
    fn test_unix_socket_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("syslog-ng.ctl");
        let listener = UnixListener::bind(&path).unwrap();

        let server = thread::spawn(move || {
            let (conn, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(conn);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let mut conn = reader.into_inner();
            conn.write_all(b"OK Config reload successful\n.\n").unwrap();
            line
        });

        let socket = UnixControlSocket::new(&path);
        let mut stream = socket
            .connect(Instant::now() + Duration::from_secs(5))
            .unwrap();
        stream.write_all(b"RELOAD\n").unwrap();

        let mut response = String::new();
        BufReader::new(stream).read_line(&mut response).unwrap();
        assert_eq!(response, "OK Config reload successful\n");
        assert_eq!(server.join().unwrap(), "RELOAD\n");
    }

    #[test]
    fn test_unix_socket_read_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("syslog-ng.ctl");
        let listener = UnixListener::bind(&path).unwrap();

        let socket = UnixControlSocket::new(&path);
        let mut stream = socket
            .connect(Instant::now() + Duration::from_millis(50))
            .unwrap();
        // Keep the peer open without ever answering.
        let (_conn, _) = listener.accept().unwrap();

        let mut buf = [0u8; 16];
        let err = stream.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_unix_socket_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let socket = UnixControlSocket::new(dir.path().join("absent.ctl"));
        assert!(
            socket
                .connect(Instant::now() + Duration::from_secs(1))
                .is_err()
        );
    }
}
