//! Control socket plumbing.
//!
//! syslog-ng exposes a Unix domain socket (`syslog-ng.ctl`) that accepts one
//! command per connection and answers with a line-oriented response terminated
//! by a line starting with `.`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Session                           │
//! │  ┌────────────────────┐      ┌────────────────────────┐  │
//! │  │  collect_stats()   │      │    run_command()       │  │
//! │  └─────────┬──────────┘      └───────────┬────────────┘  │
//! │            └──────────────┬──────────────┘               │
//! │                    ┌──────▼──────┐                       │
//! │                    │ LineReader  │                       │
//! │                    └──────┬──────┘                       │
//! │                  ┌────────▼────────┐                     │
//! │                  │ ControlSocket   │ (trait)             │
//! │                  └────────┬────────┘                     │
//! └───────────────────────────┼──────────────────────────────┘
//!                ┌────────────┴────────────┐
//!         ┌──────▼────────────┐   ┌────────▼──────────┐
//!         │ UnixControlSocket │   │ MockControlSocket │
//!         │ (DeadlineStream)  │   │ (Testing)         │
//!         └───────────────────┘   └───────────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use std::io::BufReader;
//! use std::time::{Duration, Instant};
//!
//! use syslog_ng_ctl::control::{ControlSocket, LineReader, Request};
//! use syslog_ng_ctl::mock::MockControlSocket;
//!
//! let socket = MockControlSocket::typical();
//! let mut stream = socket.connect(Instant::now() + Duration::from_secs(1)).unwrap();
//! Request::Healthcheck.send(&mut stream).unwrap();
//!
//! let lines: Vec<String> = LineReader::new(BufReader::new(stream)).collect();
//! assert!(lines[0].starts_with("OK "));
//! ```

mod reader;
mod socket;

use std::fmt;
use std::io::{self, Write};

pub use reader::{LineReader, Termination};
pub use socket::{ControlSocket, ControlStream, DeadlineStream, SetTimeouts, UnixControlSocket};

/// Default path of the syslog-ng control socket.
pub const DEFAULT_SOCKET_PATH: &str = "/var/lib/syslog-ng/syslog-ng.ctl";

/// A request understood by the control socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Request {
    Stats,
    Reload,
    Healthcheck,
}

impl Request {
    /// Wire token, without the trailing newline.
    pub fn token(self) -> &'static str {
        match self {
            Request::Stats => "STATS",
            Request::Reload => "RELOAD",
            Request::Healthcheck => "HEALTHCHECK",
        }
    }

    /// Writes `<TOKEN>\n` and flushes.
    pub fn send<W: Write + ?Sized>(self, out: &mut W) -> io::Result<()> {
        out.write_all(self.token().as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
