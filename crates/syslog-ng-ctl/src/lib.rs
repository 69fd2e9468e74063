//! syslog-ng-ctl: client for the syslog-ng control socket.
//!
//! Provides:
//! - `control`: socket abstraction, deadline-bounded streams, line reader
//! - `stats`: `STATS` line parser and metric classifier
//! - `command`: `RELOAD` / `HEALTHCHECK` response parsing and results
//! - `session`: one-shot collection and command sessions
//! - `mock`: in-memory control socket and canned responses for tests
//!
//! With `api` feature:
//! - `utoipa::ToSchema` derives on the JSON command result types

pub mod command;
pub mod control;
pub mod mock;
pub mod session;
pub mod stats;

/// Crate version with the git revision it was built from.
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_DESCRIBE"), ")");
