//! Test doubles for the control socket.
//!
//! `MockControlSocket` replaces the Unix socket in tests and on hosts without
//! syslog-ng; `scenarios` holds the canned responses it serves.

pub mod scenarios;
mod socket;

pub use socket::{MockBehavior, MockControlSocket};
