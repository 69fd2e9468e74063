//! Shared application state and the global allocator.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;

use syslog_ng_ctl::control::ControlSocket;

use crate::metrics::Scraper;

pub(crate) struct AppInner {
    pub(crate) socket: Arc<dyn ControlSocket>,
    /// Deadline for one control socket session.
    pub(crate) timeout: Duration,
    pub(crate) metrics_path: String,
    // Held for a whole STATS pass; commands never take it.
    pub(crate) scraper: Mutex<Scraper>,
}

impl AppInner {
    pub(crate) fn new(
        socket: Arc<dyn ControlSocket>,
        timeout: Duration,
        metrics_path: impl Into<String>,
    ) -> Self {
        Self {
            socket,
            timeout,
            metrics_path: metrics_path.into(),
            scraper: Mutex::new(Scraper::new()),
        }
    }
}

pub(crate) type SharedState = Arc<AppInner>;

pub(crate) type AppState = State<SharedState>;
