//! Prometheus exposition of `STATS` passes.
//!
//! Every scrape builds a fresh registry, runs one `STATS` pass into it and
//! encodes it in OpenMetrics text format. Only the scrape failure counter
//! outlives a pass.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::AtomicU64;
use std::time::Duration;

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use tracing::{debug, error, warn};

use syslog_ng_ctl::control::ControlSocket;
use syslog_ng_ctl::session::{MetricSink, collect_stats};
use syslog_ng_ctl::stats::{MetricEmission, MetricFamily, MetricKind};

pub(crate) const NAMESPACE: &str = "syslog_ng";

type Labels = Vec<(&'static str, String)>;
type StatCounter = Family<Labels, Counter<f64, AtomicU64>>;
type StatGauge = Family<Labels, Gauge<f64, AtomicU64>>;

/// Registry populated by a single `STATS` pass.
pub(crate) struct ScrapeMetrics {
    registry: Registry,
    counters: HashMap<MetricFamily, StatCounter>,
    gauges: HashMap<MetricFamily, StatGauge>,
    up: Gauge,
}

impl ScrapeMetrics {
    pub(crate) fn new(scrape_failures: &Counter) -> Self {
        let mut registry = Registry::with_prefix(NAMESPACE);
        let mut counters = HashMap::new();
        let mut gauges = HashMap::new();

        for family in MetricFamily::ALL {
            match family.kind() {
                MetricKind::Counter => {
                    let metric = StatCounter::default();
                    // The encoder appends `_total` to counter names itself.
                    let name = family
                        .name()
                        .strip_suffix("_total")
                        .unwrap_or(family.name());
                    registry.register(name, family.help(), metric.clone());
                    counters.insert(family, metric);
                }
                MetricKind::Gauge => {
                    let metric = StatGauge::default();
                    registry.register(family.name(), family.help(), metric.clone());
                    gauges.insert(family, metric);
                }
            }
        }

        let up = Gauge::default();
        registry.register(
            "up",
            "Reads 1 if the syslog-ng server could be reached, else 0.",
            up.clone(),
        );
        registry.register(
            "exporter_scrape_failures",
            "Number of errors while scraping syslog-ng.",
            scrape_failures.clone(),
        );

        let build_info = Family::<Labels, Gauge>::default();
        build_info
            .get_or_create(&vec![("version", syslog_ng_ctl::VERSION.to_string())])
            .set(1);
        registry.register(
            "exporter_build_info",
            "A metric with a constant '1' value labeled by the exporter version.",
            build_info,
        );

        Self {
            registry,
            counters,
            gauges,
            up,
        }
    }

    pub(crate) fn encode(&self) -> Result<String, fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl MetricSink for ScrapeMetrics {
    fn set_up(&mut self, up: bool) {
        self.up.set(i64::from(up));
    }

    fn record(&mut self, emission: &MetricEmission) {
        let labels = emission.labels();
        match emission.kind() {
            MetricKind::Counter => {
                if let Some(family) = self.counters.get(&emission.family) {
                    family.get_or_create(&labels).inc_by(emission.value);
                }
            }
            MetricKind::Gauge => {
                if let Some(family) = self.gauges.get(&emission.family) {
                    family.get_or_create(&labels).set(emission.value);
                }
            }
        }
    }
}

/// Runs scrapes. Callers hold it behind the scrape lock, so passes never
/// overlap.
pub(crate) struct Scraper {
    scrape_failures: Counter,
}

impl Scraper {
    pub(crate) fn new() -> Self {
        Self {
            scrape_failures: Counter::default(),
        }
    }

    /// Runs one `STATS` pass and returns the encoded exposition.
    ///
    /// Socket failures do not fail the scrape: they show up as `up 0` and in
    /// the failure counter. A stream that breaks off after the header keeps
    /// `up 1` and the series read so far, but still counts as a failure: the
    /// counter covers more than connect, write and header errors.
    pub(crate) fn scrape(
        &mut self,
        socket: &dyn ControlSocket,
        timeout: Duration,
    ) -> Result<String, fmt::Error> {
        let mut metrics = ScrapeMetrics::new(&self.scrape_failures);
        match collect_stats(socket, timeout, &mut metrics) {
            Ok(summary) => debug!(
                emitted = summary.emitted,
                skipped = summary.skipped,
                "scrape finished"
            ),
            Err(e) => {
                if e.is_partial() {
                    warn!(error = %e, "incomplete scrape of syslog-ng");
                } else {
                    error!(error = %e, "error scraping syslog-ng");
                }
                self.scrape_failures.inc();
            }
        }
        metrics.encode()
    }
}
