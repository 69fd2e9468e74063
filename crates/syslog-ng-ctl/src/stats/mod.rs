//! `STATS` response handling: line parsing and metric classification.

mod classify;
mod parser;

pub use classify::{MetricEmission, MetricFamily, MetricKind, ObjectKind, classify};
pub use parser::{OBJECT_TYPE_PREFIX_LEN, StatParseError, StatRecord, parse_stat_line};
