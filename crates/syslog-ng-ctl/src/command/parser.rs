//! Per-line parsers for `RELOAD` and `HEALTHCHECK` responses.
//!
//! ```text
//! RELOAD:       OK Config reload successful
//! HEALTHCHECK:  OK syslogng_io_worker_latency_seconds 6.0819000000000002e-05
//!               syslogng_mainloop_io_worker_roundtrip_latency_seconds 0.000114926
//!               syslogng_internal_events_queue_usage_ratio 0
//! ```

/// Substring syslog-ng prints when a reload succeeded.
pub const RELOAD_ACK: &str = "OK Config reload successful";

/// Recorded in the error list when a reload line lacks [`RELOAD_ACK`].
pub const RELOAD_FAILED: &str = "failed to reload";

/// What one response line contributes to a [`CommandResult`](super::CommandResult).
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseLine {
    /// Reload outcome line; `acknowledged` is false when the ack text is missing.
    Reload { message: String, acknowledged: bool },
    /// Healthcheck status line `OK <key> <value>`.
    Status { key: String, value: String },
    /// Healthcheck data line `<key> <value>`.
    Entry { key: String, value: String },
    /// Unexpected line shape, with a diagnostic.
    Invalid(String),
}

/// Parses one `RELOAD` response line.
pub fn parse_reload_line(line: &str) -> ResponseLine {
    ResponseLine::Reload {
        message: line.trim_end_matches(['\r', '\n']).to_string(),
        acknowledged: line.contains(RELOAD_ACK),
    }
}

/// Parses the `index`-th (0-based) `HEALTHCHECK` response line.
///
/// Only the first line may carry the `OK` status prefix; any line may be a
/// two-token key/value pair.
pub fn parse_healthcheck_line(index: usize, line: &str) -> ResponseLine {
    match (index, split_fields(line, 3).as_slice()) {
        (0, ["OK", key, value]) => ResponseLine::Status {
            key: key.to_string(),
            value: value.to_string(),
        },
        (_, [key, value]) => ResponseLine::Entry {
            key: key.to_string(),
            value: value.to_string(),
        },
        _ => ResponseLine::Invalid(format!(
            "error: invalid/unexpected results, line: {}: {}",
            index,
            line.trim_end()
        )),
    }
}

/// Splits on whitespace into at most `max` fields; the last field keeps the
/// remainder of the line.
fn split_fields(line: &str, max: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(max);
    let mut rest = line.trim();
    while !rest.is_empty() {
        if fields.len() + 1 == max {
            fields.push(rest);
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(pos) => {
                fields.push(&rest[..pos]);
                rest = rest[pos..].trim_start();
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fields() {
        assert_eq!(split_fields("a b c d", 3), vec!["a", "b", "c d"]);
        assert_eq!(split_fields("  a\tb \n", 3), vec!["a", "b"]);
        assert_eq!(split_fields("a   b", 3), vec!["a", "b"]);
        assert!(split_fields(" \n", 3).is_empty());
    }

    #[test]
    fn test_reload_ack() {
        assert_eq!(
            parse_reload_line("OK Config reload successful\n"),
            ResponseLine::Reload {
                message: "OK Config reload successful".into(),
                acknowledged: true,
            }
        );
    }

    #[test]
    fn test_reload_failure() {
        let line = "FAIL Error while reloading configuration\n";
        assert_eq!(
            parse_reload_line(line),
            ResponseLine::Reload {
                message: "FAIL Error while reloading configuration".into(),
                acknowledged: false,
            }
        );
    }

    #[test]
    fn test_healthcheck_status_line() {
        let parsed =
            parse_healthcheck_line(0, "OK syslogng_io_worker_latency_seconds 6.08e-05\n");
        assert_eq!(
            parsed,
            ResponseLine::Status {
                key: "syslogng_io_worker_latency_seconds".into(),
                value: "6.08e-05".into(),
            }
        );
    }

    #[test]
    fn test_healthcheck_entry_line() {
        let parsed = parse_healthcheck_line(
            1,
            "syslogng_mainloop_io_worker_roundtrip_latency_seconds 0.000114926\n",
        );
        assert_eq!(
            parsed,
            ResponseLine::Entry {
                key: "syslogng_mainloop_io_worker_roundtrip_latency_seconds".into(),
                value: "0.000114926".into(),
            }
        );
    }

    #[test]
    fn test_healthcheck_first_line_may_be_entry() {
        assert!(matches!(
            parse_healthcheck_line(0, "syslogng_internal_events_queue_usage_ratio 0"),
            ResponseLine::Entry { .. }
        ));
    }

    #[test]
    fn test_healthcheck_non_ok_status() {
        assert_eq!(
            parse_healthcheck_line(0, "FAIL something broke\n"),
            ResponseLine::Invalid(
                "error: invalid/unexpected results, line: 0: FAIL something broke".into()
            )
        );
    }

    #[test]
    fn test_healthcheck_status_after_first_line() {
        assert_eq!(
            parse_healthcheck_line(2, "OK key value"),
            ResponseLine::Invalid("error: invalid/unexpected results, line: 2: OK key value".into())
        );
    }

    #[test]
    fn test_healthcheck_odd_shapes() {
        for line in ["lonely\n", "\n", ""] {
            assert!(matches!(
                parse_healthcheck_line(1, line),
                ResponseLine::Invalid(_)
            ));
        }
    }
}
