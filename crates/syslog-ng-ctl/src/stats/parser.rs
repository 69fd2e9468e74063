//! `STATS` line parser.
//!
//! Every data line of a `STATS` response has six `;`-separated fields:
//!
//! ```text
//! SourceName;SourceId;SourceInstance;State;Type;Number
//! dst.file;d_mesg#0;/var/log/messages;a;dropped;0
//! ```

use std::fmt;

/// Number of fields in a `STATS` line.
const FIELD_COUNT: usize = 6;

/// The object type must be at least this long; classification looks at a
/// fixed-length prefix.
pub const OBJECT_TYPE_PREFIX_LEN: usize = 4;

/// One parsed `STATS` line.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRecord {
    /// Category, e.g. `src.file`, `destination`, `global`, `center`.
    pub object_type: String,
    /// Configuration id (`s_sys#0`), may be empty.
    pub id: String,
    /// Instance discriminator (file path, socket, hostname), may be empty.
    pub instance: String,
    /// Single-letter state code, not interpreted.
    pub state: String,
    /// Measurement name: `processed`, `dropped`, `stored`, `stamp`, ...
    pub metric: String,
    pub value: f64,
}

/// Reasons a `STATS` line is rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum StatParseError {
    /// Fewer than six fields.
    InsufficientFields(usize),
    /// Object type shorter than the classification prefix.
    InvalidObjectType(String),
    /// The last field is not a number.
    InvalidValue(String),
}

impl fmt::Display for StatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatParseError::InsufficientFields(n) => {
                write!(f, "insufficient parts: {} < {}", n, FIELD_COUNT)
            }
            StatParseError::InvalidObjectType(name) => write!(f, "invalid name: {:?}", name),
            StatParseError::InvalidValue(value) => write!(f, "invalid value: {:?}", value),
        }
    }
}

impl std::error::Error for StatParseError {}

/// Parses one `STATS` data line.
///
/// Surrounding whitespace (including the newline) is ignored. The line is
/// split into at most six fields, so a `;` inside the last field stays in the
/// value (and then fails to parse as a number).
pub fn parse_stat_line(line: &str) -> Result<StatRecord, StatParseError> {
    let fields: Vec<&str> = line.trim().splitn(FIELD_COUNT, ';').collect();
    let [object_type, id, instance, state, metric, value] = fields[..] else {
        return Err(StatParseError::InsufficientFields(fields.len()));
    };

    if object_type.len() < OBJECT_TYPE_PREFIX_LEN {
        return Err(StatParseError::InvalidObjectType(object_type.to_string()));
    }

    let value: f64 = value
        .parse()
        .map_err(|_| StatParseError::InvalidValue(value.to_string()))?;

    Ok(StatRecord {
        object_type: object_type.to_string(),
        id: id.to_string(),
        instance: instance.to_string(),
        state: state.to_string(),
        metric: metric.to_string(),
        value,
    })
}
