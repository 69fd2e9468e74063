//! Maps parsed `STATS` records to metric emissions.
//!
//! Classification is a pure function of the object-type prefix and the
//! metric name. Only sources and destinations are exported; `center`,
//! `global` and unknown object types are dropped.

use super::parser::StatRecord;

/// Category of a `STATS` object, derived from the first four bytes of its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// `src.*` and `source`.
    Source,
    /// `dst.*` and `destination`.
    Destination,
    Center,
    Global,
    Other,
}

impl ObjectKind {
    /// Classifies an object type by its prefix.
    pub fn of(object_type: &str) -> Self {
        match object_type.as_bytes().get(..4) {
            Some(b"src." | b"sour") => ObjectKind::Source,
            Some(b"dst." | b"dest") => ObjectKind::Destination,
            Some(b"cent") => ObjectKind::Center,
            Some(b"glob") => ObjectKind::Global,
            _ => ObjectKind::Other,
        }
    }

    /// Name of the label carrying the record instance.
    pub fn instance_label(self) -> Option<&'static str> {
        match self {
            ObjectKind::Source => Some("source"),
            ObjectKind::Destination => Some("destination"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
}

/// An exported metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricFamily {
    SourceConnections,
    SourceMessagesProcessed,
    DestinationMessagesProcessed,
    DestinationMessagesDropped,
    DestinationMessagesStored,
    DestinationMessagesWritten,
    DestinationBytesStored,
}

impl MetricFamily {
    pub const ALL: [MetricFamily; 7] = [
        MetricFamily::SourceConnections,
        MetricFamily::SourceMessagesProcessed,
        MetricFamily::DestinationMessagesProcessed,
        MetricFamily::DestinationMessagesDropped,
        MetricFamily::DestinationMessagesStored,
        MetricFamily::DestinationMessagesWritten,
        MetricFamily::DestinationBytesStored,
    ];

    /// Selects the family for a metric name within an object kind.
    pub fn select(kind: ObjectKind, metric: &str) -> Option<Self> {
        let family = match (kind, metric) {
            (ObjectKind::Source, "processed") => MetricFamily::SourceMessagesProcessed,
            (ObjectKind::Source, "connections") => MetricFamily::SourceConnections,
            (ObjectKind::Destination, "dropped") => MetricFamily::DestinationMessagesDropped,
            (ObjectKind::Destination, "processed") => MetricFamily::DestinationMessagesProcessed,
            (ObjectKind::Destination, "written") => MetricFamily::DestinationMessagesWritten,
            (ObjectKind::Destination, "stored" | "queued") => {
                MetricFamily::DestinationMessagesStored
            }
            (ObjectKind::Destination, "memory_usage") => MetricFamily::DestinationBytesStored,
            _ => return None,
        };
        Some(family)
    }

    /// Exposed name, without the `syslog_ng_` namespace.
    pub fn name(self) -> &'static str {
        match self {
            MetricFamily::SourceConnections => "source_connections_total",
            MetricFamily::SourceMessagesProcessed => "source_messages_processed_total",
            MetricFamily::DestinationMessagesProcessed => "destination_messages_processed_total",
            MetricFamily::DestinationMessagesDropped => "destination_messages_dropped_total",
            MetricFamily::DestinationMessagesStored => "destination_messages_stored_total",
            MetricFamily::DestinationMessagesWritten => "destination_messages_written_total",
            MetricFamily::DestinationBytesStored => "destination_bytes_stored_total",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            MetricFamily::SourceConnections => "Number of source connections.",
            MetricFamily::SourceMessagesProcessed => "Number of messages processed by this source.",
            MetricFamily::DestinationMessagesProcessed => {
                "Number of messages processed by this destination."
            }
            MetricFamily::DestinationMessagesDropped => {
                "Number of messages dropped by this destination due to store overflow."
            }
            MetricFamily::DestinationMessagesStored => {
                "Number of messages currently stored for this destination."
            }
            MetricFamily::DestinationMessagesWritten => {
                "Number of messages successfully written by this destination."
            }
            MetricFamily::DestinationBytesStored => {
                "Bytes of memory currently used to store messages for this destination."
            }
        }
    }

    pub fn kind(self) -> MetricKind {
        match self {
            MetricFamily::DestinationMessagesStored | MetricFamily::DestinationBytesStored => {
                MetricKind::Gauge
            }
            _ => MetricKind::Counter,
        }
    }

    pub fn object_kind(self) -> ObjectKind {
        match self {
            MetricFamily::SourceConnections | MetricFamily::SourceMessagesProcessed => {
                ObjectKind::Source
            }
            _ => ObjectKind::Destination,
        }
    }

    /// Label names, in the order of [`MetricEmission::label_values`].
    pub fn label_names(self) -> [&'static str; 3] {
        let instance = self.object_kind().instance_label().unwrap_or("instance");
        ["type", "id", instance]
    }
}

/// A classified record: one sample of one family.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricEmission {
    pub family: MetricFamily,
    pub value: f64,
    pub object_type: String,
    pub id: String,
    pub instance: String,
}

impl MetricEmission {
    pub fn kind(&self) -> MetricKind {
        self.family.kind()
    }

    /// `(type, id, instance)` label values, taken verbatim from the record.
    pub fn label_values(&self) -> [&str; 3] {
        [
            self.object_type.as_str(),
            self.id.as_str(),
            self.instance.as_str(),
        ]
    }

    /// Label name/value pairs.
    pub fn labels(&self) -> Vec<(&'static str, String)> {
        self.family
            .label_names()
            .into_iter()
            .zip(self.label_values())
            .map(|(name, value)| (name, value.to_string()))
            .collect()
    }
}

/// Classifies a record, returning `None` when no family applies.
pub fn classify(record: &StatRecord) -> Option<MetricEmission> {
    let kind = ObjectKind::of(&record.object_type);
    let family = MetricFamily::select(kind, &record.metric)?;
    Some(MetricEmission {
        family,
        value: record.value,
        object_type: record.object_type.clone(),
        id: record.id.clone(),
        instance: record.instance.clone(),
    })
}
