//! Imperative control commands and their JSON results.

mod parser;

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::control::Request;

pub use parser::{
    RELOAD_ACK, RELOAD_FAILED, ResponseLine, parse_healthcheck_line, parse_reload_line,
};

/// Commands that produce a [`CommandResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Reload,
    Healthcheck,
}

impl Command {
    pub fn request(self) -> Request {
        match self {
            Command::Reload => Request::Reload,
            Command::Healthcheck => Request::Healthcheck,
        }
    }

    /// Parses the `index`-th response line with this command's grammar.
    pub fn parse_line(self, index: usize, line: &str) -> ResponseLine {
        match self {
            Command::Reload => parse_reload_line(line),
            Command::Healthcheck => parse_healthcheck_line(index, line),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.request().token())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    #[default]
    Success,
    Failed,
}

/// Outcome of one command session, serialized as the HTTP response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct CommandResult {
    pub status: CommandStatus,
    /// Reload acknowledgement line, or `"OK"` for a healthy healthcheck.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub error_messages: Vec<String>,
    /// Healthcheck key/value pairs.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl CommandResult {
    /// Folds one parsed response line into the result.
    pub fn apply(&mut self, line: ResponseLine) {
        match line {
            ResponseLine::Reload {
                message,
                acknowledged,
            } => {
                self.message = Some(message);
                if !acknowledged {
                    self.error_messages.push(RELOAD_FAILED.to_string());
                }
            }
            ResponseLine::Status { key, value } => {
                self.message = Some("OK".to_string());
                self.data.insert(key, value);
            }
            ResponseLine::Entry { key, value } => {
                self.data.insert(key, value);
            }
            ResponseLine::Invalid(diagnostic) => self.error_messages.push(diagnostic),
        }
    }

    /// Sets the final status: failed iff any error was recorded.
    pub fn finish(mut self) -> Self {
        self.status = if self.error_messages.is_empty() {
            CommandStatus::Success
        } else {
            CommandStatus::Failed
        };
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == CommandStatus::Success
    }
}
