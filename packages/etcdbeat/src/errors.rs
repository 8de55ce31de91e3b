use strum::Display;
use thiserror::Error as ThisError;

use crate::model::StatsCategory;

#[derive(Debug, Clone, ThisError, Eq, PartialEq)]
pub enum ConfigError {
    #[error("Error reading configuration file path={path} reason={reason}")]
    Read { path: String, reason: String },
    #[error("Error parsing configuration file path={path} reason={reason}")]
    Parse { path: String, reason: String },
    #[error("Missing required configuration fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("Invalid configuration field={field} reason={reason}")]
    Invalid { field: String, reason: String },
}

#[derive(Debug, Clone, Copy, Display, Eq, PartialEq)]
pub enum StatsClientErrorKind {
    Connection,
    UnexpectedStatus,
    Decode,
}

#[derive(Debug, Clone, ThisError, Eq, PartialEq)]
#[error("Stats client error kind={kind} category={category} reason={reason}")]
pub struct StatsClientError {
    pub kind: StatsClientErrorKind,
    pub category: StatsCategory,
    pub reason: String,
}

impl StatsClientError {
    pub fn connection(category: StatsCategory, reason: impl ToString) -> Self {
        Self {
            kind: StatsClientErrorKind::Connection,
            category,
            reason: reason.to_string(),
        }
    }

    pub fn unexpected_status(category: StatsCategory, status: impl ToString) -> Self {
        Self {
            kind: StatsClientErrorKind::UnexpectedStatus,
            category,
            reason: format!("HTTP {}", status.to_string()),
        }
    }

    pub fn decode(category: StatsCategory, reason: impl ToString) -> Self {
        Self {
            kind: StatsClientErrorKind::Decode,
            category,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, ThisError, Eq, PartialEq)]
#[error("Publish error reason={reason}")]
pub struct PublishError {
    pub reason: String,
}

#[derive(Debug, ThisError)]
pub enum BeatError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Runtime error reason={0}")]
    Runtime(String),
}
