use thiserror::Error;

use crate::construct::Identifier;
use crate::operation::Operation;

#[derive(Error, Debug)]
pub enum ThingraphError {
    #[error("Untyped entity: {subject} carries no type assertion")]
    UntypedEntity { subject: Identifier },
    #[error("Duplicate triple: {operation} targets a fact that is already present")]
    DuplicateTriple { operation: Operation },
    #[error("Triple not found: {operation} targets a fact that is not present")]
    TripleNotFound { operation: Operation },
    #[error("Store error: {0}")]
    Store(String),
    #[error("Change set {index} failed: {source}")]
    ChangeSetFailed {
        index: usize,
        #[source]
        source: Box<ThingraphError>,
    },
    #[error("Parse error: {message}")]
    Parse { message: String, line: Option<usize>, col: Option<usize> },
    #[error("Config error: {0}")]
    Config(String),
}

/// The kind of failure, independent of how deeply it was wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UntypedEntity,
    DuplicateTriple,
    TripleNotFound,
    StoreFailure,
    Parse,
    Config,
}

impl ThingraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UntypedEntity { .. } => ErrorKind::UntypedEntity,
            Self::DuplicateTriple { .. } => ErrorKind::DuplicateTriple,
            Self::TripleNotFound { .. } => ErrorKind::TripleNotFound,
            Self::Store(_) => ErrorKind::StoreFailure,
            Self::ChangeSetFailed { source, .. } => source.kind(),
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Config(_) => ErrorKind::Config,
        }
    }
    /// The operation that was rejected, if the failure came from one.
    pub fn operation(&self) -> Option<&Operation> {
        match self {
            Self::DuplicateTriple { operation } | Self::TripleNotFound { operation } => {
                Some(operation)
            }
            Self::ChangeSetFailed { source, .. } => source.operation(),
            _ => None,
        }
    }
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into(), line: None, col: None }
    }
}

pub type Result<T> = std::result::Result<T, ThingraphError>;

// Helper conversions
impl From<rusqlite::Error> for ThingraphError {
    fn from(e: rusqlite::Error) -> Self { Self::Store(e.to_string()) }
}
impl From<config::ConfigError> for ThingraphError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<serde_json::Error> for ThingraphError {
    fn from(e: serde_json::Error) -> Self { Self::Config(e.to_string()) }
}
impl From<std::io::Error> for ThingraphError {
    fn from(e: std::io::Error) -> Self { Self::Config(e.to_string()) }
}
