use crate::ConnectionAlias;
use thiserror::Error;

/// How a backend operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// The connection cannot be used any more.
    Connectivity,
    /// The backend refused the statement (permissions, non-convertible type).
    Rejected,
    /// The dialect has no way to express the requested change.
    Unsupported,
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendErrorKind::Connectivity => write!(f, "connectivity"),
            BackendErrorKind::Rejected => write!(f, "rejected"),
            BackendErrorKind::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Error reported by a [`SchemaEditor`](crate::SchemaEditor) or
/// [`ConnectionSource`](crate::ConnectionSource).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn connectivity(message: impl Into<String>) -> Self {
        Self {
            kind: BackendErrorKind::Connectivity,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            kind: BackendErrorKind::Rejected,
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self {
            kind: BackendErrorKind::Unsupported,
            message: message.into(),
        }
    }

    pub fn is_connectivity(&self) -> bool {
        self.kind == BackendErrorKind::Connectivity
    }
}

impl From<tabula_sql::Unsupported> for BackendError {
    fn from(err: tabula_sql::Unsupported) -> Self {
        BackendError::unsupported(err.to_string())
    }
}

/// A declared table identifier that does not follow the name grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameParseError {
    #[error("table identifier is empty")]
    Empty,

    #[error("bracketed identifier '{0}' has no schema separator")]
    MissingSeparator(String),

    #[error("identifier '{0}' has an empty schema or table part")]
    EmptyPart(String),
}

/// Why a connection unit was aborted.
#[derive(Debug, Error)]
pub enum Error {
    #[error("connection '{alias}' is unusable: {source}")]
    Connectivity {
        alias: ConnectionAlias,
        source: BackendError,
    },

    #[error(
        "schema change on '{alias}' rejected for table '{entity}'{}: {source}",
        field_suffix(.field)
    )]
    Schema {
        alias: ConnectionAlias,
        /// Declared table identifier of the offending entity.
        entity: String,
        /// Column being reconciled, if the failure was column-level.
        field: Option<String>,
        source: BackendError,
    },

    #[error("cannot resolve table '{entity}' on '{alias}': {source}")]
    NameParse {
        alias: ConnectionAlias,
        entity: String,
        source: NameParseError,
    },

    #[error("connection '{alias}' uses unknown vendor '{vendor}'")]
    UnknownVendor {
        alias: ConnectionAlias,
        vendor: String,
    },

    #[error("connection '{alias}' has no settings")]
    MissingConnection { alias: ConnectionAlias },

    #[error("commit on '{alias}' failed: {source}")]
    Commit {
        alias: ConnectionAlias,
        source: BackendError,
    },
}

impl Error {
    /// The connection unit this error aborted.
    pub fn alias(&self) -> &ConnectionAlias {
        match self {
            Error::Connectivity { alias, .. }
            | Error::Schema { alias, .. }
            | Error::NameParse { alias, .. }
            | Error::UnknownVendor { alias, .. }
            | Error::MissingConnection { alias }
            | Error::Commit { alias, .. } => alias,
        }
    }
}

fn field_suffix(field: &Option<String>) -> String {
    match field {
        Some(field) => format!(", column '{field}'"),
        None => String::new(),
    }
}
