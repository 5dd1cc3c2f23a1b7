use std::fmt;

use vmaudit_core::TaskError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    pub kind: FailureKind,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ClientError {}

impl From<ClientError> for TaskError {
    fn from(err: ClientError) -> Self {
        TaskError::Query(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Unauthorized,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Unauthorized => write!(f, "unauthorized"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "unexpected response body"),
        }
    }
}

/// Failures that abort a report before any task is submitted.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("could not connect to {endpoint}: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: ClientError,
    },
    #[error("datastore {0:?} not found")]
    DatastoreNotFound(String),
    #[error("organization {0:?} not found")]
    OrgNotFound(String),
    #[error("no vCenter named {0:?} is configured")]
    VcenterNotFound(String),
    #[error("no vCenter endpoints are configured")]
    NoVcenters,
    #[error("no Cloud Director endpoint is configured")]
    NoCloudDirector,
    #[error("inventory lookup on {endpoint} failed: {source}")]
    Inventory {
        endpoint: String,
        #[source]
        source: ClientError,
    },
}

impl SetupError {
    pub(crate) fn inventory(endpoint: &str, source: ClientError) -> Self {
        SetupError::Inventory {
            endpoint: endpoint.to_string(),
            source,
        }
    }
}
