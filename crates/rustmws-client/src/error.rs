//! Error types for the request engine.

use rustmws_auth::SignError;
use rustmws_core::{CoreError, ThrottleCategory};

use crate::xml::{ServiceFault, XmlError};

/// Errors surfaced by the request engine.
#[derive(Debug, thiserror::Error)]
pub enum MwsError {
    /// Missing or invalid configuration, including unknown store names.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The configured signature algorithm is not supported.
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The HTTP call failed before a response was received.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("remote request failed with status {status}{}", fault_suffix(.fault.as_ref()))]
    RemoteRequest {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
        /// Parsed `<Error>` block, when the body contains one.
        fault: Option<ServiceFault>,
    },

    /// Mock mode is enabled but no fixture is queued.
    #[error("mock response queue is exhausted")]
    MockExhausted,

    /// A file-backed mock fixture could not be read.
    #[error("failed to load mock fixture {name}: {source}")]
    MockFixture {
        /// Fixture name as queued.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A throttle wait was cancelled before the budget refilled.
    #[error("throttle wait for {category} was cancelled")]
    ThrottleTimeout {
        /// Category whose budget was exhausted.
        category: ThrottleCategory,
    },

    /// An in-flight call was cancelled.
    #[error("request was cancelled")]
    Cancelled,

    /// A response could not be parsed.
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl MwsError {
    /// HTTP status of a remote failure.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteRequest { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed service fault of a remote failure.
    #[must_use]
    pub fn fault(&self) -> Option<&ServiceFault> {
        match self {
            Self::RemoteRequest { fault, .. } => fault.as_ref(),
            _ => None,
        }
    }

    /// Whether the service rejected the call for exceeding its quota.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        match self {
            Self::RemoteRequest { status, fault, .. } => {
                *status == 503
                    || fault
                        .as_ref()
                        .is_some_and(|f| f.code == "RequestThrottled" || f.code == "QuotaExceeded")
            }
            _ => false,
        }
    }
}

fn fault_suffix(fault: Option<&ServiceFault>) -> String {
    match fault {
        Some(f) => match &f.message {
            Some(message) => format!(": {} ({message})", f.code),
            None => format!(": {}", f.code),
        },
        None => String::new(),
    }
}

impl From<CoreError> for MwsError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config(msg) => Self::Configuration(msg),
            CoreError::StoreNotFound(id) => Self::Configuration(format!("store not found: {id}")),
            other => Self::Configuration(other.to_string()),
        }
    }
}

impl From<SignError> for MwsError {
    fn from(err: SignError) -> Self {
        match err {
            SignError::UnsupportedAlgorithm(name) => Self::UnsupportedAlgorithm(name),
            SignError::InvalidKey => Self::Configuration("invalid signing key".to_owned()),
        }
    }
}

impl From<XmlError> for MwsError {
    fn from(err: XmlError) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Convenience result alias.
pub type MwsResult<T> = Result<T, MwsError>;
