//! Error type for registry operations.

use std::error::Error;
use std::fmt;

use crate::context::Interrupted;
use crate::cursor::CursorError;
use crate::filter::FilterError;
use crate::names::NameError;
use crate::store::StoreError;

/// Every failure a registry operation can report.
#[derive(Debug)]
pub enum RegistryError {
    /// Malformed name, filter, page token or field value. Never retried.
    InvalidArgument(String),
    /// The target resource (or the parent it needs) does not exist.
    NotFound(String),
    /// Create found the target already present.
    AlreadyExists(String),
    /// A storage fault not otherwise classified. The cause is kept for
    /// diagnostics only.
    Internal {
        message: String,
        source: Option<Box<dyn Error + Send + Sync>>,
    },
    /// The caller cancelled the call.
    Cancelled,
    /// The call's deadline passed.
    DeadlineExceeded,
}

impl RegistryError {
    pub fn internal(message: impl Into<String>) -> Self {
        RegistryError::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_with(
        message: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        RegistryError::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Classify a store fault raised while touching `name`.
    ///
    /// `NoSuchKey` becomes not-found; interruptions keep their kind; anything
    /// else is internal.
    pub fn from_store(err: StoreError, name: &str) -> Self {
        match err {
            StoreError::NoSuchKey => RegistryError::NotFound(format!("{} not found", name)),
            other => other.into(),
        }
    }

    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            RegistryError::InvalidArgument(_) => 400,
            RegistryError::NotFound(_) => 404,
            RegistryError::AlreadyExists(_) => 409,
            RegistryError::Internal { .. } => 500,
            RegistryError::Cancelled => 499,
            RegistryError::DeadlineExceeded => 504,
        }
    }

    /// Canonical upper-snake status name.
    pub fn status_name(&self) -> &'static str {
        match self {
            RegistryError::InvalidArgument(_) => "INVALID_ARGUMENT",
            RegistryError::NotFound(_) => "NOT_FOUND",
            RegistryError::AlreadyExists(_) => "ALREADY_EXISTS",
            RegistryError::Internal { .. } => "INTERNAL",
            RegistryError::Cancelled => "CANCELLED",
            RegistryError::DeadlineExceeded => "DEADLINE_EXCEEDED",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, RegistryError::AlreadyExists(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, RegistryError::InvalidArgument(_))
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            RegistryError::NotFound(msg) => write!(f, "not found: {}", msg),
            RegistryError::AlreadyExists(msg) => write!(f, "already exists: {}", msg),
            RegistryError::Internal { message, .. } => write!(f, "internal error: {}", message),
            RegistryError::Cancelled => write!(f, "call cancelled"),
            RegistryError::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RegistryError::Internal {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<NameError> for RegistryError {
    fn from(err: NameError) -> Self {
        RegistryError::InvalidArgument(err.to_string())
    }
}

impl From<FilterError> for RegistryError {
    fn from(err: FilterError) -> Self {
        RegistryError::InvalidArgument(err.to_string())
    }
}

impl From<CursorError> for RegistryError {
    fn from(err: CursorError) -> Self {
        RegistryError::InvalidArgument(err.to_string())
    }
}

impl From<Interrupted> for RegistryError {
    fn from(reason: Interrupted) -> Self {
        match reason {
            Interrupted::Cancelled => RegistryError::Cancelled,
            Interrupted::DeadlineExceeded => RegistryError::DeadlineExceeded,
        }
    }
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Interrupted(reason) => reason.into(),
            StoreError::InvalidResume(msg) => {
                RegistryError::InvalidArgument(format!("invalid page token: {}", msg))
            }
            other => RegistryError::internal_with("storage operation failed", other),
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::InvalidArgument(format!("malformed resource: {}", err))
    }
}
