use std::fmt;

use thiserror::Error;

use crate::client::{BackendError, BackendErrorKind};
use crate::locator::{LocatorError, ObjectLocator};

/// Step of a fetch at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStage {
    Parse,
    ResolveConfig,
    GetObject,
    ReadBody,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FetchStage::Parse => "locator parsing",
            FetchStage::ResolveConfig => "storage configuration",
            FetchStage::GetObject => "object request",
            FetchStage::ReadBody => "body read",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    LocatorInvalid(#[from] LocatorError),
    #[error("index backend `{backend}` is not served by the object storage fetcher")]
    UnsupportedBackend { backend: String },
    #[error("unable to resolve object storage configuration: {source}")]
    ConfigUnavailable {
        #[source]
        source: BackendError,
    },
    #[error("unable to get object {locator}: {source}")]
    ObjectUnreachable {
        locator: ObjectLocator,
        #[source]
        source: BackendError,
    },
    #[error("error reading object {locator} after {received} bytes: {source}")]
    BodyReadFailed {
        locator: ObjectLocator,
        received: usize,
        #[source]
        source: BackendError,
    },
    #[error("fetch cancelled during {stage}")]
    Cancelled { stage: FetchStage },
    #[error("fetch deadline exceeded during {stage}")]
    DeadlineExceeded { stage: FetchStage },
}

impl FetchError {
    pub fn config_unavailable(source: BackendError) -> Self {
        FetchError::ConfigUnavailable { source }
    }

    pub fn object_unreachable(locator: &ObjectLocator, source: BackendError) -> Self {
        FetchError::ObjectUnreachable {
            locator: locator.clone(),
            source,
        }
    }

    pub fn body_read_failed(
        locator: &ObjectLocator,
        received: usize,
        source: BackendError,
    ) -> Self {
        FetchError::BodyReadFailed {
            locator: locator.clone(),
            received,
            source,
        }
    }

    pub fn stage(&self) -> FetchStage {
        match self {
            FetchError::LocatorInvalid(_) | FetchError::UnsupportedBackend { .. } => {
                FetchStage::Parse
            }
            FetchError::ConfigUnavailable { .. } => FetchStage::ResolveConfig,
            FetchError::ObjectUnreachable { .. } => FetchStage::GetObject,
            FetchError::BodyReadFailed { .. } => FetchStage::ReadBody,
            FetchError::Cancelled { stage } | FetchError::DeadlineExceeded { stage } => *stage,
        }
    }

    /// True for caller-initiated cancellation and expired deadlines.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            FetchError::Cancelled { .. } | FetchError::DeadlineExceeded { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            FetchError::ObjectUnreachable { source, .. } => {
                source.kind() == BackendErrorKind::NotFound
            }
            _ => false,
        }
    }

    /// The backend failure behind this error, if the backend was reached.
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            FetchError::ConfigUnavailable { source }
            | FetchError::ObjectUnreachable { source, .. }
            | FetchError::BodyReadFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
