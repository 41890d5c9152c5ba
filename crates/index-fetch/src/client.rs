//! Storage client seam.
//!
//! The fetcher never talks to a provider SDK directly. A [`ClientConnector`]
//! resolves whatever ambient configuration the provider needs and hands back
//! an [`ObjectClient`]; the client opens an [`ObjectBody`] for one object.
//! Tests substitute all three with in-memory doubles.

use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::locator::ObjectLocator;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[async_trait]
pub trait ClientConnector: Send + Sync {
    type Client: ObjectClient;

    /// Resolves credentials, region and endpoint, and builds a client.
    async fn connect(&self) -> Result<Self::Client, BackendError>;
}

#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Issues a get-object request and returns the open response body.
    async fn get_object(
        &self,
        locator: &ObjectLocator,
    ) -> Result<Box<dyn ObjectBody>, BackendError>;
}

/// An open response body.
///
/// Dropping the body releases the underlying connection or stream.
/// Implementations must not require an explicit close call.
#[async_trait]
pub trait ObjectBody: Send {
    /// Next chunk of the body, or `None` once the body is exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, BackendError>;

    /// Declared body length, when the backend reports one.
    fn size_hint(&self) -> Option<u64> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    NotFound,
    PermissionDenied,
    Network,
    Other,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BackendErrorKind::NotFound => "object not found",
            BackendErrorKind::PermissionDenied => "access denied",
            BackendErrorKind::Network => "network error",
            BackendErrorKind::Other => "backend error",
        };
        f.write_str(label)
    }
}

/// Failure reported by a storage backend.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    kind: BackendErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: BackendErrorKind,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::NotFound, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::PermissionDenied, message)
    }

    pub fn kind(&self) -> BackendErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
