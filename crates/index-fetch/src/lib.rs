#![forbid(unsafe_code)]
//! Retrieval of raw index files from object storage.
//!
//! ```no_run
//! # async fn run() -> Result<(), index_fetch::FetchError> {
//! use index_fetch::FetchContext;
//!
//! let ctx = FetchContext::new();
//! let bytes = index_fetch::fetch(&ctx, "s3://plugins-index/falco/index.yaml").await?;
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod context;
pub mod error;
pub mod fetcher;
pub mod locator;
#[cfg(feature = "s3")]
pub mod s3;

pub use client::{BackendError, BackendErrorKind, ClientConnector, ObjectBody, ObjectClient};
pub use context::FetchContext;
pub use error::{FetchError, FetchStage};
pub use fetcher::{IndexEntry, IndexFetcher, ObjectFetcher, S3_BACKEND};
pub use locator::{LocatorError, LocatorErrorKind, ObjectLocator};
#[cfg(feature = "s3")]
pub use s3::{S3Connector, S3ConnectorConfig, S3ObjectClient};

/// Fetches the object named by `uri` using the default S3 configuration chain.
#[cfg(feature = "s3")]
pub async fn fetch(ctx: &FetchContext, uri: &str) -> Result<Vec<u8>, FetchError> {
    ObjectFetcher::new(S3Connector::default()).fetch(ctx, uri).await
}
