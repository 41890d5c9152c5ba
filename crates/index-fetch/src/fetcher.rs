use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::client::{ClientConnector, ObjectBody, ObjectClient};
use crate::context::FetchContext;
use crate::error::{FetchError, FetchStage};
use crate::locator::ObjectLocator;

/// Backend name under which [`ObjectFetcher`] registers as an [`IndexFetcher`].
pub const S3_BACKEND: &str = "s3";

/// Upper bound on the buffer reserved up front from a declared body length.
const MAX_PREALLOCATION: usize = 64 * 1024 * 1024;

/// One configured index, as handed to a fetch backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub backend: String,
}

impl IndexEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            backend: S3_BACKEND.to_string(),
        }
    }
}

/// A backend able to retrieve the raw bytes of an index file.
#[async_trait]
pub trait IndexFetcher: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn fetch(&self, ctx: &FetchContext, entry: &IndexEntry) -> Result<Vec<u8>, FetchError>;
}

/// Fetches whole objects through a [`ClientConnector`].
///
/// Each call resolves configuration, issues exactly one get-object request
/// and buffers the complete body. Nothing is retried or cached.
#[derive(Debug, Clone)]
pub struct ObjectFetcher<C> {
    connector: C,
}

impl<C> ObjectFetcher<C>
where
    C: ClientConnector,
{
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    #[instrument(level = "trace", skip_all, fields(locator = %uri))]
    pub async fn fetch(&self, ctx: &FetchContext, uri: &str) -> Result<Vec<u8>, FetchError> {
        let locator = ObjectLocator::parse(uri).inspect_err(|err| {
            debug!("rejecting object locator: {err}");
        })?;
        self.fetch_locator(ctx, &locator).await
    }

    #[instrument(level = "trace", skip_all, fields(index = %entry.name))]
    pub async fn fetch_entry(
        &self,
        ctx: &FetchContext,
        entry: &IndexEntry,
    ) -> Result<Vec<u8>, FetchError> {
        // An empty backend means the default one.
        if !entry.backend.is_empty() && entry.backend != S3_BACKEND {
            return Err(FetchError::UnsupportedBackend {
                backend: entry.backend.clone(),
            });
        }
        self.fetch(ctx, &entry.url).await
    }

    #[instrument(
        level = "trace",
        skip_all,
        fields(bucket = %locator.container(), key = %locator.key())
    )]
    pub async fn fetch_locator(
        &self,
        ctx: &FetchContext,
        locator: &ObjectLocator,
    ) -> Result<Vec<u8>, FetchError> {
        let client = ctx
            .run(FetchStage::ResolveConfig, self.connector.connect())
            .await?
            .map_err(|err| {
                warn!("object storage configuration unavailable: {err}");
                FetchError::config_unavailable(err)
            })?;
        debug!("object storage client ready");

        let body = ctx
            .run(FetchStage::GetObject, client.get_object(locator))
            .await?
            .map_err(|err| {
                debug!("get object failed: {err}");
                FetchError::object_unreachable(locator, err)
            })?;
        debug!(size_hint = ?body.size_hint(), "object opened");

        let bytes = drain(ctx, locator, body).await?;
        debug!(len = bytes.len(), "object body read");
        Ok(bytes)
    }
}

/// Reads `body` to the end. `body` is owned here so it is dropped, and its
/// handle released, on every return path.
async fn drain(
    ctx: &FetchContext,
    locator: &ObjectLocator,
    mut body: Box<dyn ObjectBody>,
) -> Result<Vec<u8>, FetchError> {
    let capacity = body
        .size_hint()
        .and_then(|len| usize::try_from(len).ok())
        .unwrap_or_default()
        .min(MAX_PREALLOCATION);
    let mut buf = Vec::with_capacity(capacity);

    loop {
        let chunk = ctx
            .run(FetchStage::ReadBody, body.next_chunk())
            .await?
            .map_err(|err| {
                debug!(received = buf.len(), "body read failed: {err}");
                FetchError::body_read_failed(locator, buf.len(), err)
            })?;
        match chunk {
            Some(chunk) => buf.extend_from_slice(&chunk),
            None => return Ok(buf),
        }
    }
}

#[async_trait]
impl<C> IndexFetcher for ObjectFetcher<C>
where
    C: ClientConnector,
{
    fn backend(&self) -> &'static str {
        S3_BACKEND
    }

    async fn fetch(&self, ctx: &FetchContext, entry: &IndexEntry) -> Result<Vec<u8>, FetchError> {
        self.fetch_entry(ctx, entry).await
    }
}
