#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use index_fetch::{
    BackendError, BackendErrorKind, ClientConnector, ObjectBody, ObjectClient, ObjectLocator,
};

pub const CHUNK_SIZE: usize = 64 * 1024;

/// How the in-memory store answers a request for one key.
#[derive(Debug, Clone)]
pub enum Served {
    Payload(Bytes),
    /// Delivers the bytes, then fails the next read.
    FailAfter(Bytes),
    Denied,
    StallRequest,
    StallBody,
}

/// Counts calls crossing the client seam.
#[derive(Debug, Clone, Default)]
pub struct Calls {
    connects: Arc<AtomicUsize>,
    requests: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl Calls {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: HashMap<(String, String), Served>,
    missing_credentials: bool,
    calls: Calls,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, bucket: &str, key: &str, served: Served) -> Self {
        self.objects.insert((bucket.to_string(), key.to_string()), served);
        self
    }

    pub fn with_payload(self, bucket: &str, key: &str, payload: impl Into<Bytes>) -> Self {
        self.with_object(bucket, key, Served::Payload(payload.into()))
    }

    pub fn without_credentials(mut self) -> Self {
        self.missing_credentials = true;
        self
    }

    pub fn calls(&self) -> Calls {
        self.calls.clone()
    }
}

#[async_trait]
impl ClientConnector for MemoryStore {
    type Client = MemoryClient;

    async fn connect(&self) -> Result<MemoryClient, BackendError> {
        self.calls.connects.fetch_add(1, Ordering::SeqCst);
        if self.missing_credentials {
            return Err(BackendError::new(
                BackendErrorKind::Other,
                "no credentials in environment",
            ));
        }
        Ok(MemoryClient {
            objects: Arc::new(self.objects.clone()),
            calls: self.calls.clone(),
        })
    }
}

pub struct MemoryClient {
    objects: Arc<HashMap<(String, String), Served>>,
    calls: Calls,
}

#[async_trait]
impl ObjectClient for MemoryClient {
    async fn get_object(
        &self,
        locator: &ObjectLocator,
    ) -> Result<Box<dyn ObjectBody>, BackendError> {
        self.calls.requests.fetch_add(1, Ordering::SeqCst);
        let served = self
            .objects
            .get(&(locator.container().to_string(), locator.key().to_string()))
            .cloned()
            .ok_or_else(|| BackendError::not_found(format!("NoSuchKey: {locator}")))?;

        let (remaining, fail_at_end, stall) = match served {
            Served::Payload(bytes) => (bytes, false, false),
            Served::FailAfter(bytes) => (bytes, true, false),
            Served::StallBody => (Bytes::new(), false, true),
            Served::Denied => {
                return Err(BackendError::permission_denied(format!(
                    "AccessDenied: {locator}"
                )));
            }
            Served::StallRequest => std::future::pending().await,
        };
        Ok(Box::new(MemoryBody {
            size_hint: remaining.len() as u64,
            remaining,
            fail_at_end,
            stall,
            calls: self.calls.clone(),
        }))
    }
}

struct MemoryBody {
    remaining: Bytes,
    size_hint: u64,
    fail_at_end: bool,
    stall: bool,
    calls: Calls,
}

#[async_trait]
impl ObjectBody for MemoryBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, BackendError> {
        if self.stall {
            std::future::pending::<()>().await;
        }
        if self.remaining.is_empty() {
            if self.fail_at_end {
                let io =
                    std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset");
                return Err(BackendError::with_source(
                    BackendErrorKind::Network,
                    "stream interrupted",
                    io,
                ));
            }
            return Ok(None);
        }
        let len = self.remaining.len().min(CHUNK_SIZE);
        Ok(Some(self.remaining.split_to(len)))
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.size_hint)
    }
}

impl Drop for MemoryBody {
    fn drop(&mut self) {
        self.calls.releases.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn patterned_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
