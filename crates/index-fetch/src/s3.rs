//! Amazon S3 backend built on the AWS SDK default configuration chain.

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{BackendError, BackendErrorKind, ClientConnector, ObjectBody, ObjectClient};
use crate::locator::ObjectLocator;

/// Overrides applied on top of the SDK's environment discovery.
///
/// Credentials are never configured here; they always come from the default
/// provider chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3ConnectorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Endpoint for S3-compatible stores such as MinIO or R2.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    pub force_path_style: bool,
}

impl S3ConnectorConfig {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_force_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct S3Connector {
    config: S3ConnectorConfig,
}

impl S3Connector {
    pub fn new(config: S3ConnectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &S3ConnectorConfig {
        &self.config
    }
}

#[async_trait]
impl ClientConnector for S3Connector {
    type Client = S3ObjectClient;

    async fn connect(&self) -> Result<S3ObjectClient, BackendError> {
        // One get-object request per fetch: SDK retries stay off.
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).retry_config(RetryConfig::disabled());
        if let Some(region) = &self.config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &self.config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        if let Some(profile) = &self.config.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        let region = sdk_config.region().ok_or_else(|| {
            BackendError::new(BackendErrorKind::Other, "no AWS region configured")
        })?;
        let provider = sdk_config.credentials_provider().ok_or_else(|| {
            BackendError::new(
                BackendErrorKind::Other,
                "no AWS credentials provider configured",
            )
        })?;
        provider.provide_credentials().await.map_err(|err| {
            BackendError::with_source(
                BackendErrorKind::Other,
                "unable to load AWS credentials",
                err,
            )
        })?;
        debug!(region = %region, "resolved AWS configuration");

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(self.config.force_path_style)
            .build();
        Ok(S3ObjectClient {
            client: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }
}

#[derive(Debug, Clone)]
pub struct S3ObjectClient {
    client: aws_sdk_s3::Client,
}

#[async_trait]
impl ObjectClient for S3ObjectClient {
    async fn get_object(
        &self,
        locator: &ObjectLocator,
    ) -> Result<Box<dyn ObjectBody>, BackendError> {
        let output = self
            .client
            .get_object()
            .bucket(locator.container())
            .key(locator.key())
            .send()
            .await
            .map_err(classify_get_object_error)?;

        let size_hint = output
            .content_length()
            .and_then(|len| u64::try_from(len).ok());
        Ok(Box::new(S3ObjectBody {
            stream: output.body,
            size_hint,
        }))
    }
}

/// Streaming body of a get-object response. The HTTP connection is released
/// when the stream is dropped.
struct S3ObjectBody {
    stream: ByteStream,
    size_hint: Option<u64>,
}

#[async_trait]
impl ObjectBody for S3ObjectBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, BackendError> {
        self.stream.try_next().await.map_err(|err| {
            BackendError::with_source(
                BackendErrorKind::Network,
                "response body stream failed",
                err,
            )
        })
    }

    fn size_hint(&self) -> Option<u64> {
        self.size_hint
    }
}

fn classify_get_object_error(err: SdkError<GetObjectError, HttpResponse>) -> BackendError {
    let status = err.raw_response().map(|response| response.status().as_u16());
    let (kind, summary) = match (&err, status) {
        (SdkError::TimeoutError(_), _) => (BackendErrorKind::Network, "request timed out"),
        (SdkError::DispatchFailure(_), _) => (BackendErrorKind::Network, "request not sent"),
        (SdkError::ConstructionFailure(_), _) => {
            (BackendErrorKind::Other, "request could not be built")
        }
        (SdkError::ResponseError(_), _) => (BackendErrorKind::Other, "unreadable response"),
        (_, Some(404)) => (BackendErrorKind::NotFound, "service error"),
        (_, Some(401 | 403)) => (BackendErrorKind::PermissionDenied, "service error"),
        (_, Some(500..=599)) => (BackendErrorKind::Network, "service error"),
        _ => (BackendErrorKind::Other, "service error"),
    };

    let service_error = err.into_service_error();
    let kind = if service_error.is_no_such_key() {
        BackendErrorKind::NotFound
    } else {
        kind
    };
    let message = describe_failure(
        summary,
        status,
        service_error.code(),
        service_error.message(),
    );
    BackendError::with_source(kind, message, service_error)
}

/// `<code>: <message> (HTTP <status>)`, falling back to `summary` when the
/// service returned no error code.
fn describe_failure(
    summary: &str,
    status: Option<u16>,
    code: Option<&str>,
    message: Option<&str>,
) -> String {
    let mut out = match (code, message) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (Some(code), None) => code.to_string(),
        (None, Some(message)) => format!("{summary}: {message}"),
        (None, None) => summary.to_string(),
    };
    if let Some(status) = status {
        out.push_str(&format!(" (HTTP {status})"));
    }
    out
}
