use std::fmt;
use std::str::FromStr;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use thiserror::Error;
use url::Url;

/// Scheme accepted by [`ObjectLocator::parse`].
pub const S3_SCHEME: &str = "s3";

/// Characters escaped when a key is written back into a locator string, so
/// that parsing the output yields the same key again.
const KEY_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A bucket and an object key within it.
///
/// Both fields are guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocator {
    container: String,
    key: String,
}

impl ObjectLocator {
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> Result<Self, LocatorError> {
        let container = container.into();
        let key = key.into();
        if container.is_empty() {
            return Err(LocatorError::new(
                format!("{S3_SCHEME}:///{key}"),
                LocatorErrorKind::MissingContainer,
            ));
        }
        if key.is_empty() {
            return Err(LocatorError::new(
                format!("{S3_SCHEME}://{container}/"),
                LocatorErrorKind::MissingKey,
            ));
        }
        Ok(Self { container, key })
    }

    /// Parses `s3://<container>/<key>`.
    ///
    /// The key is the URL path without its leading `/`, percent-decoded.
    /// Trailing and repeated slashes are part of the key; `.` and `..`
    /// segments are resolved by URL rules first.
    pub fn parse(raw: &str) -> Result<Self, LocatorError> {
        let invalid = |kind| LocatorError::new(raw, kind);

        let url = Url::parse(raw)
            .map_err(|err| invalid(LocatorErrorKind::Malformed(err.to_string())))?;
        if url.scheme() != S3_SCHEME {
            return Err(invalid(LocatorErrorKind::UnsupportedScheme(
                url.scheme().to_string(),
            )));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid(LocatorErrorKind::UnexpectedComponent("userinfo")));
        }
        if url.port().is_some() {
            return Err(invalid(LocatorErrorKind::UnexpectedComponent("port")));
        }
        if url.query().is_some() {
            return Err(invalid(LocatorErrorKind::UnexpectedComponent("query")));
        }
        if url.fragment().is_some() {
            return Err(invalid(LocatorErrorKind::UnexpectedComponent("fragment")));
        }

        let container = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| invalid(LocatorErrorKind::MissingContainer))?;
        if container.contains('%') {
            return Err(invalid(LocatorErrorKind::Malformed(
                "bucket name must not be percent-encoded".into(),
            )));
        }

        let path = url.path();
        let encoded_key = path.strip_prefix('/').unwrap_or(path);
        let key = percent_decode_str(encoded_key)
            .decode_utf8()
            .map_err(|_| invalid(LocatorErrorKind::InvalidEncoding))?;
        if key.is_empty() {
            return Err(invalid(LocatorErrorKind::MissingKey));
        }

        Ok(Self {
            container: container.to_string(),
            key: key.into_owned(),
        })
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{S3_SCHEME}://{}/{}",
            self.container,
            utf8_percent_encode(&self.key, KEY_ENCODE_SET)
        )
    }
}

impl FromStr for ObjectLocator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid object locator `{locator}`: {kind}")]
pub struct LocatorError {
    locator: String,
    kind: LocatorErrorKind,
}

impl LocatorError {
    fn new(locator: impl Into<String>, kind: LocatorErrorKind) -> Self {
        Self {
            locator: locator.into(),
            kind,
        }
    }

    /// The rejected input, verbatim.
    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn kind(&self) -> &LocatorErrorKind {
        &self.kind
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorErrorKind {
    #[error("{0}")]
    Malformed(String),
    #[error("unsupported scheme `{0}`, expected `s3`")]
    UnsupportedScheme(String),
    #[error("missing bucket name")]
    MissingContainer,
    #[error("missing object key")]
    MissingKey,
    #[error("unexpected {0} in object locator")]
    UnexpectedComponent(&'static str),
    #[error("object key is not valid percent-encoded UTF-8")]
    InvalidEncoding,
}
