//! # HTTP Transport
//!
//! The reference [`Transport`]: every exchange is a single `POST` of the serialized request
//! envelope to a fixed URI.
//!
//! ## Status mapping
//!
//! | Status | Outcome |
//! |--------|---------|
//! | `200`  | the response body text |
//! | `204`  | empty success (`None`) |
//! | `400`  | `TransportError` "Invalid request" |
//! | other  | `TransportError` "Invalid response" |
//!
//! A request that never produces a status (connection refused, DNS failure, timeout) is a
//! `TransportError` carrying the underlying error message.
//!
//! ## Headers
//!
//! Caller supplied headers are sent as-is (e.g. `authorization`), except `Content-Type`,
//! which is always [`JSON_CONTENT_TYPE`].
use super::Transport;
use crate::envelope::ErrorInfo;
use async_trait::async_trait;
use http::{
    HeaderMap, HeaderName, HeaderValue, StatusCode, Uri,
    header::{CONTENT_TYPE, InvalidHeaderName, InvalidHeaderValue},
    uri::InvalidUri,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, str::FromStr, time::Duration};
use tracing::debug;

/// The `Content-Type` sent with every request.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Whether cookies and other ambient credentials accompany requests.
///
/// The transport only ever talks to its configured origin, so `SameOrigin` and `Include`
/// both keep a cookie store; `Omit` never stores nor sends cookies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    Omit,
    #[default]
    SameOrigin,
    Include,
}

impl Credentials {
    fn uses_cookie_store(self) -> bool {
        !matches!(self, Credentials::Omit)
    }
}

/// Configuration of an [`HttpTransport`].
///
/// Deserializable so it can live in an application config file:
///
/// ```json
/// {
///   "uri": "http://localhost:3030/rpc",
///   "headers": { "authorization": "Bearer <jwt>" },
///   "credentials": "include",
///   "timeoutMs": 5000
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpTransportConfig {
    pub uri: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub credentials: Credentials,
    /// Per-request deadline. Without one, a server that never answers hangs the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl HttpTransportConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            headers: BTreeMap::new(),
            credentials: Credentials::default(),
            timeout_ms: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }
}

/// Errors that can occur when building an [`HttpTransport`] from its configuration.
#[derive(Debug, thiserror::Error)]
pub enum HttpTransportBuildError {
    #[error("Invalid uri '{uri}' provided: '{source}'")]
    InvalidUri { uri: String, source: InvalidUri },
    #[error("Unsupported uri '{0}': expected an http or https uri")]
    UnsupportedScheme(String),
    #[error("Invalid header key '{key}': '{source}'")]
    InvalidHeaderName {
        key: String,
        source: InvalidHeaderName,
    },
    #[error("Invalid header value for key '{key}': '{source}'")]
    InvalidHeaderValue {
        key: String,
        source: InvalidHeaderValue,
    },
    #[error("Failed to build the HTTP client: '{0}'")]
    Client(#[source] reqwest::Error),
}

/// A [`Transport`] that performs one HTTP `POST` per call.
///
/// The configuration is validated once, at construction, and read-only afterwards, so a
/// single instance can serve any number of concurrent calls.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    uri: String,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds the transport.
    ///
    /// # Returns
    ///
    /// * `Ok(HttpTransport)` - Ready to send.
    /// * `Err(HttpTransportBuildError)` - If the URI or a header is invalid.
    pub fn new(config: HttpTransportConfig) -> Result<Self, HttpTransportBuildError> {
        let uri =
            Uri::from_str(&config.uri).map_err(|source| HttpTransportBuildError::InvalidUri {
                uri: config.uri.clone(),
                source,
            })?;

        if !matches!(uri.scheme_str(), Some("http" | "https")) {
            return Err(HttpTransportBuildError::UnsupportedScheme(config.uri));
        }

        let headers = build_headers(config.headers)?;

        let client = reqwest::Client::builder()
            .cookie_store(config.credentials.uses_cookie_store())
            .build()
            .map_err(HttpTransportBuildError::Client)?;

        Ok(Self {
            uri: config.uri,
            headers,
            timeout: config.timeout_ms.map(Duration::from_millis),
            client,
        })
    }

    /// The headers sent with every request, `Content-Type` included.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(&self, payload: String) -> Result<Option<String>, ErrorInfo> {
        let mut request = self
            .client
            .post(&self.uri)
            .headers(self.headers.clone())
            .body(payload);

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ErrorInfo::transport(e.to_string()))?;

        let status = response.status();
        debug!(uri = %self.uri, %status, "Received HTTP response");

        match status {
            StatusCode::OK => response
                .text()
                .await
                .map(Some)
                .map_err(|e| ErrorInfo::transport(e.to_string())),
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::BAD_REQUEST => Err(ErrorInfo::transport("Invalid request")),
            _ => Err(ErrorInfo::transport("Invalid response")),
        }
    }
}

fn build_headers(extra: BTreeMap<String, String>) -> Result<HeaderMap, HttpTransportBuildError> {
    let mut headers = HeaderMap::new();
    for (k, v) in extra {
        let key = HeaderName::from_str(&k).map_err(|source| {
            HttpTransportBuildError::InvalidHeaderName {
                key: k.clone(),
                source,
            }
        })?;
        let val = HeaderValue::from_str(&v)
            .map_err(|source| HttpTransportBuildError::InvalidHeaderValue { key: k, source })?;
        headers.insert(key, val);
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_overrides_caller_header() {
        let transport = HttpTransport::new(
            HttpTransportConfig::new("http://127.0.0.1:8080")
                .header("Content-Type", "text/plain")
                .header("authorization", "Bearer token"),
        )
        .unwrap();

        assert_eq!(transport.headers()[CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert_eq!(transport.headers()["authorization"], "Bearer token");
        assert_eq!(transport.headers().len(), 2);
    }

    #[test]
    fn test_rejects_invalid_configuration() {
        let err = HttpTransport::new(HttpTransportConfig::new("http://exa mple")).unwrap_err();
        assert!(matches!(err, HttpTransportBuildError::InvalidUri { .. }));

        let err = HttpTransport::new(HttpTransportConfig::new("ftp://127.0.0.1")).unwrap_err();
        assert!(matches!(err, HttpTransportBuildError::UnsupportedScheme(_)));

        let err = HttpTransport::new(HttpTransportConfig::new("/relative")).unwrap_err();
        assert!(matches!(err, HttpTransportBuildError::UnsupportedScheme(_)));

        let err = HttpTransport::new(
            HttpTransportConfig::new("http://127.0.0.1").header("bad header", "x"),
        )
        .unwrap_err();
        assert!(matches!(err, HttpTransportBuildError::InvalidHeaderName { key, .. } if key == "bad header"));

        let err = HttpTransport::new(
            HttpTransportConfig::new("http://127.0.0.1").header("x-token", "line\nbreak"),
        )
        .unwrap_err();
        assert!(matches!(err, HttpTransportBuildError::InvalidHeaderValue { key, .. } if key == "x-token"));
    }

    #[test]
    fn test_config_from_json() {
        let config: HttpTransportConfig = serde_json::from_str(
            r#"{
                "uri": "https://rpc.example.com",
                "headers": { "authorization": "Bearer jwt" },
                "credentials": "omit",
                "timeoutMs": 1500
            }"#,
        )
        .unwrap();

        assert_eq!(
            config,
            HttpTransportConfig::new("https://rpc.example.com")
                .header("authorization", "Bearer jwt")
                .credentials(Credentials::Omit)
                .timeout(Duration::from_millis(1500))
        );

        let minimal: HttpTransportConfig =
            serde_json::from_str(r#"{ "uri": "http://localhost" }"#).unwrap();
        assert_eq!(minimal.credentials, Credentials::SameOrigin);
        assert!(minimal.headers.is_empty());
    }
}
