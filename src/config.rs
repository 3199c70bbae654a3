//! Configuration types for ndjson-stream

use crate::error::Result;
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Fragment extraction options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOptions {
    /// Emit a synthetic `"\n"` at completion when the response did not end
    /// with one (default: false)
    #[serde(default)]
    pub end_with_newline: bool,
}

/// What to request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// HTTP method (default: "GET")
    #[serde(default = "default_method")]
    pub method: String,

    /// Request body (default: none)
    #[serde(default)]
    pub post_data: Option<Vec<u8>>,

    /// Extra request headers
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            post_data: None,
            headers: HashMap::new(),
        }
    }
}

/// Settings for the built-in [`HttpTransport`](crate::HttpTransport)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Total request timeout (None = no limit)
    #[serde(default)]
    pub timeout: Option<Duration>,

    /// Connection establishment timeout (default: 30 seconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Option<Duration>,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Treat non-2xx responses as transport errors (default: true)
    #[serde(default = "default_true")]
    pub error_for_status: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
            error_for_status: true,
        }
    }
}

/// Builds the transport for a request
pub type TransportFactory =
    Box<dyn FnOnce(&str, &RequestConfig) -> Result<Box<dyn Transport>> + Send>;

/// Customises the transport before it is opened
pub type BeforeOpen = Box<dyn FnOnce(&mut dyn Transport) -> Result<()> + Send>;

/// Options for [`stream`](crate::stream)
#[derive(Default)]
pub struct StreamOptions {
    /// Method, body and headers
    pub request: RequestConfig,

    /// Transport constructor (default: [`HttpTransport`](crate::HttpTransport)
    /// with [`HttpConfig::default`])
    pub transport_factory: Option<TransportFactory>,

    /// Called with the transport strictly before `open`
    pub before_open: Option<BeforeOpen>,
}

impl StreamOptions {
    /// Use a custom transport constructor
    pub fn with_transport_factory<F>(mut self, factory: F) -> Self
    where
        F: FnOnce(&str, &RequestConfig) -> Result<Box<dyn Transport>> + Send + 'static,
    {
        self.transport_factory = Some(Box::new(factory));
        self
    }

    /// Customise the transport before it is opened
    pub fn with_before_open<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&mut dyn Transport) -> Result<()> + Send + 'static,
    {
        self.before_open = Some(Box::new(hook));
        self
    }
}

impl std::fmt::Debug for StreamOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamOptions")
            .field("request", &self.request)
            .field("transport_factory", &self.transport_factory.is_some())
            .field("before_open", &self.before_open.is_some())
            .finish()
    }
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_connect_timeout() -> Option<Duration> {
    Some(Duration::from_secs(30))
}

fn default_user_agent() -> String {
    concat!("ndjson-stream/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_true() -> bool {
    true
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults() {
        let config = RequestConfig::default();
        assert_eq!(config.method, "GET");
        assert!(config.post_data.is_none());
        assert!(config.headers.is_empty());
    }

    #[test]
    fn empty_json_uses_defaults() {
        let request: RequestConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(request, RequestConfig::default());

        let http: HttpConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(http, HttpConfig::default());
        assert!(http.error_for_status);
        assert_eq!(http.connect_timeout, Some(Duration::from_secs(30)));

        let source: SourceOptions = serde_json::from_str("{}").unwrap();
        assert!(!source.end_with_newline);
    }

    #[test]
    fn partial_json_overrides_only_given_fields() {
        let request: RequestConfig = serde_json::from_str(
            r#"{"method": "POST", "headers": {"Accept": "application/x-ndjson"}}"#,
        )
        .unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(
            request.headers.get("Accept").map(String::as_str),
            Some("application/x-ndjson")
        );
        assert!(request.post_data.is_none());
    }

    #[test]
    fn stream_options_debug_hides_hooks() {
        let options = StreamOptions::default().with_before_open(|_| Ok(()));
        let debug = format!("{options:?}");
        assert!(debug.contains("before_open: true"));
        assert!(debug.contains("transport_factory: false"));
    }
}
