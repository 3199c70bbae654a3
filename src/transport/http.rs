//! `reqwest`-backed progressive download.

use super::{Progress, ReadyState, Transport, TransportListener};
use crate::config::HttpConfig;
use crate::error::{Error, Result, TransportError};
use futures::StreamExt;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Transport that downloads over HTTP with `reqwest`.
///
/// `send` spawns the download on the current tokio runtime. Body bytes are
/// decoded as UTF-8 as they arrive; a code point split across chunks is held
/// back until its remaining bytes arrive.
pub struct HttpTransport {
    client: Client,
    config: HttpConfig,
    state: ReadyState,
    sent: bool,
    pending_headers: Vec<(HeaderName, HeaderValue)>,
    request: Option<reqwest::RequestBuilder>,
    url: Option<url::Url>,
    listener: Option<Box<dyn TransportListener>>,
    cancel_token: CancellationToken,
}

impl HttpTransport {
    /// Create a transport from settings
    pub fn new(config: HttpConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        let client = builder.build().map_err(TransportError::Network)?;
        Ok(Self::with_client(client, config))
    }

    /// Create a transport that shares an existing client
    pub fn with_client(client: Client, config: HttpConfig) -> Self {
        Self {
            client,
            config,
            state: ReadyState::Unsent,
            sent: false,
            pending_headers: Vec::new(),
            request: None,
            url: None,
            listener: None,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Readiness stage from the caller's side: `Unsent` or `Opened`.
    ///
    /// Later stages are only reported to the listener.
    pub fn ready_state(&self) -> ReadyState {
        self.state
    }

    /// Whether `send` has been called
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    fn invalid_state(&self, operation: &'static str) -> Error {
        TransportError::InvalidState {
            operation,
            state: self.state,
        }
        .into()
    }
}

impl Transport for HttpTransport {
    fn set_listener(&mut self, listener: Box<dyn TransportListener>) {
        self.listener = Some(listener);
    }

    fn set_request_header(&mut self, name: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::config("headers", format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::config("headers", format!("invalid value for {name}: {e}")))?;
        match self.request.take() {
            Some(request) => self.request = Some(request.header(name, value)),
            // Applied by `open`
            None => self.pending_headers.push((name, value)),
        }
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = Some(timeout);
    }

    fn open(&mut self, method: &str, url: &str) -> Result<()> {
        if self.state != ReadyState::Unsent {
            return Err(self.invalid_state("open"));
        }
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| Error::config("method", format!("unsupported method {method:?}")))?;
        let parsed = url::Url::parse(url).map_err(|source| TransportError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let mut request = self.client.request(method, parsed.clone());
        for (name, value) in std::mem::take(&mut self.pending_headers) {
            request = request.header(name, value);
        }
        self.request = Some(request);
        self.url = Some(parsed);
        self.state = ReadyState::Opened;

        if let Some(listener) = self.listener.as_mut() {
            listener.on_ready_state_change(Progress::new(ReadyState::Opened, ""));
        }
        Ok(())
    }

    fn send(&mut self, body: Option<Vec<u8>>) -> Result<()> {
        if self.state != ReadyState::Opened || self.sent {
            return Err(self.invalid_state("send"));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::Other(format!("HTTP transport needs a tokio runtime: {e}")))?;
        let (Some(mut request), Some(url)) = (self.request.take(), self.url.take()) else {
            return Err(self.invalid_state("send"));
        };
        if let Some(timeout) = self.config.timeout {
            request = request.timeout(timeout);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let listener = self.listener.take();
        let download = Download {
            url,
            error_for_status: self.config.error_for_status,
            listener,
            text: String::new(),
            pending: Vec::new(),
        };
        let cancel_token = self.cancel_token.clone();
        self.sent = true;

        runtime.spawn(async move {
            tokio::select! {
                _ = download.run(request) => {}
                _ = cancel_token.cancelled() => {
                    debug!("download aborted");
                }
            }
        });
        Ok(())
    }

    fn abort(&mut self) {
        self.cancel_token.cancel();
        self.listener = None;
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

struct Download {
    url: url::Url,
    error_for_status: bool,
    listener: Option<Box<dyn TransportListener>>,
    text: String,
    /// Trailing bytes of an incomplete UTF-8 sequence
    pending: Vec<u8>,
}

impl Download {
    async fn run(mut self, request: reqwest::RequestBuilder) {
        debug!(url = %self.url, "sending request");
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return self.fail(TransportError::Network(e)),
        };

        let status = response.status();
        debug!(url = %self.url, status = status.as_u16(), "response headers received");
        if self.error_for_status && !status.is_success() {
            let error = TransportError::Status {
                status: status.as_u16(),
                url: self.url.to_string(),
            };
            return self.fail(error);
        }
        self.notify_state(ReadyState::HeadersReceived);

        let mut body = response.bytes_stream();
        let mut loading = false;
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return self.fail(TransportError::Network(e)),
            };
            trace!(len = chunk.len(), "body chunk");
            self.decode(&chunk);

            if !loading {
                loading = true;
                self.notify_state(ReadyState::Loading);
            }
            self.notify_progress();

            if self.listener.as_ref().is_none_or(|l| l.is_closed()) {
                debug!(url = %self.url, "listener closed, stopping download");
                return;
            }
        }

        if !self.pending.is_empty() {
            warn!(
                bytes = self.pending.len(),
                "response ended inside a UTF-8 sequence"
            );
            self.text.push(char::REPLACEMENT_CHARACTER);
            self.pending.clear();
        }
        debug!(url = %self.url, bytes = self.text.len(), "response body complete");
        self.notify_state(ReadyState::Done);
    }

    fn decode(&mut self, chunk: &[u8]) {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(chunk);
        let mut input = buf.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    return;
                }
                Err(e) => {
                    let (valid, after) = input.split_at(e.valid_up_to());
                    if let Ok(valid) = std::str::from_utf8(valid) {
                        self.text.push_str(valid);
                    }
                    let Some(invalid) = e.error_len() else {
                        self.pending = after.to_vec();
                        return;
                    };
                    self.text.push(char::REPLACEMENT_CHARACTER);
                    input = &after[invalid..];
                }
            }
        }
    }

    fn notify_state(&mut self, state: ReadyState) {
        if let Some(listener) = self.listener.as_mut() {
            listener.on_ready_state_change(Progress::new(state, &self.text));
        }
    }

    fn notify_progress(&mut self) {
        if let Some(listener) = self.listener.as_mut() {
            listener.on_progress(Progress::new(ReadyState::Loading, &self.text));
        }
    }

    fn fail(mut self, error: TransportError) {
        warn!(url = %self.url, error = %error, "download failed");
        if let Some(mut listener) = self.listener.take() {
            listener.on_error(error);
        }
    }
}
