//! Scriptable in-memory transport

use ndjson_stream::{
    Progress, ReadyState, RequestConfig, Result, StreamOptions, Transport, TransportError,
    TransportListener,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Calls made on the transport, plus anything a test hook records
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Factory { url: String, method: String },
    Header(String, String),
    Timeout(Duration),
    Open { method: String, url: String },
    Send(Option<Vec<u8>>),
    Abort,
    Hook(&'static str),
}

#[derive(Default)]
struct Inner {
    listener: Option<Box<dyn TransportListener>>,
    state: Option<ReadyState>,
    text: String,
    calls: Vec<Call>,
}

/// Transport whose notifications are fired by the test.
///
/// Clones share state, so the test keeps one handle while the pipeline owns
/// another.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that make the pipeline use this transport
    pub fn options(&self) -> StreamOptions {
        let handle = self.clone();
        StreamOptions::default().with_transport_factory(move |url: &str, request: &RequestConfig| {
            handle.record(Call::Factory {
                url: url.to_string(),
                method: request.method.clone(),
            });
            Ok(Box::new(handle) as Box<dyn Transport>)
        })
    }

    pub fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn has_listener(&self) -> bool {
        self.inner.lock().unwrap().listener.is_some()
    }

    /// Change stage and fire a readiness notification
    pub fn set_ready_state(&self, state: ReadyState) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = Some(state);
        let Inner { listener, text, .. } = &mut *inner;
        if let Some(listener) = listener {
            listener.on_ready_state_change(Progress::new(state, text));
        }
    }

    /// Append body text and fire a progress notification
    pub fn receive(&self, more: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.text.push_str(more);
        let state = inner.state.unwrap_or(ReadyState::Loading);
        let Inner { listener, text, .. } = &mut *inner;
        if let Some(listener) = listener {
            listener.on_progress(Progress::new(state, text));
        }
    }

    /// Fire a transport failure
    pub fn fail(&self, message: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(listener) = inner.listener.as_mut() {
            listener.on_error(TransportError::Other(message.to_string()));
        }
    }
}

impl Transport for MockTransport {
    fn set_listener(&mut self, listener: Box<dyn TransportListener>) {
        self.inner.lock().unwrap().listener = Some(listener);
    }

    fn set_request_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.record(Call::Header(name.to_string(), value.to_string()));
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.record(Call::Timeout(timeout));
    }

    fn open(&mut self, method: &str, url: &str) -> Result<()> {
        self.record(Call::Open {
            method: method.to_string(),
            url: url.to_string(),
        });
        self.set_ready_state(ReadyState::Opened);
        Ok(())
    }

    fn send(&mut self, body: Option<Vec<u8>>) -> Result<()> {
        self.record(Call::Send(body));
        Ok(())
    }

    fn abort(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Abort);
        inner.listener = None;
    }
}

/// Listener that records every notification it receives
#[derive(Clone, Default)]
pub struct RecordingListener {
    entries: Arc<Mutex<Vec<String>>>,
    text: Arc<Mutex<String>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Response text from the latest notification
    pub fn text(&self) -> String {
        self.text.lock().unwrap().clone()
    }

    /// Wait until `entry` has been recorded, giving up after `limit`
    pub async fn wait_for(&self, entry: &str, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while tokio::time::Instant::now() < deadline {
            if self.entries().iter().any(|e| e == entry) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    fn push(&self, entry: String, progress: Option<Progress<'_>>) {
        self.entries.lock().unwrap().push(entry);
        if let Some(progress) = progress {
            *self.text.lock().unwrap() = progress.response_text.to_string();
        }
    }
}

impl TransportListener for RecordingListener {
    fn on_ready_state_change(&mut self, progress: Progress<'_>) {
        self.push(format!("state {}", progress.ready_state), Some(progress));
    }

    fn on_progress(&mut self, progress: Progress<'_>) {
        self.push(
            format!("progress {}", progress.response_text.len()),
            Some(progress),
        );
    }

    fn on_error(&mut self, error: TransportError) {
        self.push(format!("error {}", error.error_code()), None);
    }
}
