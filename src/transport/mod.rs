//! Progressive-download transport contract.
//!
//! A transport owns the request and a monotonically growing response text.
//! It reports readiness changes and download progress to exactly one
//! [`TransportListener`], installed with [`Transport::set_listener`]. Every
//! notification carries a [`Progress`] snapshot so listeners never need to
//! reach back into the transport.

mod http;

pub use http::HttpTransport;

use crate::error::{Result, TransportError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Readiness stage of a transport, ordered by progress
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    /// Created, `open` not yet called
    Unsent,
    /// `open` called
    Opened,
    /// Response headers are available
    HeadersReceived,
    /// Body bytes are arriving
    Loading,
    /// The response is complete
    Done,
}

impl ReadyState {
    /// Whether response text may be read at this stage
    pub fn is_receiving_body(self) -> bool {
        self >= ReadyState::Loading
    }
}

impl std::fmt::Display for ReadyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReadyState::Unsent => "unsent",
            ReadyState::Opened => "opened",
            ReadyState::HeadersReceived => "headers_received",
            ReadyState::Loading => "loading",
            ReadyState::Done => "done",
        };
        f.write_str(s)
    }
}

/// Snapshot of a transport at the moment it fires a notification
#[derive(Clone, Copy, Debug)]
pub struct Progress<'a> {
    /// Current readiness stage
    pub ready_state: ReadyState,
    /// Everything received so far
    pub response_text: &'a str,
}

impl<'a> Progress<'a> {
    /// Create a new snapshot
    pub fn new(ready_state: ReadyState, response_text: &'a str) -> Self {
        Self {
            ready_state,
            response_text,
        }
    }
}

/// Receiver of transport notifications
pub trait TransportListener: Send {
    /// The readiness stage changed
    fn on_ready_state_change(&mut self, progress: Progress<'_>);

    /// More of the body arrived
    fn on_progress(&mut self, progress: Progress<'_>);

    /// The transport failed; no further notifications follow
    fn on_error(&mut self, error: TransportError);

    /// Whether the listener has stopped accepting notifications.
    ///
    /// Transports may use this to stop downloading early.
    fn is_closed(&self) -> bool {
        false
    }
}

/// A progressive-download request
pub trait Transport: Send {
    /// Install the listener for this request, replacing any previous one
    fn set_listener(&mut self, listener: Box<dyn TransportListener>);

    /// Add a header to the outgoing request
    fn set_request_header(&mut self, name: &str, value: &str) -> Result<()>;

    /// Limit the total duration of the request
    fn set_timeout(&mut self, timeout: Duration);

    /// Prepare a request; called once
    fn open(&mut self, method: &str, url: &str) -> Result<()>;

    /// Start the request; called once, after `open`
    fn send(&mut self, body: Option<Vec<u8>>) -> Result<()>;

    /// Stop the request; later notifications are suppressed
    fn abort(&mut self) {}
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_states_are_ordered() {
        assert!(ReadyState::Unsent < ReadyState::Opened);
        assert!(ReadyState::Opened < ReadyState::HeadersReceived);
        assert!(ReadyState::HeadersReceived < ReadyState::Loading);
        assert!(ReadyState::Loading < ReadyState::Done);
    }

    #[test]
    fn only_loading_and_done_receive_body() {
        assert!(!ReadyState::Unsent.is_receiving_body());
        assert!(!ReadyState::Opened.is_receiving_body());
        assert!(!ReadyState::HeadersReceived.is_receiving_body());
        assert!(ReadyState::Loading.is_receiving_body());
        assert!(ReadyState::Done.is_receiving_body());
    }

    #[test]
    fn ready_state_serializes_snake_case() {
        let json = serde_json::to_string(&ReadyState::HeadersReceived).unwrap();
        assert_eq!(json, "\"headers_received\"");
        assert_eq!(ReadyState::HeadersReceived.to_string(), "headers_received");
    }
}
