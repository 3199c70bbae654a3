//! Fragment extraction from transport notifications.
//!
//! [`ChunkSource`] watches a growing response text through a byte cursor and
//! forwards only what is new, so each byte reaches the downstream observer
//! exactly once no matter how often or in which order the transport fires.

use crate::config::SourceOptions;
use crate::error::TransportError;
use crate::observer::Observer;
use crate::transport::{Progress, ReadyState, TransportListener};
use tracing::{debug, trace, warn};

/// Transport listener that emits newly received text as fragments
pub struct ChunkSource<O> {
    options: SourceOptions,
    characters_seen: usize,
    ends_with_newline: bool,
    finished: bool,
    downstream: O,
}

impl<O: Observer<String>> ChunkSource<O> {
    /// Create a source feeding `downstream`
    pub fn new(options: SourceOptions, downstream: O) -> Self {
        Self {
            options,
            characters_seen: 0,
            ends_with_newline: false,
            finished: false,
            downstream,
        }
    }

    /// Bytes of response text forwarded so far
    pub fn characters_seen(&self) -> usize {
        self.characters_seen
    }

    fn notified(&mut self, progress: Progress<'_>) {
        if self.finished {
            return;
        }

        let text = progress.response_text;
        if progress.ready_state.is_receiving_body() && text.len() > self.characters_seen {
            match text.get(self.characters_seen..) {
                Some(fragment) => {
                    trace!(
                        offset = self.characters_seen,
                        len = fragment.len(),
                        "forwarding fragment"
                    );
                    self.ends_with_newline = fragment.ends_with('\n');
                    self.characters_seen = text.len();
                    self.downstream.next(fragment.to_string());
                }
                None => warn!(
                    offset = self.characters_seen,
                    "response text cursor is not on a character boundary, ignoring notification"
                ),
            }
        } else if text.len() < self.characters_seen {
            warn!(
                seen = self.characters_seen,
                len = text.len(),
                "response text shrank, ignoring notification"
            );
        }

        if progress.ready_state == ReadyState::Done {
            if self.options.end_with_newline && !self.ends_with_newline {
                debug!("response did not end with a newline, appending one");
                self.downstream.next("\n".to_string());
            }
            self.finished = true;
            debug!(bytes = self.characters_seen, "response complete");
            self.downstream.complete();
        }
    }
}

impl<O: Observer<String>> TransportListener for ChunkSource<O> {
    fn on_ready_state_change(&mut self, progress: Progress<'_>) {
        self.notified(progress);
    }

    fn on_progress(&mut self, progress: Progress<'_>) {
        self.notified(progress);
    }

    fn on_error(&mut self, error: TransportError) {
        if self.finished {
            return;
        }
        self.finished = true;
        debug!(error = %error, "transport failed");
        self.downstream.error(error.into());
    }

    fn is_closed(&self) -> bool {
        self.finished || self.downstream.is_closed()
    }
}
