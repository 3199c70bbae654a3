//! NDJSON decoding pipeline.
//!
//! Composition, upstream first:
//!
//! ```text
//! transport -> ChunkSource -> CollateObserver -> DecodeObserver -> consumer
//! ```
//!
//! The source always appends a final newline when the response lacks one, so
//! the last record is decoded even if the server omits its terminator.

use crate::collate::{CollateObserver, LineBatch};
use crate::config::{HttpConfig, SourceOptions, StreamOptions};
use crate::error::{Error, Result};
use crate::observer::{self, Observer, Subscription};
use crate::source::ChunkSource;
use crate::transport::{HttpTransport, Transport};
use futures::Stream;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, warn};

/// Pipeline stage that flattens line batches and parses each line.
///
/// The first line that fails to parse terminates the stream; records already
/// delivered stay delivered.
pub struct DecodeObserver<T, O> {
    downstream: O,
    failed: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T, O> DecodeObserver<T, O>
where
    T: DeserializeOwned,
    O: Observer<T>,
{
    /// Wrap a downstream record observer
    pub fn new(downstream: O) -> Self {
        Self {
            downstream,
            failed: false,
            _record: PhantomData,
        }
    }
}

impl<T, O> Observer<LineBatch> for DecodeObserver<T, O>
where
    T: DeserializeOwned,
    O: Observer<T>,
{
    fn next(&mut self, batch: LineBatch) {
        if self.failed {
            return;
        }
        for line in batch {
            match serde_json::from_str::<T>(&line) {
                Ok(record) => self.downstream.next(record),
                Err(source) => {
                    warn!(error = %source, "malformed NDJSON line, stopping");
                    self.failed = true;
                    self.downstream.error(Error::Parse { line, source });
                    return;
                }
            }
        }
    }

    fn error(&mut self, error: Error) {
        if !self.failed {
            self.failed = true;
            self.downstream.error(error);
        }
    }

    fn complete(&mut self) {
        if !self.failed {
            self.downstream.complete();
        }
    }

    fn is_closed(&self) -> bool {
        self.failed || self.downstream.is_closed()
    }
}

/// The full listener chain delivering records of type `T` to `downstream`
pub type NdjsonListener<T, O> = ChunkSource<CollateObserver<DecodeObserver<T, O>>>;

/// Build the listener chain for a transport, feeding decoded records to
/// `downstream`
pub fn listener<T, O>(downstream: O) -> NdjsonListener<T, O>
where
    T: DeserializeOwned,
    O: Observer<T>,
{
    let options = SourceOptions {
        end_with_newline: true,
    };
    ChunkSource::new(
        options,
        CollateObserver::new(DecodeObserver::new(downstream)),
    )
}

/// Records decoded from one response, in byte order.
///
/// Yields `Ok` records and then at most one `Err`. Dropping the stream aborts
/// the underlying transport.
pub struct NdjsonStream<T> {
    records: Subscription<T>,
    transport: Box<dyn Transport>,
}

impl<T> Stream for NdjsonStream<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.records).poll_next(cx)
    }
}

impl<T> Drop for NdjsonStream<T> {
    fn drop(&mut self) {
        self.transport.abort();
    }
}

/// Download NDJSON from `url`, yielding one `T` per line.
///
/// The request is built and sent before this returns. Without a
/// `transport_factory` an [`HttpTransport`] is used, which must be driven by
/// a tokio runtime.
pub fn stream<T>(url: &str, options: StreamOptions) -> Result<NdjsonStream<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    let StreamOptions {
        request,
        transport_factory,
        before_open,
    } = options;

    let mut transport = match transport_factory {
        Some(factory) => factory(url, &request)?,
        None => Box::new(HttpTransport::new(HttpConfig::default())?),
    };

    let (observer, records) = observer::channel::<T>();
    transport.set_listener(Box::new(listener::<T, _>(observer)));

    for (name, value) in &request.headers {
        transport.set_request_header(name, value)?;
    }
    if let Some(hook) = before_open {
        hook(transport.as_mut())?;
    }

    transport.open(&request.method, url)?;
    transport.send(request.post_data)?;
    debug!(url, method = %request.method, "NDJSON request sent");

    Ok(NdjsonStream { records, transport })
}
