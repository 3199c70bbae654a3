//! Push-side stream primitive.
//!
//! An [`Observer`] receives zero or more values followed by at most one
//! terminal signal (error or completion). Pipeline stages are observers that
//! forward to a downstream observer.

use crate::error::{Error, Result};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Receiver of a push stream
pub trait Observer<T>: Send {
    /// Deliver one value
    fn next(&mut self, value: T);

    /// Terminate the stream with an error
    fn error(&mut self, error: Error);

    /// Terminate the stream normally
    fn complete(&mut self);

    /// Whether the consumer has gone away.
    ///
    /// Upstream stages check this to stop producing early.
    fn is_closed(&self) -> bool {
        false
    }
}

impl<T, O: Observer<T> + ?Sized> Observer<T> for Box<O> {
    fn next(&mut self, value: T) {
        (**self).next(value);
    }

    fn error(&mut self, error: Error) {
        (**self).error(error);
    }

    fn complete(&mut self) {
        (**self).complete();
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

/// Observer end of a [`Subscription`] channel.
///
/// Drops its sender on the first terminal signal, so the matching stream
/// ends right after an error.
pub struct ChannelObserver<T> {
    tx: Option<mpsc::UnboundedSender<Result<T>>>,
}

impl<T: Send> Observer<T> for ChannelObserver<T> {
    fn next(&mut self, value: T) {
        if let Some(tx) = &self.tx
            && tx.send(Ok(value)).is_err()
        {
            tracing::trace!("subscriber dropped, discarding value");
            self.tx = None;
        }
    }

    fn error(&mut self, error: Error) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(error));
        }
    }

    fn complete(&mut self) {
        self.tx = None;
    }

    fn is_closed(&self) -> bool {
        self.tx.as_ref().is_none_or(|tx| tx.is_closed())
    }
}

/// Pull side of a push stream: yields `Ok` values, then at most one `Err`
pub struct Subscription<T> {
    inner: UnboundedReceiverStream<Result<T>>,
}

impl<T> Stream for Subscription<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Create a connected observer/stream pair
pub fn channel<T>() -> (ChannelObserver<T>, Subscription<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ChannelObserver { tx: Some(tx) },
        Subscription {
            inner: UnboundedReceiverStream::new(rx),
        },
    )
}
