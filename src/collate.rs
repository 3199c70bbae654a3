//! Line collation: text fragments in, batches of complete lines out.
//!
//! Only text followed by a newline is ever emitted. Whatever trails the last
//! newline is held until a later fragment terminates it; if none does, it is
//! never emitted, so input must be newline-terminated to be fully decoded.
//! Empty lines are dropped. The held tail has no size bound.

use crate::error::Error;
use crate::observer::Observer;
use futures::{Stream, StreamExt, future};
use std::ops::Deref;

/// Complete lines extracted in one collation step, in input order.
///
/// Never empty and never contains an empty line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineBatch(Vec<String>);

impl LineBatch {
    /// Consume the batch, returning its lines
    pub fn into_lines(self) -> Vec<String> {
        self.0
    }
}

impl Deref for LineBatch {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl IntoIterator for LineBatch {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl PartialEq<Vec<&str>> for LineBatch {
    fn eq(&self, other: &Vec<&str>) -> bool {
        self.0.len() == other.len() && self.0.iter().zip(other).all(|(a, b)| a == b)
    }
}

/// Stateful fold over fragments
#[derive(Debug, Default)]
pub struct LineCollator {
    /// Text after the last newline seen; never contains `'\n'`
    buffer: String,
}

impl LineCollator {
    /// Create a collator with an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment, returning the lines it completed, if any
    pub fn push(&mut self, fragment: &str) -> Option<LineBatch> {
        let Some(index) = fragment.rfind('\n') else {
            self.buffer.push_str(fragment);
            return None;
        };

        let mut finished = std::mem::replace(&mut self.buffer, fragment[index + 1..].to_string());
        finished.push_str(&fragment[..=index]);

        let lines: Vec<String> = finished
            .split('\n')
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        (!lines.is_empty()).then_some(LineBatch(lines))
    }

    /// The unterminated tail currently held
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

/// Iterator adapter returned by [`collate`]
pub struct Collate<I> {
    fragments: I,
    collator: LineCollator,
}

impl<I> Iterator for Collate<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = LineBatch;

    fn next(&mut self) -> Option<LineBatch> {
        for fragment in self.fragments.by_ref() {
            if let Some(batch) = self.collator.push(fragment.as_ref()) {
                return Some(batch);
            }
        }
        None
    }
}

/// Collate an iterator of fragments into line batches
pub fn collate<I>(fragments: I) -> Collate<I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    Collate {
        fragments: fragments.into_iter(),
        collator: LineCollator::new(),
    }
}

/// Collate a fallible stream of fragments; upstream errors pass through
pub fn collate_stream<S, F, E>(fragments: S) -> impl Stream<Item = Result<LineBatch, E>>
where
    S: Stream<Item = Result<F, E>>,
    F: AsRef<str>,
{
    let mut collator = LineCollator::new();
    fragments.filter_map(move |item| {
        future::ready(match item {
            Ok(fragment) => collator.push(fragment.as_ref()).map(Ok),
            Err(e) => Some(Err(e)),
        })
    })
}

/// Pipeline stage that collates fragments and forwards line batches
pub struct CollateObserver<O> {
    collator: LineCollator,
    downstream: O,
}

impl<O: Observer<LineBatch>> CollateObserver<O> {
    /// Wrap a downstream batch observer
    pub fn new(downstream: O) -> Self {
        Self {
            collator: LineCollator::new(),
            downstream,
        }
    }
}

impl<O: Observer<LineBatch>> Observer<String> for CollateObserver<O> {
    fn next(&mut self, fragment: String) {
        if let Some(batch) = self.collator.push(&fragment) {
            tracing::trace!(lines = batch.len(), "collated line batch");
            self.downstream.next(batch);
        }
    }

    fn error(&mut self, error: Error) {
        self.downstream.error(error);
    }

    fn complete(&mut self) {
        if !self.collator.pending().is_empty() {
            tracing::debug!(
                dropped_bytes = self.collator.pending().len(),
                "stream ended with an unterminated line"
            );
        }
        self.downstream.complete();
    }

    fn is_closed(&self) -> bool {
        self.downstream.is_closed()
    }
}
