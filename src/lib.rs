//! # ndjson-stream
//!
//! Incremental decoding of newline-delimited JSON from progressively
//! downloaded responses.
//!
//! Records are produced as soon as each line is complete, without waiting
//! for the whole body:
//!
//! - [`LineCollator`] turns arbitrarily sized text fragments into batches of
//!   complete lines
//! - [`ChunkSource`] turns transport notifications into fragments of newly
//!   received text
//! - [`stream`] wires a [`Transport`] (by default [`HttpTransport`]) through
//!   both and parses each line with `serde_json`
//!
//! ## Quick Start
//!
//! ```no_run
//! use futures::StreamExt;
//! use ndjson_stream::{StreamOptions, stream};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut records =
//!         stream::<serde_json::Value>("https://example.com/events", StreamOptions::default())?;
//!
//!     while let Some(record) = records.next().await {
//!         println!("record: {}", record?);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Line collation
pub mod collate;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Push-stream primitive
pub mod observer;
/// NDJSON decoding pipeline
pub mod pipeline;
/// Fragment extraction from transport notifications
pub mod source;
/// Transport contract and HTTP implementation
pub mod transport;

pub use collate::{LineBatch, LineCollator, collate, collate_stream};
pub use config::{BeforeOpen, HttpConfig, RequestConfig, SourceOptions, StreamOptions, TransportFactory};
pub use error::{Error, Result, TransportError};
pub use observer::{Observer, Subscription};
pub use pipeline::{NdjsonStream, stream};
pub use source::ChunkSource;
pub use transport::{HttpTransport, Progress, ReadyState, Transport, TransportListener};
