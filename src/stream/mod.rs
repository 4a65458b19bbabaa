//! Resumable streaming over a segment list
//!
//! A dataset is a compressed index file listing many compressed segments, each
//! holding an ordered sequence of records. This module walks the whole dataset
//! one segment at a time and can restart at any `(segment, record)` position,
//! or at any position of the flattened item space derived from the records.
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use crawlstream::stream::{DatasetStreamer, ItemExtractor};
//! use crawlstream::transport::{HttpTransport, TransportConfig};
//! use crawlstream::warc::WarcParser;
//! use crawlstream::wat::{WatRecordFactory, WatUrlExtraction};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let hostname = "data.commoncrawl.org";
//! let transport = Arc::new(HttpTransport::new(TransportConfig::default())?);
//! let parser = WarcParser::new().with_factory(WatRecordFactory::provider(hostname));
//! let streamer = DatasetStreamer::new(transport, parser);
//!
//! // Resume at the 3rd URL of segment 12
//! let extractor = ItemExtractor::new(streamer, WatUrlExtraction::new());
//! for item in extractor.extract(hostname, "/crawl-data/CC-MAIN-2021-43/wat.paths.gz", 12, 0, 2)? {
//!     println!("{}", item?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         ItemExtractor                         │
//! │          (entry offset, flattening, ItemExtraction)           │
//! └───────────────────────────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        DatasetStreamer                        │
//! │        (segment + record offsets, one segment at a time)      │
//! └───────────────────────────────────────────────────────────────┘
//!          │                      │                      │
//!          ▼                      ▼                      ▼
//! ┌─────────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │  SegmentIndex   │   │    Transport     │   │   RecordParser   │
//! │ - index fetch   │   │ - one GET/call   │   │ - WARC records   │
//! │ - line → URL    │   │ - no retries     │   │ - ParseLog sink  │
//! └─────────────────┘   └──────────────────┘   └──────────────────┘
//! ```

mod checkpoint;
mod extractor;
mod index;
mod streamer;

pub use checkpoint::{Checkpoint, CheckpointError, RunMode};
pub use extractor::{ExtractedItems, ItemExtraction, ItemExtractor};
pub use index::SegmentIndex;
pub use streamer::{DatasetStreamer, SegmentRecords};

use std::io;
use thiserror::Error;

use crate::transport::TransportError;
use crate::warc::ParseError;

/// Errors that terminate a stream
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Invalid segment offset {offset}: the segment list has {available} entries")]
    InvalidSegmentOffset { offset: u64, available: u64 },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error: {0}")]
    Parse(ParseError),

    #[error("Stream cancelled")]
    Cancelled,
}

impl From<ParseError> for StreamError {
    fn from(error: ParseError) -> Self {
        match error {
            ParseError::Cancelled => StreamError::Cancelled,
            ParseError::Io(e) => StreamError::Io(e),
            other => StreamError::Parse(other),
        }
    }
}
