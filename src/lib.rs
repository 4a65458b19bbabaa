//! crawlstream: resumable streaming over Common Crawl style datasets
//!
//! A dataset is a compressed segment list pointing at many large compressed
//! segments of WARC records. This crate provides:
//! - Lazy, one-segment-at-a-time record streaming with `(segment, record)` resume offsets
//! - Flattening of records into derived items with a third, item-level resume offset
//! - A streaming WARC parser with pluggable record construction and a parse-problem sink
//! - WAT URL extraction (page, link, stylesheet and script URLs)
//! - JSON checkpoints for long runs

pub mod compression;
pub mod config;
pub mod stream;
pub mod transport;
pub mod types;
pub mod warc;
pub mod wat;

pub use config::Config;
pub use stream::{DatasetStreamer, ItemExtraction, ItemExtractor, SegmentIndex, StreamError};
pub use types::*;
