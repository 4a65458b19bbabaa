//! WARC record parsing
//!
//! Segments are parsed lazily into [`Record`]s. Each parse pass creates its own
//! [`RecordFactory`], and recoverable problems are routed to an optional
//! [`ParseLog`].

mod factory;
mod log;
mod parser;
mod record;

pub use factory::{DefaultRecordFactory, FactoryProvider, RecordFactory};
pub use log::{ParseLog, RecordingParseLog, TracingParseLog};
pub use parser::{ParseError, RecordParser, RecordStream, WarcParser};
pub use record::{
    Headers, Record, RecordKind, HEADER_CONTENT_LENGTH, HEADER_CONTENT_TYPE, HEADER_DATE,
    HEADER_RECORD_ID, HEADER_TARGET_URI, HEADER_TYPE,
};
