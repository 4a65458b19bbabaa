//! Streaming WARC parser
//!
//! Reads records one at a time from a (possibly compressed) byte stream. Only
//! the record currently being read is held in memory.

use std::io::{self, BufRead, BufReader, Read};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::factory::{DefaultRecordFactory, FactoryProvider, RecordFactory};
use super::log::ParseLog;
use super::record::{Headers, Record, RecordKind, HEADER_CONTENT_LENGTH, HEADER_TYPE};
use crate::compression::{Decompressor, GzipDecompressor};
use crate::transport::ByteStream;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Upper bound on what a single Content-Length may preallocate
const MAX_PREALLOCATION: u64 = 16 * 1024 * 1024;

/// Errors raised while parsing records
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Expected a WARC version line, found: {0}")]
    UnexpectedChunk(String),
    #[error("Malformed header line: {0}")]
    MalformedHeader(String),
    #[error("Record has no Content-Length header")]
    MissingContentLength,
    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),
    #[error("Parsing cancelled")]
    Cancelled,
}

/// Lazy sequence of parsed records
pub type RecordStream<R> = Box<dyn Iterator<Item = Result<R, ParseError>> + Send>;

/// Turns a segment byte stream into records
pub trait RecordParser: Send + Sync {
    type Record: Send + 'static;

    /// Parse `stream` lazily.
    ///
    /// The first `byte_offset` raw bytes are discarded before decompression.
    /// Recoverable problems go to `log`; without one they end the sequence.
    fn parse(
        &self,
        stream: ByteStream,
        is_compressed: bool,
        log: Option<Arc<dyn ParseLog>>,
        byte_offset: u64,
        cancel: CancellationToken,
    ) -> RecordStream<Self::Record>;
}

/// WARC 1.0/1.1 parser
#[derive(Clone)]
pub struct WarcParser {
    decompressor: Arc<dyn Decompressor>,
    factory: FactoryProvider,
}

impl Default for WarcParser {
    fn default() -> Self {
        Self::new()
    }
}

impl WarcParser {
    /// Parser for gzip-compressed segments building plain records
    pub fn new() -> Self {
        Self {
            decompressor: Arc::new(GzipDecompressor),
            factory: DefaultRecordFactory::provider(),
        }
    }

    /// Set the codec applied to compressed streams
    pub fn with_decompressor(mut self, decompressor: Arc<dyn Decompressor>) -> Self {
        self.decompressor = decompressor;
        self
    }

    /// Set how the per-pass record factory is created
    pub fn with_factory(mut self, factory: FactoryProvider) -> Self {
        self.factory = factory;
        self
    }
}

impl RecordParser for WarcParser {
    type Record = Record;

    fn parse(
        &self,
        stream: ByteStream,
        is_compressed: bool,
        log: Option<Arc<dyn ParseLog>>,
        byte_offset: u64,
        cancel: CancellationToken,
    ) -> RecordStream<Record> {
        Box::new(WarcRecords {
            pending: Some(PendingStream {
                stream,
                is_compressed,
                byte_offset,
            }),
            reader: None,
            decompressor: self.decompressor.clone(),
            factory: (self.factory)(),
            log,
            cancel,
            next_version: None,
            finished: false,
        })
    }
}

/// Raw stream not yet positioned or decompressed
struct PendingStream {
    stream: ByteStream,
    is_compressed: bool,
    byte_offset: u64,
}

struct LineReader {
    inner: BufReader<ByteStream>,
    buf: Vec<u8>,
}

impl LineReader {
    /// Next line without its terminator, `None` at EOF
    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.inner.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }

    /// Discard lines up to the next version line that follows a blank line.
    ///
    /// Used when a record's body length is unknown. Returns the version line,
    /// or `None` at EOF.
    fn skip_to_next_record(&mut self) -> io::Result<Option<String>> {
        let mut after_blank = false;
        while let Some(line) = self.read_line()? {
            if after_blank && line.starts_with("WARC/") {
                return Ok(Some(line));
            }
            after_blank = line.trim().is_empty();
        }
        Ok(None)
    }

    fn read_body(&mut self, length: u64) -> io::Result<Vec<u8>> {
        let mut content = Vec::with_capacity(length.min(MAX_PREALLOCATION) as usize);
        let read = (&mut self.inner).take(length).read_to_end(&mut content)? as u64;
        if read < length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("truncated record body: expected {} bytes, got {}", length, read),
            ));
        }
        Ok(content)
    }
}

/// Iterator over the records of one parse pass
struct WarcRecords {
    pending: Option<PendingStream>,
    reader: Option<LineReader>,
    decompressor: Arc<dyn Decompressor>,
    factory: Box<dyn RecordFactory>,
    log: Option<Arc<dyn ParseLog>>,
    cancel: CancellationToken,
    /// Version line already consumed while resyncing
    next_version: Option<String>,
    finished: bool,
}

impl WarcRecords {
    fn ensure_open(&mut self) -> Result<(), ParseError> {
        if let Some(pending) = self.pending.take() {
            let mut raw = pending.stream;
            if pending.byte_offset > 0 {
                let skipped = io::copy(&mut (&mut raw).take(pending.byte_offset), &mut io::sink())?;
                tracing::debug!("Discarded {} leading bytes", skipped);
            }
            let stream = if pending.is_compressed {
                self.decompressor.decompress(raw)
            } else {
                raw
            };
            self.reader = Some(LineReader {
                inner: BufReader::with_capacity(READ_BUFFER_SIZE, stream),
                buf: Vec::with_capacity(1024),
            });
        }
        Ok(())
    }

    fn read_record(&mut self) -> Result<Option<Record>, ParseError> {
        self.ensure_open()?;
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(None),
        };

        loop {
            if self.cancel.is_cancelled() {
                return Err(ParseError::Cancelled);
            }

            let version = loop {
                if let Some(line) = self.next_version.take() {
                    break line;
                }
                let line = match reader.read_line()? {
                    Some(line) => line,
                    None => return Ok(None),
                };
                if line.trim().is_empty() {
                    continue;
                }
                if line.starts_with("WARC/") {
                    break line;
                }
                skip_chunk(&self.log, line)?;
            };

            let mut headers = Headers::new();
            let mut malformed: Option<String> = None;
            loop {
                let line = reader.read_line()?.ok_or_else(|| {
                    io::Error::new(io::ErrorKind::UnexpectedEof, "truncated header block")
                })?;
                if line.trim().is_empty() {
                    break;
                }
                if line.starts_with(|c: char| c == ' ' || c == '\t') && headers.extend_last(&line) {
                    continue;
                }
                let field = line
                    .split_once(':')
                    .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                    .filter(|(name, _)| !name.is_empty());
                match field {
                    Some((name, value)) => headers.push(name, value),
                    None => {
                        malformed.get_or_insert(line);
                    }
                }
            }

            let length = match headers.get(HEADER_CONTENT_LENGTH) {
                Some(value) => value
                    .parse::<u64>()
                    .map_err(|_| ParseError::InvalidContentLength(value.to_string())),
                None => Err(ParseError::MissingContentLength),
            };
            let length = match length {
                Ok(length) => length,
                Err(e) => {
                    // Body lines up to the next record boundary are dropped unreported
                    report(&self.log, e)?;
                    match reader.skip_to_next_record()? {
                        Some(line) => self.next_version = Some(line),
                        None => return Ok(None),
                    }
                    continue;
                }
            };

            let content = reader.read_body(length)?;
            if let Some(line) = malformed {
                report(&self.log, ParseError::MalformedHeader(line))?;
                continue;
            }

            let kind = RecordKind::parse(headers.get(HEADER_TYPE).unwrap_or_default());
            return Ok(Some(self.factory.create_record(version, kind, headers, content)));
        }
    }
}

fn skip_chunk(log: &Option<Arc<dyn ParseLog>>, chunk: String) -> Result<(), ParseError> {
    match log {
        Some(log) => {
            log.chunk_skipped(&chunk);
            Ok(())
        }
        None => Err(ParseError::UnexpectedChunk(chunk)),
    }
}

fn report(log: &Option<Arc<dyn ParseLog>>, error: ParseError) -> Result<(), ParseError> {
    match log {
        Some(log) => {
            log.error_encountered(&error.to_string());
            Ok(())
        }
        None => Err(error),
    }
}

impl Iterator for WarcRecords {
    type Item = Result<Record, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                self.reader = None;
                None
            }
            Err(e) => {
                self.finished = true;
                self.reader = None;
                Some(Err(e))
            }
        }
    }
}
