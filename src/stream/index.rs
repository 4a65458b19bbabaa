//! Segment list access

use std::io::{BufRead, BufReader};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::StreamError;
use crate::compression::Decompressor;
use crate::transport::{ByteStream, Transport};
use crate::types::{IndexedValue, SegmentPosition};

/// Forward-only view of the segment list, starting at a resume offset.
///
/// Yields one absolute segment URL per index line, tagged with the line's
/// absolute position in the file. The anchor line is resolved when the index
/// is opened, so an offset past the end fails there and not while iterating.
pub struct SegmentIndex {
    reader: Option<BufReader<ByteStream>>,
    hostname: String,
    anchor: Option<IndexedValue<String>>,
    next_position: SegmentPosition,
    line: Vec<u8>,
    cancel: CancellationToken,
}

impl SegmentIndex {
    /// URL of the index file. The hostname is lowercased here but not in segment URLs.
    pub fn index_url(hostname: &str, index_path: &str) -> String {
        format!("https://{}{}", hostname.to_lowercase(), index_path)
    }

    /// URL of the segment named by an index line
    pub fn segment_url(hostname: &str, line: &str) -> String {
        if Url::parse(line).is_ok() {
            line.to_string()
        } else {
            format!("https://{}/{}", hostname, line)
        }
    }

    /// Fetch the index and position it on line `segment_offset`
    pub fn open(
        transport: &dyn Transport,
        decompressor: &dyn Decompressor,
        hostname: &str,
        index_path: &str,
        segment_offset: SegmentPosition,
        cancel: CancellationToken,
    ) -> Result<Self, StreamError> {
        if cancel.is_cancelled() {
            return Err(StreamError::Cancelled);
        }

        let url = Self::index_url(hostname, index_path);
        tracing::info!("Opening segment list {}", url);
        let stream = decompressor.decompress(transport.get(&url)?);

        let mut index = Self {
            reader: Some(BufReader::new(stream)),
            hostname: hostname.to_string(),
            anchor: None,
            next_position: 0,
            line: Vec::with_capacity(256),
            cancel,
        };

        for _ in 0..segment_offset {
            if index.read_line()?.is_none() {
                return Err(StreamError::InvalidSegmentOffset {
                    offset: segment_offset,
                    available: index.next_position,
                });
            }
        }

        match index.read_line()? {
            Some(anchor) => index.anchor = Some(anchor),
            None if segment_offset > 0 => {
                return Err(StreamError::InvalidSegmentOffset {
                    offset: segment_offset,
                    available: index.next_position,
                })
            }
            None => tracing::debug!("Segment list {} is empty", url),
        }

        if segment_offset > 0 {
            tracing::debug!("Skipped {} segments", segment_offset);
        }
        Ok(index)
    }

    /// Drop the index stream. Later calls to `next` yield nothing.
    pub fn close(&mut self) {
        self.reader = None;
        self.anchor = None;
    }

    /// Whether the index stream is still open
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    fn read_line(&mut self) -> Result<Option<IndexedValue<String>>, StreamError> {
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(None),
        };
        if self.cancel.is_cancelled() {
            self.reader = None;
            return Err(StreamError::Cancelled);
        }

        self.line.clear();
        if reader.read_until(b'\n', &mut self.line)? == 0 {
            self.reader = None;
            return Ok(None);
        }
        while matches!(self.line.last(), Some(b'\n' | b'\r')) {
            self.line.pop();
        }

        let line = String::from_utf8_lossy(&self.line);
        let position = self.next_position;
        self.next_position += 1;
        Ok(Some(IndexedValue::new(
            position,
            Self::segment_url(&self.hostname, &line),
        )))
    }
}

impl Iterator for SegmentIndex {
    type Item = Result<IndexedValue<String>, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(anchor) = self.anchor.take() {
            return Some(Ok(anchor));
        }
        match self.read_line() {
            Ok(Some(segment)) => Some(Ok(segment)),
            Ok(None) => None,
            Err(e) => {
                self.reader = None;
                Some(Err(e))
            }
        }
    }
}
