//! Flattening records into a resumable item sequence

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::streamer::{DatasetStreamer, SegmentRecords};
use super::StreamError;
use crate::types::{clamp_offset, EntryPosition, ExtractedItem, ResumePoint};
use crate::warc::RecordParser;

/// Derives zero or more items from one record
pub trait ItemExtraction<R>: Send + Sync {
    fn extract(&self, record: &R) -> Box<dyn Iterator<Item = String> + Send>;
}

impl<R, F, I> ItemExtraction<R> for F
where
    F: Fn(&R) -> I + Send + Sync,
    I: IntoIterator<Item = String>,
    I::IntoIter: Send + 'static,
{
    fn extract(&self, record: &R) -> Box<dyn Iterator<Item = String> + Send> {
        Box::new(self(record).into_iter())
    }
}

/// Streams the items derived from every record of a dataset.
///
/// Items are numbered across the whole run, so an entry offset can cut into
/// the middle of a record's items.
pub struct ItemExtractor<P: RecordParser, X> {
    streamer: DatasetStreamer<P>,
    extraction: Arc<X>,
}

impl<P, X> ItemExtractor<P, X>
where
    P: RecordParser,
    X: ItemExtraction<P::Record>,
{
    pub fn new(streamer: DatasetStreamer<P>, extraction: X) -> Self {
        Self {
            streamer,
            extraction: Arc::new(extraction),
        }
    }

    pub fn streamer(&self) -> &DatasetStreamer<P> {
        &self.streamer
    }

    /// Stream items, skipping the first `entry_offset` of them.
    ///
    /// Negative offsets count as 0. An entry offset beyond the available
    /// items gives an empty sequence, not an error.
    pub fn extract(
        &self,
        hostname: &str,
        index_path: &str,
        segment_offset: i64,
        record_offset: i64,
        entry_offset: i64,
    ) -> Result<ExtractedItems<P, X>, StreamError> {
        self.extract_from(
            hostname,
            index_path,
            &ResumePoint::new(
                clamp_offset(segment_offset),
                clamp_offset(record_offset),
                clamp_offset(entry_offset),
            ),
        )
    }

    /// Stream items from all three offsets of a resume point
    pub fn extract_from(
        &self,
        hostname: &str,
        index_path: &str,
        resume: &ResumePoint,
    ) -> Result<ExtractedItems<P, X>, StreamError> {
        let records = self.streamer.stream_from(hostname, index_path, resume)?;
        if resume.entry_offset > 0 {
            tracing::debug!("Skipping the first {} items", resume.entry_offset);
        }

        Ok(ExtractedItems {
            records,
            extraction: self.extraction.clone(),
            cancel: self.streamer.cancellation_token().clone(),
            current: None,
            next_entry: 0,
            entry_offset: resume.entry_offset,
            finished: false,
        })
    }
}

/// Iterator over the flattened item space. Ends after the first error.
pub struct ExtractedItems<P: RecordParser, X> {
    records: SegmentRecords<P>,
    extraction: Arc<X>,
    cancel: CancellationToken,
    current: Option<Box<dyn Iterator<Item = String> + Send>>,
    next_entry: EntryPosition,
    entry_offset: EntryPosition,
    finished: bool,
}

impl<P: RecordParser, X> ExtractedItems<P, X> {
    /// Items produced so far, skipped ones included
    pub fn items_seen(&self) -> u64 {
        self.next_entry
    }

    fn fail(&mut self, error: StreamError) -> Option<Result<ExtractedItem, StreamError>> {
        self.finished = true;
        self.current = None;
        self.records.close();
        Some(Err(error))
    }
}

impl<P, X> Iterator for ExtractedItems<P, X>
where
    P: RecordParser,
    X: ItemExtraction<P::Record>,
{
    type Item = Result<ExtractedItem, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            if self.cancel.is_cancelled() {
                return self.fail(StreamError::Cancelled);
            }

            if let Some(items) = self.current.as_mut() {
                match items.next() {
                    Some(item) => {
                        let entry = self.next_entry;
                        self.next_entry += 1;
                        if entry < self.entry_offset {
                            continue;
                        }
                        return Some(Ok(ExtractedItem::new(entry, item)));
                    }
                    None => self.current = None,
                }
            }

            match self.records.next() {
                Some(Ok(record)) => {
                    self.current = Some(self.extraction.extract(&record.record.value));
                }
                Some(Err(e)) => return self.fail(e),
                None => {
                    if self.next_entry <= self.entry_offset && self.entry_offset > 0 {
                        tracing::debug!(
                            "Entry offset {} is past the last of {} items",
                            self.entry_offset,
                            self.next_entry
                        );
                    }
                    self.finished = true;
                    self.records.close();
                    return None;
                }
            }
        }
    }
}
