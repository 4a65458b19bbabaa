//! Flat, resumable record stream over every segment of a dataset

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::index::SegmentIndex;
use super::StreamError;
use crate::compression::{Decompressor, GzipDecompressor};
use crate::transport::Transport;
use crate::types::{clamp_offset, IndexedValue, RecordPosition, ResumePoint, SegmentRecord};
use crate::warc::{ParseLog, RecordParser, RecordStream};

/// Streams the records of every segment listed in a dataset's index
pub struct DatasetStreamer<P: RecordParser> {
    transport: Arc<dyn Transport>,
    parser: Arc<P>,
    index_decompressor: Arc<dyn Decompressor>,
    parse_log: Option<Arc<dyn ParseLog>>,
    cancel: CancellationToken,
}

impl<P: RecordParser> DatasetStreamer<P> {
    /// Create a streamer for a gzip-compressed index
    pub fn new(transport: Arc<dyn Transport>, parser: P) -> Self {
        Self {
            transport,
            parser: Arc::new(parser),
            index_decompressor: Arc::new(GzipDecompressor),
            parse_log: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the codec used for the index file
    pub fn with_index_decompressor(mut self, decompressor: Arc<dyn Decompressor>) -> Self {
        self.index_decompressor = decompressor;
        self
    }

    /// Route recoverable parse problems to `log` instead of failing
    pub fn with_parse_log(mut self, log: Arc<dyn ParseLog>) -> Self {
        self.parse_log = Some(log);
        self
    }

    /// Stop streams opened by this streamer once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stream every record from `(segment_offset, record_offset)` onward.
    ///
    /// Negative offsets count as 0. The record offset applies to the first
    /// segment only; skipping past its end gives that segment no records and
    /// is not an error. A segment offset past the end of the index fails
    /// here with [`StreamError::InvalidSegmentOffset`].
    pub fn stream(
        &self,
        hostname: &str,
        index_path: &str,
        segment_offset: i64,
        record_offset: i64,
    ) -> Result<SegmentRecords<P>, StreamError> {
        self.stream_from(
            hostname,
            index_path,
            &ResumePoint::new(clamp_offset(segment_offset), clamp_offset(record_offset), 0),
        )
    }

    /// Stream from the segment and record offsets of a resume point
    pub fn stream_from(
        &self,
        hostname: &str,
        index_path: &str,
        resume: &ResumePoint,
    ) -> Result<SegmentRecords<P>, StreamError> {
        let index = SegmentIndex::open(
            self.transport.as_ref(),
            self.index_decompressor.as_ref(),
            hostname,
            index_path,
            resume.segment_offset,
            self.cancel.clone(),
        )?;

        Ok(SegmentRecords {
            index,
            transport: self.transport.clone(),
            parser: self.parser.clone(),
            parse_log: self.parse_log.clone(),
            cancel: self.cancel.clone(),
            current: None,
            records_to_skip: resume.record_offset,
            finished: false,
        })
    }
}

/// The segment currently being read
struct OpenSegment<R> {
    segment: IndexedValue<String>,
    records: RecordStream<R>,
    next_position: RecordPosition,
}

enum Step<R> {
    Record(SegmentRecord<R>),
    Failed(StreamError),
    SegmentDone,
    OpenNext,
}

/// Iterator over the records of a dataset.
///
/// Holds at most one open segment. Ends after the first error.
pub struct SegmentRecords<P: RecordParser> {
    index: SegmentIndex,
    transport: Arc<dyn Transport>,
    parser: Arc<P>,
    parse_log: Option<Arc<dyn ParseLog>>,
    cancel: CancellationToken,
    current: Option<OpenSegment<P::Record>>,
    /// Remaining records to drop from the first segment
    records_to_skip: u64,
    finished: bool,
}

impl<P: RecordParser> SegmentRecords<P> {
    fn fail(&mut self, error: StreamError) -> Option<Result<SegmentRecord<P::Record>, StreamError>> {
        if let Some(open) = self.current.take() {
            tracing::warn!(
                "Segment {} ({}) failed: {}",
                open.segment.index,
                open.segment.value,
                error
            );
        }
        self.close();
        Some(Err(error))
    }

    /// Stop streaming and release the open segment and the index stream
    pub fn close(&mut self) {
        self.current = None;
        self.index.close();
        self.finished = true;
    }

    fn open_segment(&mut self, segment: IndexedValue<String>) -> Result<(), StreamError> {
        if self.cancel.is_cancelled() {
            return Err(StreamError::Cancelled);
        }
        tracing::info!("Streaming segment {}: {}", segment.index, segment.value);

        let stream = self.transport.get(&segment.value)?;
        let is_compressed = segment.value.ends_with(".gz");
        let records = self.parser.parse(
            stream,
            is_compressed,
            self.parse_log.clone(),
            0,
            self.cancel.clone(),
        );
        self.current = Some(OpenSegment {
            segment,
            records,
            next_position: 0,
        });
        Ok(())
    }
}

impl<P: RecordParser> Iterator for SegmentRecords<P> {
    type Item = Result<SegmentRecord<P::Record>, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            if self.cancel.is_cancelled() {
                return self.fail(StreamError::Cancelled);
            }

            let step = match self.current.as_mut() {
                Some(open) => match open.records.next() {
                    Some(Ok(record)) => {
                        let position = open.next_position;
                        open.next_position += 1;
                        Step::Record(SegmentRecord::new(
                            open.segment.clone(),
                            IndexedValue::new(position, record),
                        ))
                    }
                    Some(Err(e)) => Step::Failed(e.into()),
                    None => Step::SegmentDone,
                },
                None => Step::OpenNext,
            };

            match step {
                Step::Record(record) => {
                    if self.records_to_skip > 0 {
                        self.records_to_skip -= 1;
                        tracing::debug!(
                            "Skipped record {} of segment {}",
                            record.record.index,
                            record.segment.index
                        );
                        continue;
                    }
                    if self.cancel.is_cancelled() {
                        return self.fail(StreamError::Cancelled);
                    }
                    return Some(Ok(record));
                }
                Step::Failed(error) => return self.fail(error),
                Step::SegmentDone => {
                    if let Some(open) = self.current.take() {
                        tracing::debug!(
                            "Finished segment {} after {} records",
                            open.segment.index,
                            open.next_position
                        );
                    }
                    // The record offset never carries over to later segments
                    self.records_to_skip = 0;
                }
                Step::OpenNext => match self.index.next() {
                    Some(Ok(segment)) => {
                        if let Err(e) = self.open_segment(segment) {
                            return self.fail(e);
                        }
                    }
                    Some(Err(e)) => return self.fail(e),
                    None => {
                        self.close();
                        return None;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::PassThrough;
    use crate::transport::{ByteStream, MemoryTransport, TrackingTransport};
    use crate::warc::ParseError;
    use std::io::{BufRead, BufReader};

    /// Treats every non-empty line of a segment as one record
    struct LineParser;

    impl RecordParser for LineParser {
        type Record = String;

        fn parse(
            &self,
            stream: ByteStream,
            _is_compressed: bool,
            _log: Option<Arc<dyn ParseLog>>,
            _byte_offset: u64,
            _cancel: CancellationToken,
        ) -> RecordStream<String> {
            Box::new(
                BufReader::new(stream)
                    .lines()
                    .filter(|line| !matches!(line, Ok(l) if l.is_empty()))
                    .map(|line| line.map_err(ParseError::from)),
            )
        }
    }

    const HOST: &str = "host.example";
    const INDEX: &str = "/list.paths";

    fn transport() -> MemoryTransport {
        MemoryTransport::new()
            .with_body("https://host.example/list.paths", "s0\ns1\ns2\n")
            .with_body("https://host.example/s0", "a\n")
            .with_body("https://host.example/s1", "b\nc\nd\n")
            .with_body("https://host.example/s2", "e\n")
    }

    fn streamer(transport: MemoryTransport) -> DatasetStreamer<LineParser> {
        DatasetStreamer::new(Arc::new(transport), LineParser)
            .with_index_decompressor(Arc::new(PassThrough))
    }

    fn positions(records: SegmentRecords<LineParser>) -> Vec<(u64, u64, String)> {
        records
            .map(|r| {
                let r = r.unwrap();
                (r.segment.index, r.record.index, r.record.value)
            })
            .collect()
    }

    #[test]
    fn test_streams_all_segments_in_order() {
        let transport = transport();
        let records = positions(streamer(transport.clone()).stream(HOST, INDEX, 0, 0).unwrap());

        assert_eq!(
            records,
            vec![
                (0, 0, "a".to_string()),
                (1, 0, "b".to_string()),
                (1, 1, "c".to_string()),
                (1, 2, "d".to_string()),
                (2, 0, "e".to_string()),
            ]
        );
        assert_eq!(
            transport.requests(),
            vec![
                "https://host.example/list.paths",
                "https://host.example/s0",
                "https://host.example/s1",
                "https://host.example/s2",
            ]
        );
    }

    #[test]
    fn test_record_offset_applies_to_first_segment_only() {
        let records = positions(streamer(transport()).stream(HOST, INDEX, 1, 2).unwrap());
        assert_eq!(
            records,
            vec![(1, 2, "d".to_string()), (2, 0, "e".to_string())]
        );
    }

    #[test]
    fn test_record_offset_past_segment_end_is_not_error() {
        let records = positions(streamer(transport()).stream(HOST, INDEX, 1, 10).unwrap());
        assert_eq!(records, vec![(2, 0, "e".to_string())]);

        let records = positions(streamer(transport()).stream(HOST, INDEX, 2, 1).unwrap());
        assert!(records.is_empty());
    }

    #[test]
    fn test_negative_offsets_are_clamped() {
        let records = positions(streamer(transport()).stream(HOST, INDEX, -3, -1).unwrap());
        assert_eq!(records.len(), 5);
        assert_eq!(records[0], (0, 0, "a".to_string()));
    }

    #[test]
    fn test_segment_offset_past_end_fails_eagerly() {
        let transport = transport();
        let result = streamer(transport.clone()).stream(HOST, INDEX, 3, 0);
        assert!(matches!(
            result,
            Err(StreamError::InvalidSegmentOffset { offset: 3, .. })
        ));
        assert_eq!(transport.requests(), vec!["https://host.example/list.paths"]);
    }

    #[test]
    fn test_segments_fetched_lazily() {
        let transport = transport();
        let mut records = streamer(transport.clone()).stream(HOST, INDEX, 0, 0).unwrap();
        assert_eq!(transport.requests().len(), 1);

        records.next().unwrap().unwrap();
        assert_eq!(transport.requests().len(), 2);

        // s1 is only requested once s0 is exhausted
        records.next().unwrap().unwrap();
        assert_eq!(transport.requests().len(), 3);
    }

    #[test]
    fn test_missing_segment_terminates_stream() {
        let transport = MemoryTransport::new()
            .with_body("https://host.example/list.paths", "s0\nmissing\ns2\n")
            .with_body("https://host.example/s0", "a\n")
            .with_body("https://host.example/s2", "e\n");

        let mut records = streamer(transport).stream(HOST, INDEX, 0, 0).unwrap();
        assert!(records.next().unwrap().is_ok());
        assert!(matches!(records.next(), Some(Err(StreamError::Transport(_)))));
        assert!(records.next().is_none());
    }

    #[test]
    fn test_cancellation_stops_after_current_record() {
        let cancel = CancellationToken::new();
        let transport = transport();
        let mut records = streamer(transport.clone())
            .with_cancellation(cancel.clone())
            .stream(HOST, INDEX, 0, 0)
            .unwrap();

        assert!(records.next().unwrap().is_ok());
        cancel.cancel();
        assert!(matches!(records.next(), Some(Err(StreamError::Cancelled))));
        assert!(records.next().is_none());
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn test_cancellation_releases_all_streams() {
        let cancel = CancellationToken::new();
        let transport = Arc::new(TrackingTransport::new(transport()));
        let mut records = DatasetStreamer::new(transport.clone(), LineParser)
            .with_index_decompressor(Arc::new(PassThrough))
            .with_cancellation(cancel.clone())
            .stream(HOST, INDEX, 1, 0)
            .unwrap();

        assert!(records.next().unwrap().is_ok());
        assert_eq!(transport.open_streams(), 2);

        cancel.cancel();
        assert!(matches!(records.next(), Some(Err(StreamError::Cancelled))));
        assert_eq!(transport.open_streams(), 0);
        assert!(records.next().is_none());
    }

    #[test]
    fn test_failure_releases_index_stream() {
        let transport = Arc::new(TrackingTransport::new(
            MemoryTransport::new()
                .with_body("https://host.example/list.paths", "s0
missing
")
                .with_body("https://host.example/s0", "a
"),
        ));
        let mut records = DatasetStreamer::new(transport.clone(), LineParser)
            .with_index_decompressor(Arc::new(PassThrough))
            .stream(HOST, INDEX, 0, 0)
            .unwrap();

        assert!(records.next().unwrap().is_ok());
        assert!(matches!(records.next(), Some(Err(StreamError::Transport(_)))));
        assert_eq!(transport.open_streams(), 0);
    }

    #[test]
    fn test_exhausted_stream_releases_index() {
        let transport = Arc::new(TrackingTransport::new(transport()));
        let mut records = DatasetStreamer::new(transport.clone(), LineParser)
            .with_index_decompressor(Arc::new(PassThrough))
            .stream(HOST, INDEX, 2, 0)
            .unwrap();

        assert!(records.next().unwrap().is_ok());
        assert!(records.next().is_none());
        assert_eq!(transport.open_streams(), 0);
    }

    #[test]
    fn test_resume_from_last_record_matches_unbroken_run() {
        let full = positions(streamer(transport()).stream(HOST, INDEX, 0, 0).unwrap());

        for cut in 0..full.len() {
            let last = &full[cut];
            let resume = ResumePoint::new(last.0, last.1 + 1, 0);
            let rest = positions(streamer(transport()).stream_from(HOST, INDEX, &resume).unwrap());
            assert_eq!(rest, full[cut + 1..].to_vec(), "resume after {:?}", last);
        }
    }
}
