//! Core types for the crawlstream system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Zero-based position of a segment in the segment list
pub type SegmentPosition = u64;

/// Zero-based position of a record within its segment
pub type RecordPosition = u64;

/// Zero-based position of an item in the flattened item space
pub type EntryPosition = u64;

// ============================================================================
// Coordinates
// ============================================================================

/// A value tagged with its zero-based position in an enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedValue<T> {
    /// Position of `value`, assigned in emission order
    pub index: u64,
    /// The value itself
    pub value: T,
}

impl<T> IndexedValue<T> {
    /// Tag a value with its position
    pub fn new(index: u64, value: T) -> Self {
        Self { index, value }
    }

    /// Transform the value, keeping the index
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> IndexedValue<U> {
        IndexedValue {
            index: self.index,
            value: f(self.value),
        }
    }
}

/// A record together with the coordinates it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRecord<R> {
    /// Absolute segment position and URL
    pub segment: IndexedValue<String>,
    /// Position of the record within the segment and the record itself
    pub record: IndexedValue<R>,
}

impl<R> SegmentRecord<R> {
    /// Create a new segment record
    pub fn new(segment: IndexedValue<String>, record: IndexedValue<R>) -> Self {
        Self { segment, record }
    }

    /// Segment URL
    pub fn url(&self) -> &str {
        &self.segment.value
    }

    /// Coordinates of this record as `(segment, record)`
    pub fn position(&self) -> (SegmentPosition, RecordPosition) {
        (self.segment.index, self.record.index)
    }
}

/// One item of the flattened item space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedItem {
    /// Position in the flattened item space
    pub entry_index: EntryPosition,
    /// The item. For WAT URL extraction this may be absolute, scheme-less or use any scheme.
    pub item: String,
}

impl ExtractedItem {
    /// Create a new extracted item
    pub fn new(entry_index: EntryPosition, item: impl Into<String>) -> Self {
        Self {
            entry_index,
            item: item.into(),
        }
    }
}

impl fmt::Display for ExtractedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entry_index, self.item)
    }
}

// ============================================================================
// Resume coordinates
// ============================================================================

/// Offsets in all three coordinate spaces, as accepted by the streamers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePoint {
    /// First segment to stream
    pub segment_offset: SegmentPosition,
    /// Records to skip in the first streamed segment only
    pub record_offset: RecordPosition,
    /// Items to skip in the flattened item space
    pub entry_offset: EntryPosition,
}

impl ResumePoint {
    /// Create a resume point from explicit offsets
    pub fn new(
        segment_offset: SegmentPosition,
        record_offset: RecordPosition,
        entry_offset: EntryPosition,
    ) -> Self {
        Self {
            segment_offset,
            record_offset,
            entry_offset,
        }
    }

    /// Resume point that continues right after the given record
    pub fn after_record<R>(record: &SegmentRecord<R>) -> Self {
        Self {
            segment_offset: record.segment.index,
            record_offset: record.record.index + 1,
            entry_offset: 0,
        }
    }

    /// Resume point that continues right after the given item.
    ///
    /// Item positions are relative to the run that produced them, so the
    /// segment and record offsets of that run are carried over unchanged.
    pub fn after_item(&self, item: &ExtractedItem) -> Self {
        Self {
            entry_offset: item.entry_index + 1,
            ..*self
        }
    }
}

/// Clamp a caller-supplied offset: negative values mean "from the start"
pub fn clamp_offset(offset: i64) -> u64 {
    offset.max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_offset() {
        assert_eq!(clamp_offset(-5), 0);
        assert_eq!(clamp_offset(0), 0);
        assert_eq!(clamp_offset(7), 7);
    }

    #[test]
    fn test_resume_after_record() {
        let record = SegmentRecord::new(
            IndexedValue::new(3, "https://example.com/a.warc.gz".to_string()),
            IndexedValue::new(41, ()),
        );
        let point = ResumePoint::after_record(&record);
        assert_eq!(point, ResumePoint::new(3, 42, 0));
        assert_eq!(record.position(), (3, 41));
    }

    #[test]
    fn test_resume_after_item_keeps_record_offsets() {
        let run = ResumePoint::new(1, 2, 0);
        let point = run.after_item(&ExtractedItem::new(9, "http://example.com/"));
        assert_eq!(point, ResumePoint::new(1, 2, 10));
    }

    #[test]
    fn test_item_display() {
        let item = ExtractedItem::new(4, "http://example.com/foo.js");
        assert_eq!(item.to_string(), "4: http://example.com/foo.js");
    }
}
