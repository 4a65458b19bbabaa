//! Record construction hooks
//!
//! The parser builds every record through a [`RecordFactory`]. A fresh factory
//! is created for each parse pass, so a factory may keep per-segment state.

use std::sync::Arc;

use super::record::{Headers, Record, RecordKind};

/// Builds records from their parsed parts
pub trait RecordFactory: Send {
    fn create_record(
        &mut self,
        version: String,
        kind: RecordKind,
        headers: Headers,
        content: Vec<u8>,
    ) -> Record;
}

/// Creates one factory per parse pass
pub type FactoryProvider = Arc<dyn Fn() -> Box<dyn RecordFactory> + Send + Sync>;

/// Factory that builds records unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRecordFactory;

impl DefaultRecordFactory {
    pub fn provider() -> FactoryProvider {
        Arc::new(|| -> Box<dyn RecordFactory> { Box::new(DefaultRecordFactory) })
    }
}

impl RecordFactory for DefaultRecordFactory {
    fn create_record(
        &mut self,
        version: String,
        kind: RecordKind,
        headers: Headers,
        content: Vec<u8>,
    ) -> Record {
        Record::new(version, kind, headers, content)
    }
}
