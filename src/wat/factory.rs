//! Record factory for WAT segments

use std::sync::Arc;

use super::extract::create_absolute_url;
use crate::warc::{FactoryProvider, Headers, Record, RecordFactory, RecordKind, HEADER_TARGET_URI};

/// Makes the first metadata record of a WAT segment usable.
///
/// That record carries a relative `WARC-Target-URI` (the segment's own path).
/// The factory rewrites it to `https://{hostname}/{path}`. Absolute values and
/// every later metadata record are left untouched. One instance serves exactly
/// one parse pass.
#[derive(Debug, Clone)]
pub struct WatRecordFactory {
    base_url: String,
    first_metadata_seen: bool,
}

impl WatRecordFactory {
    pub fn new(hostname: &str) -> Self {
        Self {
            base_url: format!("https://{}/", hostname),
            first_metadata_seen: false,
        }
    }

    /// Provider building a fresh factory for each parse pass
    pub fn provider(hostname: impl Into<String>) -> FactoryProvider {
        let hostname = hostname.into();
        Arc::new(move || -> Box<dyn RecordFactory> { Box::new(WatRecordFactory::new(&hostname)) })
    }
}

impl RecordFactory for WatRecordFactory {
    fn create_record(
        &mut self,
        version: String,
        kind: RecordKind,
        mut headers: Headers,
        content: Vec<u8>,
    ) -> Record {
        if kind == RecordKind::Metadata && !self.first_metadata_seen {
            self.first_metadata_seen = true;
            if let Some(target) = headers.get(HEADER_TARGET_URI) {
                let absolute = create_absolute_url(&self.base_url, target);
                headers.set(HEADER_TARGET_URI, absolute);
            }
        }
        Record::new(version, kind, headers, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(factory: &mut WatRecordFactory, kind: RecordKind, target: &str) -> Record {
        let headers: Headers = [(HEADER_TARGET_URI, target)].into_iter().collect();
        factory.create_record("WARC/1.0".to_string(), kind, headers, Vec::new())
    }

    #[test]
    fn test_rewrites_first_metadata_record_only() {
        let mut factory = WatRecordFactory::new("data.commoncrawl.org");
        let path = "/crawl-data/CC-MAIN-2021-43/segments/1/wat/a.warc.wat.gz";

        let first = create(&mut factory, RecordKind::Metadata, path);
        assert_eq!(
            first.target_uri(),
            Some("https://data.commoncrawl.org/crawl-data/CC-MAIN-2021-43/segments/1/wat/a.warc.wat.gz")
        );

        let second = create(&mut factory, RecordKind::Metadata, path);
        assert_eq!(second.target_uri(), Some(path));
    }

    #[test]
    fn test_other_kinds_untouched() {
        for kind in [
            RecordKind::Warcinfo,
            RecordKind::Response,
            RecordKind::Resource,
            RecordKind::Request,
            RecordKind::Revisit,
            RecordKind::Conversion,
            RecordKind::Continuation,
        ] {
            let mut factory = WatRecordFactory::new("www.example.com");
            let record = create(&mut factory, kind.clone(), "relative/path");
            assert_eq!(record.target_uri(), Some("relative/path"), "kind {}", kind);

            let metadata = create(&mut factory, RecordKind::Metadata, "relative/path");
            assert_eq!(metadata.target_uri(), Some("https://www.example.com/relative/path"));
        }
    }

    #[test]
    fn test_absolute_target_kept() {
        let mut factory = WatRecordFactory::new("www.example.com");
        let record = create(&mut factory, RecordKind::Metadata, "http://other.org/x");
        assert_eq!(record.target_uri(), Some("http://other.org/x"));
    }

    #[test]
    fn test_provider_gives_fresh_state() {
        let provider = WatRecordFactory::provider("www.example.com");
        for _ in 0..2 {
            let mut factory = provider();
            let headers: Headers = [(HEADER_TARGET_URI, "a")].into_iter().collect();
            let record = factory.create_record("WARC/1.0".to_string(), RecordKind::Metadata, headers, Vec::new());
            assert_eq!(record.target_uri(), Some("https://www.example.com/a"));
        }
    }
}
