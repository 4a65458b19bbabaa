//! URL extraction from WAT metadata records

use serde_json::Value;
use url::{Position, Url};

use super::json::{parse_lenient, take_array};
use crate::stream::ItemExtraction;
use crate::warc::{Record, RecordKind};

const TARGET_URI: &str = "/Envelope/WARC-Header-Metadata/WARC-Target-URI";
const HTML_METADATA: &str = "/Envelope/Payload-Metadata/HTTP-Response-Metadata/HTML-Metadata";

/// Resolve `value` against `base_url` (which ends with `/`).
///
/// Absolute values are returned verbatim. Relative values are appended to the
/// base with at most one leading slash removed.
pub fn create_absolute_url(base_url: &str, value: &str) -> String {
    if Url::parse(value).is_ok() {
        value.to_string()
    } else {
        let suffix = value.strip_prefix('/').unwrap_or(value);
        format!("{}{}", base_url, suffix)
    }
}

/// Extracts the page URL and its link, stylesheet and script URLs from WAT
/// metadata records.
///
/// Yields the record's `WARC-Target-URI` first, followed by `HTML-Metadata.Links`,
/// `Head.Link` and `Head.Scripts` in document order. Records of other kinds,
/// unparseable content and relative target URIs yield nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatUrlExtraction;

impl WatUrlExtraction {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_urls(&self, record: &Record) -> Box<dyn Iterator<Item = String> + Send> {
        if record.kind() != &RecordKind::Metadata {
            return Box::new(std::iter::empty());
        }
        let mut root = match record.content_block().and_then(|_| parse_lenient(&record.content_text())) {
            Some(root) => root,
            None => return Box::new(std::iter::empty()),
        };

        let target = match root.pointer(TARGET_URI).and_then(Value::as_str) {
            Some(target) => target.to_string(),
            None => return Box::new(std::iter::empty()),
        };
        let base_url = match Url::parse(&target) {
            Ok(url) => format!("{}/", &url[..Position::BeforePath]),
            Err(_) => return Box::new(std::iter::empty()),
        };

        let links = take_array(&mut root, &format!("{}/Links", HTML_METADATA));
        let head_links = take_array(&mut root, &format!("{}/Head/Link", HTML_METADATA));
        let scripts = take_array(&mut root, &format!("{}/Head/Scripts", HTML_METADATA));

        Box::new(
            std::iter::once(target)
                .chain(resolve_entries(links, base_url.clone()))
                .chain(resolve_entries(head_links, base_url.clone()))
                .chain(resolve_entries(scripts, base_url)),
        )
    }
}

/// Resolve each entry's `url` (or `href`); the first entry with neither ends the list
fn resolve_entries(entries: Vec<Value>, base_url: String) -> impl Iterator<Item = String> + Send {
    entries.into_iter().map_while(move |entry| {
        let value = entry.get("url").or_else(|| entry.get("href"))?.as_str()?;
        Some(create_absolute_url(&base_url, value))
    })
}

impl ItemExtraction<Record> for WatUrlExtraction {
    fn extract(&self, record: &Record) -> Box<dyn Iterator<Item = String> + Send> {
        self.extract_urls(record)
    }
}
