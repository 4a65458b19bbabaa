//! WARC record model

use std::borrow::Cow;
use std::fmt;

/// Value of the `WARC-Type` header
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Warcinfo,
    Response,
    Resource,
    Request,
    Metadata,
    Revisit,
    Conversion,
    Continuation,
    /// Any type not defined by WARC 1.1
    Other(String),
}

impl RecordKind {
    /// Parse a `WARC-Type` value. Matching ignores case.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "warcinfo" => Self::Warcinfo,
            "response" => Self::Response,
            "resource" => Self::Resource,
            "request" => Self::Request,
            "metadata" => Self::Metadata,
            "revisit" => Self::Revisit,
            "conversion" => Self::Conversion,
            "continuation" => Self::Continuation,
            _ => Self::Other(value.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Warcinfo => "warcinfo",
            Self::Response => "response",
            Self::Resource => "resource",
            Self::Request => "request",
            Self::Metadata => "metadata",
            Self::Revisit => "revisit",
            Self::Conversion => "conversion",
            Self::Continuation => "continuation",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered header block with case-insensitive lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, keeping any earlier value with the same name
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace the first value for `name`, or append it when absent
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Append a folded continuation line to the last header value
    pub fn extend_last(&mut self, continuation: &str) -> bool {
        match self.entries.last_mut() {
            Some((_, value)) => {
                value.push(' ');
                value.push_str(continuation.trim());
                true
            }
            None => false,
        }
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect(),
        }
    }
}

pub const HEADER_TYPE: &str = "WARC-Type";
pub const HEADER_RECORD_ID: &str = "WARC-Record-ID";
pub const HEADER_TARGET_URI: &str = "WARC-Target-URI";
pub const HEADER_DATE: &str = "WARC-Date";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";

/// A parsed WARC record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    version: String,
    kind: RecordKind,
    headers: Headers,
    content: Vec<u8>,
}

impl Record {
    pub fn new(version: impl Into<String>, kind: RecordKind, headers: Headers, content: Vec<u8>) -> Self {
        Self {
            version: version.into(),
            kind,
            headers,
            content,
        }
    }

    /// Version line, e.g. `WARC/1.0`
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn kind(&self) -> &RecordKind {
        &self.kind
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn id(&self) -> Option<&str> {
        self.header(HEADER_RECORD_ID)
    }

    pub fn target_uri(&self) -> Option<&str> {
        self.header(HEADER_TARGET_URI)
    }

    pub fn date(&self) -> Option<&str> {
        self.header(HEADER_DATE)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(HEADER_CONTENT_TYPE)
    }

    /// Raw content block, `None` when the record has no body
    pub fn content_block(&self) -> Option<&[u8]> {
        if self.content.is_empty() {
            None
        } else {
            Some(&self.content)
        }
    }

    /// Content block decoded as UTF-8, replacing invalid sequences
    pub fn content_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_ignores_case() {
        assert_eq!(RecordKind::parse("Metadata"), RecordKind::Metadata);
        assert_eq!(RecordKind::parse(" warcinfo "), RecordKind::Warcinfo);
        assert_eq!(
            RecordKind::parse("x-custom"),
            RecordKind::Other("x-custom".to_string())
        );
        assert_eq!(RecordKind::Other("x-custom".to_string()).to_string(), "x-custom");
    }

    #[test]
    fn test_headers_case_insensitive() {
        let mut headers: Headers = [("WARC-Target-URI", "a"), ("content-length", "3")]
            .into_iter()
            .collect();
        assert_eq!(headers.get("warc-target-uri"), Some("a"));
        assert_eq!(headers.get("Content-Length"), Some("3"));

        headers.set("WARC-TARGET-URI", "b");
        headers.set("WARC-Date", "2021-10-15T00:00:00Z");
        let expected: Headers = [
            ("WARC-Target-URI", "b"),
            ("content-length", "3"),
            ("WARC-Date", "2021-10-15T00:00:00Z"),
        ]
        .into_iter()
        .collect();
        assert_eq!(headers, expected);
    }

    #[test]
    fn test_record_accessors() {
        let headers: Headers = [
            ("WARC-Type", "metadata"),
            ("WARC-Record-ID", "<urn:uuid:1>"),
            ("Content-Type", "application/json"),
        ]
        .into_iter()
        .collect();
        let record = Record::new("WARC/1.0", RecordKind::Metadata, headers, b"{}".to_vec());

        assert_eq!(record.id(), Some("<urn:uuid:1>"));
        assert_eq!(record.content_type(), Some("application/json"));
        assert_eq!(record.target_uri(), None);
        assert_eq!(record.content_block(), Some(&b"{}"[..]));
        assert_eq!(record.content_text(), "{}");

        let empty = Record::new("WARC/1.0", RecordKind::Request, Headers::new(), Vec::new());
        assert!(empty.content_block().is_none());
    }
}
