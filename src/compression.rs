//! Stream decompression
//!
//! The segment list and the data segments arrive compressed. Common Crawl uses
//! gzip with one member per record, so the gzip codec must read across member
//! boundaries rather than stopping after the first one.

use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use std::sync::Arc;

use crate::transport::ByteStream;

/// Read buffer placed in front of every decoder
const DECODER_BUFFER_SIZE: usize = 256 * 1024;

/// Stream transform from compressed to raw bytes
pub trait Decompressor: Send + Sync {
    /// Wrap `stream` so that reads yield decompressed bytes
    fn decompress(&self, stream: ByteStream) -> ByteStream;
}

/// Multi-member gzip
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipDecompressor;

impl Decompressor for GzipDecompressor {
    fn decompress(&self, stream: ByteStream) -> ByteStream {
        let buffered = BufReader::with_capacity(DECODER_BUFFER_SIZE, stream);
        Box::new(MultiGzDecoder::new(buffered))
    }
}

/// Multi-stream bzip2
#[derive(Debug, Clone, Copy, Default)]
pub struct Bzip2Decompressor;

impl Decompressor for Bzip2Decompressor {
    fn decompress(&self, stream: ByteStream) -> ByteStream {
        let buffered = BufReader::with_capacity(DECODER_BUFFER_SIZE, stream);
        Box::new(MultiBzDecoder::new(buffered))
    }
}

/// Identity transform for uncompressed input
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Decompressor for PassThrough {
    fn decompress(&self, stream: ByteStream) -> ByteStream {
        stream
    }
}

/// Compression format selector used by configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Gzip,
    Bzip2,
    None,
}

impl Compression {
    /// Build the decompressor for this format
    pub fn decompressor(self) -> Arc<dyn Decompressor> {
        match self {
            Compression::Gzip => Arc::new(GzipDecompressor),
            Compression::Bzip2 => Arc::new(Bzip2Decompressor),
            Compression::None => Arc::new(PassThrough),
        }
    }

    /// Detect format from a file name or URL path
    pub fn detect(path: &str) -> Self {
        let lower = path.to_lowercase();
        if lower.ends_with(".gz") {
            Compression::Gzip
        } else if lower.ends_with(".bz2") {
            Compression::Bzip2
        } else {
            Compression::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::{Cursor, Read, Write};

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn read_all(stream: ByteStream) -> String {
        let mut out = String::new();
        let mut stream = stream;
        stream.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_gzip_reads_across_members() {
        let mut data = gzip(b"first member\n");
        data.extend(gzip(b"second member\n"));

        let out = read_all(GzipDecompressor.decompress(Box::new(Cursor::new(data))));
        assert_eq!(out, "first member\nsecond member\n");
    }

    #[test]
    fn test_bzip2_roundtrip() {
        let mut encoder =
            bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        encoder.write_all(b"segments/a.warc.gz\n").unwrap();
        let data = encoder.finish().unwrap();

        let out = read_all(Bzip2Decompressor.decompress(Box::new(Cursor::new(data))));
        assert_eq!(out, "segments/a.warc.gz\n");
    }

    #[test]
    fn test_pass_through() {
        let out = read_all(PassThrough.decompress(Box::new(Cursor::new(b"plain".to_vec()))));
        assert_eq!(out, "plain");
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(Compression::detect("/crawl-data/CC-MAIN-2021-43/wat.paths.gz"), Compression::Gzip);
        assert_eq!(Compression::detect("enwiki-latest.xml.BZ2"), Compression::Bzip2);
        assert_eq!(Compression::detect("segment.warc"), Compression::None);
    }
}
