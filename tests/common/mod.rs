//! Fixture builders shared by the integration tests

#![allow(dead_code)]

use crawlstream::transport::MemoryTransport;
use flate2::write::GzEncoder;
use std::io::Write;

pub const HOSTNAME: &str = "www.example.com";
pub const INDEX_PATH: &str = "/foobar";

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// One WARC record with the given type, id, optional target URI and body
pub fn warc_record(kind: &str, id: &str, target: Option<&str>, body: &str) -> String {
    let mut record = format!(
        "WARC/1.0\r\nWARC-Type: {}\r\nWARC-Record-ID: <{}>\r\nWARC-Date: 2021-10-15T00:00:00Z\r\n",
        kind, id
    );
    if let Some(target) = target {
        record.push_str(&format!("WARC-Target-URI: {}\r\n", target));
    }
    record.push_str(&format!(
        "Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{}\r\n\r\n",
        body.len(),
        body
    ));
    record
}

/// Transport serving a gzip index with `segments` and each segment body
pub fn dataset(segments: &[(&str, String)]) -> MemoryTransport {
    let index: String = segments.iter().map(|(name, _)| format!("{}\n", name)).collect();
    let mut transport = MemoryTransport::new().with_body(
        format!("https://{}{}", HOSTNAME, INDEX_PATH),
        gzip(index.as_bytes()),
    );
    for (name, body) in segments {
        transport = transport.with_body(
            format!("https://{}/{}", HOSTNAME, name),
            body.clone().into_bytes(),
        );
    }
    transport
}

/// WAT metadata JSON for a page with the given link lists
pub fn wat_metadata(target: &str, links: &str, head_links: &str, scripts: &str) -> String {
    format!(
        r#"{{"Envelope":{{"WARC-Header-Metadata":{{"WARC-Target-URI":"{}"}},"Payload-Metadata":{{"HTTP-Response-Metadata":{{"HTML-Metadata":{{"Head":{{"Link":[{}],"Scripts":[{}]}},"Links":[{}]}}}}}}}}}}"#,
        target, head_links, scripts, links
    )
}
