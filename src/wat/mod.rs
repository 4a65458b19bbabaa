//! Common Crawl WAT support
//!
//! WAT segments hold one JSON metadata record per crawled page. This module
//! pulls page, link, stylesheet and script URLs out of those records and fixes
//! up the relative target URI of each segment's leading metadata record.

mod extract;
mod factory;
mod json;

pub use extract::{create_absolute_url, WatUrlExtraction};
pub use factory::WatRecordFactory;
pub use json::{parse_lenient, strip_trailing_commas};
