//! Error taxonomy.
//!
//! Fatal failures abort the running update and surface through the entry
//! point's return value; row-level trouble is reported through the
//! [`Reporter`](crate::reporter::Reporter) instead and never reaches here.

use thiserror::Error;

/// Fatal failure of a cache update.
///
/// Any of these aborts the invocation: the in-progress transaction is rolled
/// back and the cache file is removed so the next run rebuilds from scratch.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("XML parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal failure inside the XML layer.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("invalid escape sequence: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),
}
