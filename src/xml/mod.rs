//! SAX-style substrate shared by the three document parsers.
//!
//! quick-xml pulls events; each parser is a small explicit state machine
//! consuming start/end/text callbacks and emitting fully built [`Package`]
//! values through a [`MetadataSink`]. Qualified element names (`rpm:entry`)
//! are matched textually, since the documents pin their namespace prefixes.

pub(crate) mod filelists;
pub(crate) mod other;
pub(crate) mod primary;

use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::ParseError;
use crate::package::Package;

/// Receiver for what a metadata document yields.
pub(crate) trait MetadataSink {
    /// The root element's `packages` attribute: the expected package count.
    /// Advisory, fired at most once, before any package.
    fn expected_packages(&mut self, _count: u32) {}

    /// A fully reconstructed package. The sink owns it; it is gone after
    /// this call returns.
    fn package(&mut self, package: Package);

    /// Non-fatal parser diagnostics.
    fn warning(&mut self, _message: &str) {}
}

/// One document parser: state machine over element events.
pub(crate) trait SaxParser {
    fn start(
        &mut self,
        event: &BytesStart<'_>,
        sink: &mut dyn MetadataSink,
    ) -> Result<(), ParseError>;

    fn end(&mut self, name: &[u8], sink: &mut dyn MetadataSink);

    /// Character data between elements; parsers accumulate it only while a
    /// package is open.
    fn text(&mut self, chunk: &str);

    /// Removes the package under construction, if any.
    fn take_package(&mut self) -> Option<Package>;
}

/// Runs `parser` over the document, discarding any half-built package at
/// end-of-input or on a fatal XML error.
pub(crate) fn drive<R: BufRead, P: SaxParser>(
    reader: R,
    parser: &mut P,
    sink: &mut dyn MetadataSink,
) -> Result<(), ParseError> {
    let result = pump(reader, parser, sink);
    if parser.take_package().is_some() {
        sink.warning("Incomplete package lost");
    }
    result
}

fn pump<R: BufRead, P: SaxParser>(
    reader: R,
    parser: &mut P,
    sink: &mut dyn MetadataSink,
) -> Result<(), ParseError> {
    let mut reader = Reader::from_reader(reader);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => parser.start(&e, sink)?,
            Event::Empty(e) => {
                // Self-closing elements go through both callbacks so the
                // state machines never see them as a special case.
                parser.start(&e, sink)?;
                parser.end(e.name().as_ref(), sink);
            }
            Event::End(e) => parser.end(e.name().as_ref(), sink),
            Event::Text(t) => {
                let chunk = t.unescape()?;
                parser.text(&chunk);
            }
            Event::CData(t) => parser.text(&String::from_utf8_lossy(&t)),
            Event::Eof => return Ok(()),
            _ => {}
        }
        buf.clear();
    }
}

/// Calls `f` with every `(key, value)` attribute pair of `event`.
pub(crate) fn for_each_attr(
    event: &BytesStart<'_>,
    mut f: impl FnMut(&[u8], &str),
) -> Result<(), ParseError> {
    for attr in event.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        f(attr.key.as_ref(), &value);
    }
    Ok(())
}

/// Numeric attribute: leading-sign decimal, anything else is 0.
pub(crate) fn parse_i64(value: &str) -> i64 {
    value.parse().unwrap_or(0)
}

/// Root-element package count: full-string parse, 0 when absent/malformed.
pub(crate) fn announce_count(
    event: &BytesStart<'_>,
    sink: &mut dyn MetadataSink,
) -> Result<(), ParseError> {
    for_each_attr(event, |key, value| {
        if key == b"packages" {
            sink.expected_packages(value.parse().unwrap_or(0));
        }
    })
}

/// Shared `<version epoch= ver= rel=>` handling.
pub(crate) fn apply_version_attrs(
    event: &BytesStart<'_>,
    package: &mut Package,
) -> Result<(), ParseError> {
    for_each_attr(event, |key, value| match key {
        b"epoch" => package.epoch = Some(package.intern(value)),
        b"ver" => package.version = Some(package.intern(value)),
        b"rel" => package.release = Some(package.intern(value)),
        _ => {}
    })
}

/// Shared `<package pkgid= name= arch=>` handling for the filelists and
/// other documents, which carry identity as attributes.
pub(crate) fn apply_package_attrs(
    event: &BytesStart<'_>,
    package: &mut Package,
) -> Result<(), ParseError> {
    for_each_attr(event, |key, value| match key {
        b"pkgid" => package.pkg_id = Some(package.intern(value)),
        b"name" => package.name = Some(package.intern(value)),
        b"arch" => package.arch = Some(package.intern(value)),
        _ => {}
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::MetadataSink;
    use crate::package::Package;

    /// Collects everything a parser emits.
    #[derive(Default)]
    pub(crate) struct Collector {
        pub(crate) expected: Option<u32>,
        pub(crate) packages: Vec<Package>,
        pub(crate) warnings: Vec<String>,
    }

    impl MetadataSink for Collector {
        fn expected_packages(&mut self, count: u32) {
            self.expected = Some(count);
        }

        fn package(&mut self, package: Package) {
            self.packages.push(package);
        }

        fn warning(&mut self, message: &str) {
            self.warnings.push(message.to_owned());
        }
    }
}
