//! Parser for `other.xml` (changelog data).

use std::io::BufRead;

use quick_xml::events::BytesStart;

use super::{
    MetadataSink, SaxParser, announce_count, apply_package_attrs, apply_version_attrs, drive,
    for_each_attr, parse_i64,
};
use crate::error::ParseError;
use crate::package::{ChangelogEntry, Package};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Toplevel,
    Package,
}

struct OtherParser {
    state: State,
    text: String,
    package: Option<Package>,
    /// Entry opened by `<changelog author= date=>`, completed by its end
    /// element when the body text is available.
    entry: Option<ChangelogEntry>,
}

/// Parses an other document, emitting packages into `sink`. Changelog
/// entries are delivered in source order (earliest first).
pub(crate) fn parse<R: BufRead>(
    reader: R,
    sink: &mut dyn MetadataSink,
) -> Result<(), ParseError> {
    let mut parser = OtherParser {
        state: State::Toplevel,
        text: String::new(),
        package: None,
        entry: None,
    };
    drive(reader, &mut parser, sink)
}

impl SaxParser for OtherParser {
    fn start(
        &mut self,
        event: &BytesStart<'_>,
        sink: &mut dyn MetadataSink,
    ) -> Result<(), ParseError> {
        self.text.clear();
        match self.state {
            State::Toplevel => self.toplevel_start(event, sink),
            State::Package => self.package_start(event),
        }
    }

    fn end(&mut self, name: &[u8], sink: &mut dyn MetadataSink) {
        if self.state == State::Package {
            self.package_end(name, sink);
        }
        self.text.clear();
    }

    fn text(&mut self, chunk: &str) {
        if self.package.is_some() {
            self.text.push_str(chunk);
        }
    }

    fn take_package(&mut self) -> Option<Package> {
        self.package.take()
    }
}

impl OtherParser {
    fn toplevel_start(
        &mut self,
        event: &BytesStart<'_>,
        sink: &mut dyn MetadataSink,
    ) -> Result<(), ParseError> {
        match event.name().as_ref() {
            b"package" => {
                let mut package = Package::new();
                apply_package_attrs(event, &mut package)?;
                self.package = Some(package);
                self.state = State::Package;
                Ok(())
            }
            b"otherdata" => announce_count(event, sink),
            _ => Ok(()),
        }
    }

    fn package_start(&mut self, event: &BytesStart<'_>) -> Result<(), ParseError> {
        let Some(package) = self.package.as_mut() else {
            return Ok(());
        };

        match event.name().as_ref() {
            b"version" => apply_version_attrs(event, package),
            b"changelog" => {
                let mut entry = ChangelogEntry {
                    author: None,
                    date: 0,
                    text: None,
                };
                for_each_attr(event, |key, value| match key {
                    b"author" => entry.author = Some(package.intern(value)),
                    b"date" => entry.date = parse_i64(value),
                    _ => {}
                })?;
                self.entry = Some(entry);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn package_end(&mut self, name: &[u8], sink: &mut dyn MetadataSink) {
        match name {
            b"package" => {
                if let Some(package) = self.package.take() {
                    sink.package(package);
                }
                self.entry = None;
                self.state = State::Toplevel;
            }
            b"changelog" => {
                let Some(package) = self.package.as_mut() else {
                    return;
                };
                if let Some(mut entry) = self.entry.take() {
                    entry.text = Some(package.intern(&self.text));
                    package.changelogs.push(entry);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::test_support::Collector;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<otherdata xmlns="http://linux.duke.edu/metadata/other" packages="1">
  <package pkgid="aaaa" name="foo" arch="x86_64">
    <version epoch="0" ver="1.0" rel="3"/>
    <changelog author="Jane Doe &lt;jane@example.com&gt; - 0.9-1" date="1000">- initial build</changelog>
    <changelog author="Jane Doe &lt;jane@example.com&gt; - 1.0-3" date="2000">- fix things
- fix more things</changelog>
  </package>
</otherdata>
"#;

    #[test]
    fn changelogs_in_source_order() {
        let mut sink = Collector::default();
        parse(DOC.as_bytes(), &mut sink).unwrap();

        assert_eq!(sink.expected, Some(1));
        let pkg = &sink.packages[0];
        assert_eq!(pkg.pkg_id(), Some("aaaa"));
        assert_eq!(pkg.changelogs.len(), 2);

        assert_eq!(pkg.changelogs[0].date, 1000);
        assert_eq!(
            pkg.opt_text(pkg.changelogs[0].author),
            Some("Jane Doe <jane@example.com> - 0.9-1")
        );
        assert_eq!(pkg.opt_text(pkg.changelogs[0].text), Some("- initial build"));

        assert_eq!(pkg.changelogs[1].date, 2000);
        assert_eq!(
            pkg.opt_text(pkg.changelogs[1].text),
            Some("- fix things\n- fix more things")
        );
    }

    #[test]
    fn package_without_changelogs() {
        let doc = r#"<otherdata packages="1"><package pkgid="dddd" name="bar" arch="src"/></otherdata>"#;
        let mut sink = Collector::default();
        parse(doc.as_bytes(), &mut sink).unwrap();

        let pkg = &sink.packages[0];
        assert_eq!(pkg.pkg_id(), Some("dddd"));
        assert!(pkg.changelogs.is_empty());
    }
}
