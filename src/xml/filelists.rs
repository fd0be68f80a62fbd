//! Parser for `filelists.xml`.
//!
//! Two states: toplevel and inside `<package>`. Identity arrives as
//! attributes on the package element; each `<file>` carries its type as an
//! attribute and its path as text.

use std::io::BufRead;

use quick_xml::events::BytesStart;

use super::{
    MetadataSink, SaxParser, announce_count, apply_package_attrs, apply_version_attrs, drive,
    for_each_attr,
};
use crate::error::ParseError;
use crate::package::{FileType, Package, PackageFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Toplevel,
    Package,
}

struct FilelistsParser {
    state: State,
    text: String,
    package: Option<Package>,
    file_type: Option<FileType>,
}

/// Parses a filelists document, emitting packages into `sink`.
pub(crate) fn parse<R: BufRead>(
    reader: R,
    sink: &mut dyn MetadataSink,
) -> Result<(), ParseError> {
    let mut parser = FilelistsParser {
        state: State::Toplevel,
        text: String::new(),
        package: None,
        file_type: None,
    };
    drive(reader, &mut parser, sink)
}

impl SaxParser for FilelistsParser {
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

impl FilelistsParser {
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
            b"filelists" => announce_count(event, sink),
            _ => Ok(()),
        }
    }

    fn package_start(&mut self, event: &BytesStart<'_>) -> Result<(), ParseError> {
        let Some(package) = self.package.as_mut() else {
            return Ok(());
        };

        match event.name().as_ref() {
            b"version" => apply_version_attrs(event, package),
            b"file" => {
                self.file_type = None;
                for_each_attr(event, |key, value| {
                    if key == b"type" {
                        self.file_type = Some(FileType::from_attr(value));
                    }
                })
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
                self.file_type = None;
                self.state = State::Toplevel;
            }
            b"file" => {
                let Some(package) = self.package.as_mut() else {
                    return;
                };
                let kind = self.file_type.take().unwrap_or_default();
                let name = package.intern(&self.text);
                package.files.push(PackageFile { name, kind });
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
<filelists xmlns="http://linux.duke.edu/metadata/filelists" packages="1">
  <package pkgid="aaaa" name="foo" arch="x86_64">
    <version epoch="0" ver="1.0" rel="3"/>
    <file>/a/x</file>
    <file type="dir">/a/y</file>
    <file type="ghost">/b/z</file>
  </package>
</filelists>
"#;

    #[test]
    fn identity_from_attributes() {
        let mut sink = Collector::default();
        parse(DOC.as_bytes(), &mut sink).unwrap();

        assert_eq!(sink.expected, Some(1));
        assert_eq!(sink.packages.len(), 1);

        let pkg = &sink.packages[0];
        assert_eq!(pkg.pkg_id(), Some("aaaa"));
        assert_eq!(pkg.opt_text(pkg.name), Some("foo"));
        assert_eq!(pkg.opt_text(pkg.arch), Some("x86_64"));
        assert_eq!(pkg.opt_text(pkg.version), Some("1.0"));
    }

    #[test]
    fn files_in_source_order_with_types() {
        let mut sink = Collector::default();
        parse(DOC.as_bytes(), &mut sink).unwrap();

        let pkg = &sink.packages[0];
        let files: Vec<(&str, FileType)> = pkg
            .files
            .iter()
            .map(|f| (pkg.text(f.name), f.kind))
            .collect();
        assert_eq!(
            files,
            vec![
                ("/a/x", FileType::File),
                ("/a/y", FileType::Dir),
                ("/b/z", FileType::Ghost),
            ]
        );
    }

    #[test]
    fn type_does_not_leak_between_files() {
        let doc = r#"<filelists packages="1">
  <package pkgid="cccc" name="n" arch="noarch">
    <file type="dir">/d</file>
    <file>/plain</file>
  </package>
</filelists>"#;
        let mut sink = Collector::default();
        parse(doc.as_bytes(), &mut sink).unwrap();

        let pkg = &sink.packages[0];
        assert_eq!(pkg.files[0].kind, FileType::Dir);
        assert_eq!(pkg.files[1].kind, FileType::File);
    }
}
