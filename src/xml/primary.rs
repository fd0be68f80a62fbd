//! Parser for `primary.xml`.
//!
//! Four states: toplevel, inside `<package>`, inside `<format>`, inside one
//! of the dependency lists. Package identity text fields are captured on end
//! elements from the accumulated text buffer; version, time, size and
//! location arrive as attributes.

use std::io::BufRead;

use quick_xml::events::BytesStart;

use super::{
    MetadataSink, SaxParser, announce_count, apply_version_attrs, drive, for_each_attr, parse_i64,
};
use crate::arena::Str;
use crate::error::ParseError;
use crate::package::{Dependency, FileType, Package, PackageFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Toplevel,
    Package,
    Format,
    Dep,
}

#[derive(Debug, Clone, Copy)]
enum DepList {
    Requires,
    Provides,
    Conflicts,
    Obsoletes,
}

struct PrimaryParser {
    state: State,
    text: String,
    package: Option<Package>,
    dep_list: DepList,
    /// Explicit `type` attribute of an open `<file>`, if any.
    file_type: Option<FileType>,
}

/// Parses a primary document, emitting packages into `sink`.
pub(crate) fn parse<R: BufRead>(
    reader: R,
    sink: &mut dyn MetadataSink,
) -> Result<(), ParseError> {
    let mut parser = PrimaryParser {
        state: State::Toplevel,
        text: String::new(),
        package: None,
        dep_list: DepList::Requires,
        file_type: None,
    };
    drive(reader, &mut parser, sink)
}

impl SaxParser for PrimaryParser {
    fn start(
        &mut self,
        event: &BytesStart<'_>,
        sink: &mut dyn MetadataSink,
    ) -> Result<(), ParseError> {
        self.text.clear();
        match self.state {
            State::Toplevel => self.toplevel_start(event, sink),
            State::Package => self.package_start(event),
            State::Format => self.format_start(event),
            State::Dep => self.dep_start(event),
        }
    }

    fn end(&mut self, name: &[u8], sink: &mut dyn MetadataSink) {
        match self.state {
            State::Toplevel => {}
            State::Package => self.package_end(name, sink),
            State::Format => self.format_end(name),
            State::Dep => {
                if name != b"rpm:entry" {
                    self.state = State::Format;
                }
            }
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

impl PrimaryParser {
    fn toplevel_start(
        &mut self,
        event: &BytesStart<'_>,
        sink: &mut dyn MetadataSink,
    ) -> Result<(), ParseError> {
        match event.name().as_ref() {
            b"package" => {
                self.package = Some(Package::new());
                self.state = State::Package;
                Ok(())
            }
            b"metadata" => announce_count(event, sink),
            _ => Ok(()),
        }
    }

    fn package_start(&mut self, event: &BytesStart<'_>) -> Result<(), ParseError> {
        let Some(package) = self.package.as_mut() else {
            return Ok(());
        };

        match event.name().as_ref() {
            b"format" => {
                self.state = State::Format;
                Ok(())
            }
            b"version" => apply_version_attrs(event, package),
            b"checksum" => for_each_attr(event, |key, value| {
                if key == b"type" {
                    package.checksum_type = Some(package.intern(value));
                }
            }),
            b"time" => for_each_attr(event, |key, value| match key {
                b"file" => package.time_file = parse_i64(value),
                b"build" => package.time_build = parse_i64(value),
                _ => {}
            }),
            b"size" => for_each_attr(event, |key, value| match key {
                b"package" => package.size_package = parse_i64(value),
                b"installed" => package.size_installed = parse_i64(value),
                b"archive" => package.size_archive = parse_i64(value),
                _ => {}
            }),
            b"location" => for_each_attr(event, |key, value| match key {
                b"href" => package.location_href = Some(package.intern(value)),
                b"xml:base" => package.location_base = Some(package.intern(value)),
                _ => {}
            }),
            _ => Ok(()),
        }
    }

    fn format_start(&mut self, event: &BytesStart<'_>) -> Result<(), ParseError> {
        let Some(package) = self.package.as_mut() else {
            return Ok(());
        };

        match event.name().as_ref() {
            b"rpm:header-range" => for_each_attr(event, |key, value| match key {
                b"start" => package.rpm_header_start = parse_i64(value),
                b"end" => package.rpm_header_end = parse_i64(value),
                _ => {}
            }),
            b"rpm:provides" => {
                self.state = State::Dep;
                self.dep_list = DepList::Provides;
                Ok(())
            }
            b"rpm:requires" => {
                self.state = State::Dep;
                self.dep_list = DepList::Requires;
                Ok(())
            }
            b"rpm:obsoletes" => {
                self.state = State::Dep;
                self.dep_list = DepList::Obsoletes;
                Ok(())
            }
            b"rpm:conflicts" => {
                self.state = State::Dep;
                self.dep_list = DepList::Conflicts;
                Ok(())
            }
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

    fn dep_start(&mut self, event: &BytesStart<'_>) -> Result<(), ParseError> {
        if event.name().as_ref() != b"rpm:entry" {
            return Ok(());
        }
        let Some(package) = self.package.as_mut() else {
            return Ok(());
        };

        let mut name: Option<Str> = None;
        let mut flags: Option<Str> = None;
        let mut epoch: Option<Str> = None;
        let mut version: Option<Str> = None;
        let mut release: Option<Str> = None;
        let mut pre = false;
        let mut ignore = false;

        for_each_attr(event, |key, value| match key {
            b"name" => {
                // rpmlib() pseudo-dependencies are rpm installer hints, not
                // resolvable packages.
                if value.starts_with("rpmlib(") {
                    ignore = true;
                } else {
                    name = Some(package.intern(value));
                }
            }
            b"flags" => flags = Some(package.intern(value)),
            b"epoch" => epoch = Some(package.intern(value)),
            b"ver" => version = Some(package.intern(value)),
            b"rel" => release = Some(package.intern(value)),
            // Presence alone marks a pre-install requirement.
            b"pre" => pre = true,
            _ => {}
        })?;

        if ignore {
            return Ok(());
        }
        let Some(name) = name else {
            return Ok(());
        };

        let dep = Dependency {
            name,
            flags,
            epoch,
            version,
            release,
            pre,
        };
        match self.dep_list {
            DepList::Requires => package.requires.push(dep),
            DepList::Provides => package.provides.push(dep),
            DepList::Conflicts => package.conflicts.push(dep),
            DepList::Obsoletes => package.obsoletes.push(dep),
        }
        Ok(())
    }

    fn package_end(&mut self, name: &[u8], sink: &mut dyn MetadataSink) {
        if name == b"package" {
            if let Some(package) = self.package.take() {
                sink.package(package);
            }
            self.state = State::Toplevel;
            return;
        }

        let Some(package) = self.package.as_mut() else {
            return;
        };
        if self.text.is_empty() {
            return;
        }

        match name {
            b"name" => package.name = Some(package.intern(&self.text)),
            b"arch" => package.arch = Some(package.intern(&self.text)),
            // The checksum text is the package's content-hash identity.
            b"checksum" => package.pkg_id = Some(package.intern(&self.text)),
            b"summary" => package.summary = Some(package.intern(&self.text)),
            b"description" => package.description = Some(package.intern(&self.text)),
            b"packager" => package.rpm_packager = Some(package.intern(&self.text)),
            b"url" => package.url = Some(package.intern(&self.text)),
            _ => {}
        }
    }

    fn format_end(&mut self, name: &[u8]) {
        let Some(package) = self.package.as_mut() else {
            return;
        };

        match name {
            b"rpm:license" => package.rpm_license = Some(package.intern(&self.text)),
            b"rpm:vendor" => package.rpm_vendor = Some(package.intern(&self.text)),
            b"rpm:group" => package.rpm_group = Some(package.intern(&self.text)),
            b"rpm:buildhost" => package.rpm_buildhost = Some(package.intern(&self.text)),
            b"rpm:sourcerpm" => package.rpm_sourcerpm = Some(package.intern(&self.text)),
            b"file" => {
                let kind = self.file_type.take().unwrap_or_default();
                let name = package.intern(&self.text);
                package.files.push(PackageFile { name, kind });
            }
            b"format" => self.state = State::Package,
            _ => {}
        }
    }
}
