//! Package entity model.
//!
//! One [`Package`] holds everything a single `<package>` element of any of
//! the three metadata documents describes. All textual fields live in the
//! package's own [`Arena`]; the storage layer resolves the handles while the
//! package is still alive and binds the borrowed text directly into its
//! prepared statements.

use crate::arena::{Arena, Str};

/// File classification carried by the `type` attribute of `<file>` elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    #[default]
    File,
    Dir,
    Ghost,
}

impl FileType {
    /// Maps the attribute value; anything unrecognized counts as a regular
    /// file so the filelists type string stays aligned with the name list.
    pub fn from_attr(value: &str) -> Self {
        match value {
            "dir" => Self::Dir,
            "ghost" => Self::Ghost,
            _ => Self::File,
        }
    }

    /// Column value used by the primary schema's `files.type`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Dir => "dir",
            Self::Ghost => "ghost",
        }
    }

    /// Single-character code used by the filelists encoding.
    pub fn code(self) -> char {
        match self {
            Self::File => 'f',
            Self::Dir => 'd',
            Self::Ghost => 'g',
        }
    }

    /// Inverse of [`FileType::code`].
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'f' => Some(Self::File),
            'd' => Some(Self::Dir),
            'g' => Some(Self::Ghost),
            _ => None,
        }
    }
}

/// One `rpm:entry` of a provides/requires/conflicts/obsoletes list.
#[derive(Debug, Clone, Copy)]
pub struct Dependency {
    pub name: Str,
    /// Comparison flag (`EQ`, `LT`, `LE`, `GT`, `GE`) when versioned.
    pub flags: Option<Str>,
    pub epoch: Option<Str>,
    pub version: Option<Str>,
    pub release: Option<Str>,
    /// Pre-install requirement; only consulted for the `requires` table.
    pub pre: bool,
}

/// One `<file>` entry.
#[derive(Debug, Clone, Copy)]
pub struct PackageFile {
    /// Full path.
    pub name: Str,
    pub kind: FileType,
}

/// One `<changelog>` entry.
#[derive(Debug, Clone, Copy)]
pub struct ChangelogEntry {
    pub author: Option<Str>,
    /// Seconds since the epoch.
    pub date: i64,
    pub text: Option<Str>,
}

/// A package under construction by a parser, consumed once by the updater.
///
/// String fields are handles into `arena`; resolve them with
/// [`Package::text`]. Unset text fields stay `None` and reach the database
/// as SQL NULL. Numeric fields default to 0, matching the wire format's
/// absent-attribute behavior.
#[derive(Debug, Default)]
pub struct Package {
    arena: Arena,

    /// Storage row key, assigned by the database layer after the package row
    /// is inserted and referenced by every child row.
    pub pkg_key: i64,

    /// Content hash identifying the package across documents.
    pub pkg_id: Option<Str>,
    pub name: Option<Str>,
    pub arch: Option<Str>,
    pub epoch: Option<Str>,
    pub version: Option<Str>,
    pub release: Option<Str>,

    pub summary: Option<Str>,
    pub description: Option<Str>,
    pub url: Option<Str>,
    pub checksum_type: Option<Str>,

    pub rpm_license: Option<Str>,
    pub rpm_vendor: Option<Str>,
    pub rpm_group: Option<Str>,
    pub rpm_buildhost: Option<Str>,
    pub rpm_sourcerpm: Option<Str>,
    pub rpm_packager: Option<Str>,
    pub rpm_header_start: i64,
    pub rpm_header_end: i64,

    pub time_file: i64,
    pub time_build: i64,
    pub size_package: i64,
    pub size_installed: i64,
    pub size_archive: i64,

    pub location_href: Option<Str>,
    pub location_base: Option<Str>,

    pub requires: Vec<Dependency>,
    pub provides: Vec<Dependency>,
    pub conflicts: Vec<Dependency>,
    pub obsoletes: Vec<Dependency>,
    pub files: Vec<PackageFile>,
    pub changelogs: Vec<ChangelogEntry>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies `text` into this package's arena.
    pub fn intern(&mut self, text: &str) -> Str {
        self.arena.insert(text)
    }

    /// Resolves an arena handle owned by this package.
    pub fn text(&self, handle: Str) -> &str {
        self.arena.get(handle)
    }

    /// Resolves an optional handle.
    pub fn opt_text(&self, handle: Option<Str>) -> Option<&str> {
        handle.map(|h| self.arena.get(h))
    }

    /// The package's content-hash id, if the document provided one.
    pub fn pkg_id(&self) -> Option<&str> {
        self.opt_text(self.pkg_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interned_fields_resolve() {
        let mut pkg = Package::new();
        pkg.pkg_id = Some(pkg.intern("aaaa"));
        pkg.name = Some(pkg.intern("foo"));
        let dep_name = pkg.intern("bar");
        pkg.requires.push(Dependency {
            name: dep_name,
            flags: None,
            epoch: None,
            version: None,
            release: None,
            pre: false,
        });

        assert_eq!(pkg.pkg_id(), Some("aaaa"));
        assert_eq!(pkg.opt_text(pkg.name), Some("foo"));
        assert_eq!(pkg.text(pkg.requires[0].name), "bar");
        assert_eq!(pkg.opt_text(pkg.summary), None);
    }

    #[test]
    fn file_type_mapping() {
        assert_eq!(FileType::from_attr("dir"), FileType::Dir);
        assert_eq!(FileType::from_attr("ghost"), FileType::Ghost);
        assert_eq!(FileType::from_attr("file"), FileType::File);
        assert_eq!(FileType::from_attr("bogus"), FileType::File);
        assert_eq!(FileType::Ghost.code(), 'g');
        assert_eq!(FileType::from_code('d'), Some(FileType::Dir));
        assert_eq!(FileType::from_code('x'), None);
    }
}
