//! Filelists schema and the packed per-directory file encoding.
//!
//! Instead of one row per file, the filelists cache stores one row per
//! directory: basenames joined with `/` and a parallel string of
//! one-character type codes. Packages routinely install hundreds of files
//! into a handful of directories, so this cuts row counts dramatically.

use std::collections::HashMap;

use rusqlite::{Connection, Statement, params};

use crate::package::{FileType, Package};
use crate::reporter::{LogLevel, Reporter};

pub(crate) fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE packages (
            pkgKey INTEGER PRIMARY KEY,
            pkgId TEXT
        );

        CREATE TABLE filelist (
            pkgKey INTEGER,
            dirname TEXT,
            filenames TEXT,
            filetypes TEXT
        );

        CREATE TRIGGER remove_filelist AFTER DELETE ON packages
        BEGIN
            DELETE FROM filelist WHERE pkgKey = old.pkgKey;
        END;
        ",
    )
}

pub(crate) fn create_indexes(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS keyfile ON filelist (pkgKey);
        CREATE INDEX IF NOT EXISTS pkgId ON packages (pkgId);
        CREATE INDEX IF NOT EXISTS dirnames ON filelist (dirname);
        ",
    )
}

/// One encoded directory group: `names` is the `/`-joined basenames in
/// insertion order, `types` holds one code character per basename.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EncodedDir {
    pub names: String,
    pub types: String,
}

/// Splits a path into (dirname, basename): `/usr/bin/foo` → `("/usr/bin",
/// "foo")`, `/foo` → `("/", "foo")`, a bare name → `(".", name)`.
fn split_path(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some(("", base)) => ("/", base),
        Some((dir, base)) => (dir, base),
        None => (".", path),
    }
}

/// Groups a package's files by parent directory, preserving first-seen
/// directory order and per-directory insertion order.
pub fn encode_files(package: &Package) -> Vec<(String, EncodedDir)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, EncodedDir)> = Vec::new();

    for file in &package.files {
        let (dir, base) = split_path(package.text(file.name));

        let slot = match index.get(dir) {
            Some(&slot) => slot,
            None => {
                index.insert(dir.to_owned(), groups.len());
                groups.push((dir.to_owned(), EncodedDir::default()));
                groups.len() - 1
            }
        };

        let enc = &mut groups[slot].1;
        if !enc.names.is_empty() {
            enc.names.push('/');
        }
        enc.names.push_str(base);
        enc.types.push(file.kind.code());
    }

    groups
}

/// Reverses [`encode_files`] for one row: yields `(full_path, type)` tuples
/// in their original insertion order. Unknown type codes decode as regular
/// files, mirroring the encoder's attribute handling.
pub fn decode(dirname: &str, filenames: &str, filetypes: &str) -> Vec<(String, FileType)> {
    let mut out = Vec::new();
    let mut codes = filetypes.chars();

    for base in filenames.split('/') {
        let kind = codes
            .next()
            .and_then(FileType::from_code)
            .unwrap_or_default();
        let path = if dirname == "/" {
            format!("/{base}")
        } else {
            format!("{dirname}/{base}")
        };
        out.push((path, kind));
    }

    out
}

/// Prepared insert statements for one filelists-schema ingest.
pub(crate) struct FilelistsWriter<'conn> {
    package: Statement<'conn>,
    filelist: Statement<'conn>,
}

impl<'conn> FilelistsWriter<'conn> {
    pub(crate) fn prepare(conn: &'conn Connection) -> rusqlite::Result<Self> {
        Ok(Self {
            package: conn.prepare("INSERT INTO packages (pkgId) VALUES (?)")?,
            filelist: conn.prepare(
                "INSERT INTO filelist (pkgKey, dirname, filenames, filetypes) VALUES (?, ?, ?, ?)",
            )?,
        })
    }

    pub(crate) fn write(
        &mut self,
        conn: &Connection,
        package: &mut Package,
        reporter: &dyn Reporter,
    ) -> rusqlite::Result<()> {
        self.package.execute(params![package.pkg_id()])?;
        package.pkg_key = conn.last_insert_rowid();

        for (dirname, enc) in encode_files(package) {
            let result = self.filelist.execute(params![
                package.pkg_key,
                dirname,
                enc.names,
                enc.types,
            ]);
            if let Err(e) = result {
                reporter.log(LogLevel::Error, &format!("error adding file to SQL: {e}"));
            }
        }

        Ok(())
    }
}
