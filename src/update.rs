//! Incremental cache update.
//!
//! One orchestration drives all three document types; everything that
//! differs between them (schema DDL, index DDL, the prepared statement set,
//! the parser, the per-package writer) is bundled behind [`CacheKind`].
//!
//! The XML is authoritative: packages it contains and the cache lacks are
//! inserted, packages the cache has and the XML lacks are deleted (the
//! cascade triggers take their child rows), and packages present in both are
//! left untouched, keeping their `pkgKey`.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use rusqlite::{Connection, Statement};

use crate::db::{self, filelists, other, primary};
use crate::error::{CacheError, ParseError};
use crate::package::Package;
use crate::reporter::{LogLevel, Reporter};
use crate::xml::{self, MetadataSink};

/// Everything one document type needs to become a cache database.
pub(crate) trait CacheKind {
    type Writer<'conn>;

    fn create_tables(conn: &Connection) -> rusqlite::Result<()>;
    fn create_indexes(conn: &Connection) -> rusqlite::Result<()>;
    fn prepare(conn: &Connection) -> rusqlite::Result<Self::Writer<'_>>;
    fn parse<R: BufRead>(reader: R, sink: &mut dyn MetadataSink) -> Result<(), ParseError>;
    fn write(
        writer: &mut Self::Writer<'_>,
        conn: &Connection,
        package: &mut Package,
        reporter: &dyn Reporter,
    ) -> rusqlite::Result<()>;
}

pub(crate) struct PrimaryCache;

impl CacheKind for PrimaryCache {
    type Writer<'conn> = primary::PrimaryWriter<'conn>;

    fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
        primary::create_tables(conn)
    }

    fn create_indexes(conn: &Connection) -> rusqlite::Result<()> {
        primary::create_indexes(conn)
    }

    fn prepare(conn: &Connection) -> rusqlite::Result<Self::Writer<'_>> {
        primary::PrimaryWriter::prepare(conn)
    }

    fn parse<R: BufRead>(reader: R, sink: &mut dyn MetadataSink) -> Result<(), ParseError> {
        xml::primary::parse(reader, sink)
    }

    fn write(
        writer: &mut Self::Writer<'_>,
        conn: &Connection,
        package: &mut Package,
        reporter: &dyn Reporter,
    ) -> rusqlite::Result<()> {
        writer.write(conn, package, reporter)
    }
}

pub(crate) struct FilelistsCache;

impl CacheKind for FilelistsCache {
    type Writer<'conn> = filelists::FilelistsWriter<'conn>;

    fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
        filelists::create_tables(conn)
    }

    fn create_indexes(conn: &Connection) -> rusqlite::Result<()> {
        filelists::create_indexes(conn)
    }

    fn prepare(conn: &Connection) -> rusqlite::Result<Self::Writer<'_>> {
        filelists::FilelistsWriter::prepare(conn)
    }

    fn parse<R: BufRead>(reader: R, sink: &mut dyn MetadataSink) -> Result<(), ParseError> {
        xml::filelists::parse(reader, sink)
    }

    fn write(
        writer: &mut Self::Writer<'_>,
        conn: &Connection,
        package: &mut Package,
        reporter: &dyn Reporter,
    ) -> rusqlite::Result<()> {
        writer.write(conn, package, reporter)
    }
}

pub(crate) struct OtherCache;

impl CacheKind for OtherCache {
    type Writer<'conn> = other::OtherWriter<'conn>;

    fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
        other::create_tables(conn)
    }

    fn create_indexes(conn: &Connection) -> rusqlite::Result<()> {
        other::create_indexes(conn)
    }

    fn prepare(conn: &Connection) -> rusqlite::Result<Self::Writer<'_>> {
        other::OtherWriter::prepare(conn)
    }

    fn parse<R: BufRead>(reader: R, sink: &mut dyn MetadataSink) -> Result<(), ParseError> {
        xml::other::parse(reader, sink)
    }

    fn write(
        writer: &mut Self::Writer<'_>,
        conn: &Connection,
        package: &mut Package,
        reporter: &dyn Reporter,
    ) -> rusqlite::Result<()> {
        writer.write(conn, package, reporter)
    }
}

/// Bookkeeping for one update run.
struct UpdateState<'conn> {
    remove: Statement<'conn>,
    /// `pkgId -> pkgKey` snapshot of the cache before this run.
    current: HashMap<String, i64>,
    /// Package ids seen in the XML so far.
    observed: HashSet<String>,
    expected: u32,
    seen: u32,
    added: u32,
    deleted: u32,
    started: Instant,
}

impl<'conn> UpdateState<'conn> {
    fn new(conn: &'conn Connection) -> rusqlite::Result<Self> {
        Ok(Self {
            remove: conn.prepare("DELETE FROM packages WHERE pkgKey = ?")?,
            current: db::read_package_ids(conn)?,
            observed: HashSet::new(),
            expected: 0,
            seen: 0,
            added: 0,
            deleted: 0,
            started: Instant::now(),
        })
    }

    /// Deletes every cached package whose id did not appear in this run's
    /// input. Runs after the bulk-load transaction has committed.
    fn remove_stale(&mut self, reporter: &dyn Reporter) {
        for (pkg_id, pkg_key) in &self.current {
            if self.observed.contains(pkg_id) {
                continue;
            }
            match self.remove.execute([*pkg_key]) {
                Ok(_) => self.deleted += 1,
                Err(e) => reporter.log(
                    LogLevel::Warning,
                    &format!("error removing package from SQL: {e}"),
                ),
            }
        }
    }
}

/// Adapter between a parser and the update bookkeeping.
struct UpdateSink<'a, 'conn, K: CacheKind> {
    conn: &'conn Connection,
    writer: &'a mut K::Writer<'conn>,
    state: &'a mut UpdateState<'conn>,
    reporter: &'a dyn Reporter,
}

impl<K: CacheKind> MetadataSink for UpdateSink<'_, '_, K> {
    fn expected_packages(&mut self, count: u32) {
        self.state.expected = count;
    }

    fn package(&mut self, mut package: Package) {
        self.state.seen += 1;

        // Packages without an id cannot be keyed; dropped silently.
        if let Some(id) = package.pkg_id().filter(|id| !id.is_empty()) {
            let id = id.to_owned();
            let known = self.state.current.contains_key(&id);
            self.state.observed.insert(id);

            if !known {
                match K::write(&mut *self.writer, self.conn, &mut package, self.reporter) {
                    Ok(()) => self.state.added += 1,
                    Err(e) => self
                        .reporter
                        .log(LogLevel::Error, &format!("error adding package to SQL: {e}")),
                }
            }
        }

        if self.state.expected > 0 {
            self.reporter.progress(self.state.seen, self.state.expected);
        }
    }

    fn warning(&mut self, message: &str) {
        self.reporter.log(LogLevel::Warning, message);
    }
}

/// Runs a full update of one cache database.
pub(crate) fn run_update<K: CacheKind>(
    md_filename: &Path,
    checksum: &str,
    reporter: &dyn Reporter,
) -> Result<PathBuf, CacheError> {
    let cache_path = db::cache_filename(md_filename);

    let conn = match db::open_cache(&cache_path, checksum, K::create_tables, reporter) {
        // Stored version and checksum match: the cache is already current.
        Ok(None) => return Ok(cache_path),
        Ok(Some(conn)) => conn,
        Err(e) => {
            let _ = fs::remove_file(&cache_path);
            return Err(e);
        }
    };

    let result = ingest::<K>(&conn, md_filename, checksum, reporter);

    if let Err((_conn, e)) = conn.close() {
        reporter.log(
            LogLevel::Error,
            &format!("error closing cache database: {e}"),
        );
        let _ = fs::remove_file(&cache_path);
    }

    match result {
        Ok(()) => Ok(cache_path),
        Err(e) => {
            let _ = fs::remove_file(&cache_path);
            Err(e)
        }
    }
}

fn ingest<K: CacheKind>(
    conn: &Connection,
    md_filename: &Path,
    checksum: &str,
    reporter: &dyn Reporter,
) -> Result<(), CacheError> {
    let mut state = UpdateState::new(conn)?;
    let mut writer = K::prepare(conn)?;

    let file = File::open(md_filename)?;
    let tx = conn.unchecked_transaction()?;
    {
        let mut sink = UpdateSink::<K> {
            conn,
            writer: &mut writer,
            state: &mut state,
            reporter,
        };
        // A parse failure drops `tx` unCommitted, rolling the bulk load back.
        K::parse(BufReader::new(file), &mut sink)?;
    }
    tx.commit()?;

    K::create_indexes(conn)?;
    state.remove_stale(reporter);
    db::write_db_info(conn, checksum)?;

    reporter.log(
        LogLevel::Info,
        &format!(
            "Added {} new packages, deleted {} old in {:.2} seconds",
            state.added,
            state.deleted,
            state.started.elapsed().as_secs_f64()
        ),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::TracingReporter;
    use std::io::Write;
    use tempfile::tempdir;

    fn primary_doc(packages: &[(&str, &str)]) -> String {
        let mut doc = format!(
            r#"<metadata xmlns:rpm="http://linux.duke.edu/metadata/rpm" packages="{}">"#,
            packages.len()
        );
        for (pkg_id, name) in packages {
            doc.push_str(&format!(
                "<package><name>{name}</name><arch>x86_64</arch>\
                 <checksum type=\"sha\">{pkg_id}</checksum>\
                 <format><rpm:provides><rpm:entry name=\"{name}\"/></rpm:provides>\
                 <file>/usr/bin/{name}</file></format></package>"
            ));
        }
        doc.push_str("</metadata>");
        doc
    }

    fn write_doc(dir: &Path, filename: &str, contents: &str) -> PathBuf {
        let path = dir.join(filename);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn ingest_setup(conn: &Connection) {
        conn.execute_batch("CREATE TABLE db_info (dbversion INTEGER, checksum TEXT);")
            .unwrap();
        primary::create_tables(conn).unwrap();
    }

    fn pkg_ids(conn: &Connection) -> Vec<(String, i64)> {
        let mut stmt = conn
            .prepare("SELECT pkgId, pkgKey FROM packages ORDER BY pkgKey")
            .unwrap();
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        rows.collect::<rusqlite::Result<_>>().unwrap()
    }

    // Running two ingests over one open cache exercises the reconciliation
    // path: survivors keep their key, stale rows and their children go.
    #[test]
    fn reconcile_preserves_survivors_and_drops_stale() {
        let dir = tempdir().unwrap();
        let d1 = write_doc(dir.path(), "d1.xml", &primary_doc(&[("aaaa", "foo"), ("bbbb", "bar")]));
        let d2 = write_doc(dir.path(), "d2.xml", &primary_doc(&[("bbbb", "bar"), ("cccc", "baz")]));

        let conn = Connection::open(dir.path().join("cache.sqlite")).unwrap();
        ingest_setup(&conn);

        ingest::<PrimaryCache>(&conn, &d1, "c1", &TracingReporter).unwrap();
        assert_eq!(
            pkg_ids(&conn),
            vec![("aaaa".to_owned(), 1), ("bbbb".to_owned(), 2)]
        );

        ingest::<PrimaryCache>(&conn, &d2, "c2", &TracingReporter).unwrap();
        // bbbb kept pkgKey 2 (no rewrite); cccc appended; aaaa gone.
        assert_eq!(
            pkg_ids(&conn),
            vec![("bbbb".to_owned(), 2), ("cccc".to_owned(), 3)]
        );

        // The cascade trigger removed aaaa's children.
        let orphans: i64 = conn
            .query_row(
                "SELECT count(*) FROM files WHERE pkgKey NOT IN (SELECT pkgKey FROM packages)",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
        let provides: i64 = conn
            .query_row("SELECT count(*) FROM provides", [], |r| r.get(0))
            .unwrap();
        assert_eq!(provides, 2);
    }

    #[test]
    fn unchanged_input_rewrites_nothing() {
        let dir = tempdir().unwrap();
        let doc = write_doc(dir.path(), "d.xml", &primary_doc(&[("aaaa", "foo")]));

        let conn = Connection::open(dir.path().join("cache.sqlite")).unwrap();
        ingest_setup(&conn);

        ingest::<PrimaryCache>(&conn, &doc, "c1", &TracingReporter).unwrap();
        let before = pkg_ids(&conn);

        ingest::<PrimaryCache>(&conn, &doc, "c1", &TracingReporter).unwrap();
        assert_eq!(pkg_ids(&conn), before);

        // One package, one provides row: the second pass inserted nothing.
        let provides: i64 = conn
            .query_row("SELECT count(*) FROM provides", [], |r| r.get(0))
            .unwrap();
        assert_eq!(provides, 1);
    }

    #[test]
    fn duplicate_pkg_ids_insert_twice() {
        let dir = tempdir().unwrap();
        let doc = write_doc(dir.path(), "d.xml", &primary_doc(&[("aaaa", "foo"), ("aaaa", "foo")]));

        let conn = Connection::open(dir.path().join("cache.sqlite")).unwrap();
        ingest_setup(&conn);

        ingest::<PrimaryCache>(&conn, &doc, "c1", &TracingReporter).unwrap();
        assert_eq!(pkg_ids(&conn).len(), 2);
    }

    #[test]
    fn package_without_id_is_skipped() {
        let dir = tempdir().unwrap();
        let doc = write_doc(
            dir.path(),
            "d.xml",
            r#"<metadata packages="2"><package><name>anon</name></package>
               <package><name>ok</name><checksum type="sha">aaaa</checksum></package></metadata>"#,
        );

        let conn = Connection::open(dir.path().join("cache.sqlite")).unwrap();
        ingest_setup(&conn);

        ingest::<PrimaryCache>(&conn, &doc, "c1", &TracingReporter).unwrap();
        assert_eq!(pkg_ids(&conn), vec![("aaaa".to_owned(), 1)]);
    }
}
