//! Cache database lifecycle.
//!
//! Each metadata document gets its own SQLite file at
//! `"<md_filename>.sqlite"`. A one-row `db_info` table records the schema
//! version and the checksum of the inputs the cache was built from; together
//! they decide whether an existing file is reusable, stale, or garbage.
//! There is no migration path: any mismatch discards the file and rebuilds.

pub(crate) mod filelists;
pub(crate) mod other;
pub(crate) mod primary;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::CacheError;
use crate::reporter::{LogLevel, Reporter};

/// Schema version stamped into `db_info.dbversion`. Caches written by any
/// other version are regenerated.
pub const DB_VERSION: i64 = 10;

/// Derives the cache path for a metadata document: the document path with
/// `.sqlite` appended (`repodata/primary.xml` → `repodata/primary.xml.sqlite`).
pub fn cache_filename(md_filename: &Path) -> PathBuf {
    let mut name = md_filename.as_os_str().to_os_string();
    name.push(".sqlite");
    PathBuf::from(name)
}

/// Verdict on an existing cache file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DbStatus {
    /// Schema version and checksum both match; the cache is current.
    Ok,
    VersionMismatch,
    ChecksumMismatch,
    /// Missing or unreadable `db_info`; treat the file as garbage.
    Error,
}

fn db_info_status(conn: &Connection, checksum: &str, reporter: &dyn Reporter) -> DbStatus {
    let Ok(mut stmt) = conn.prepare("SELECT dbversion, checksum FROM db_info") else {
        return DbStatus::Error;
    };
    let Ok(mut rows) = stmt.query([]) else {
        return DbStatus::Error;
    };

    let row = match rows.next() {
        Ok(Some(row)) => row,
        _ => return DbStatus::Error,
    };
    let (Ok(dbversion), Ok(dbchecksum)) = (row.get::<_, i64>(0), row.get::<_, String>(1)) else {
        return DbStatus::Error;
    };

    if dbversion != DB_VERSION {
        reporter.log(
            LogLevel::Info,
            &format!("cache file is version {dbversion}, we need {DB_VERSION}, will regenerate"),
        );
        DbStatus::VersionMismatch
    } else if dbchecksum != checksum {
        reporter.log(
            LogLevel::Info,
            "sqlite cache needs updating, reading in metadata",
        );
        DbStatus::ChecksumMismatch
    } else {
        DbStatus::Ok
    }
}

fn create_db_info_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("CREATE TABLE db_info (dbversion INTEGER, checksum TEXT);")
}

/// Opens the cache at `path`, applying the freshness decision table.
///
/// Returns `Ok(None)` when the existing cache already matches
/// `(DB_VERSION, checksum)`; the caller short-circuits without touching the
/// file. Otherwise returns a connection to a freshly created database with
/// `db_info` and the schema tables in place and `synchronous` off (the cache
/// is reproducible from the XML, so durability is traded for throughput).
pub(crate) fn open_cache(
    path: &Path,
    checksum: &str,
    create_tables: fn(&Connection) -> rusqlite::Result<()>,
    reporter: &dyn Reporter,
) -> Result<Option<Connection>, CacheError> {
    let existed = path.exists();

    let reusable = match Connection::open(path) {
        Ok(conn) if existed => {
            match db_info_status(&conn, checksum, reporter) {
                DbStatus::Ok => {
                    drop(conn);
                    return Ok(None);
                }
                DbStatus::VersionMismatch | DbStatus::ChecksumMismatch | DbStatus::Error => {
                    drop(conn);
                    let _ = fs::remove_file(path);
                    None
                }
            }
        }
        Ok(conn) => Some(conn),
        Err(_) => {
            // Possibly not a database at all; drop it and start over.
            let _ = fs::remove_file(path);
            None
        }
    };

    let conn = match reusable {
        Some(conn) => conn,
        None => Connection::open(path).map_err(CacheError::Database)?,
    };

    create_db_info_table(&conn)?;
    create_tables(&conn)?;
    conn.execute_batch("PRAGMA synchronous = 0;")?;

    Ok(Some(conn))
}

/// Stamps the cache as built: replaces the `db_info` row with the current
/// schema version and the checksum this run was keyed on.
pub(crate) fn write_db_info(conn: &Connection, checksum: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM db_info", [])?;
    conn.execute(
        "INSERT INTO db_info (dbversion, checksum) VALUES (?1, ?2)",
        rusqlite::params![DB_VERSION, checksum],
    )?;
    Ok(())
}

/// Loads the `pkgId -> pkgKey` mapping for every package already cached.
pub(crate) fn read_package_ids(conn: &Connection) -> rusqlite::Result<HashMap<String, i64>> {
    let mut stmt = conn.prepare("SELECT pkgId, pkgKey FROM packages")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    rows.collect()
}
