//! Other schema: changelog history per package.

use rusqlite::{Connection, Statement, params};

use crate::package::Package;
use crate::reporter::{LogLevel, Reporter};

pub(crate) fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE packages (
            pkgKey INTEGER PRIMARY KEY,
            pkgId TEXT
        );

        CREATE TABLE changelog (
            pkgKey INTEGER,
            author TEXT,
            date INTEGER,
            changelog TEXT
        );

        CREATE TRIGGER remove_changelogs AFTER DELETE ON packages
        BEGIN
            DELETE FROM changelog WHERE pkgKey = old.pkgKey;
        END;
        ",
    )
}

pub(crate) fn create_indexes(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS keychange ON changelog (pkgKey);
        CREATE INDEX IF NOT EXISTS pkgId ON packages (pkgId);
        ",
    )
}

/// Prepared insert statements for one other-schema ingest.
pub(crate) struct OtherWriter<'conn> {
    package: Statement<'conn>,
    changelog: Statement<'conn>,
}

impl<'conn> OtherWriter<'conn> {
    pub(crate) fn prepare(conn: &'conn Connection) -> rusqlite::Result<Self> {
        Ok(Self {
            package: conn.prepare("INSERT INTO packages (pkgId) VALUES (?)")?,
            changelog: conn.prepare(
                "INSERT INTO changelog (pkgKey, author, date, changelog) VALUES (?, ?, ?, ?)",
            )?,
        })
    }

    /// Writes the package row and its changelog rows in source order
    /// (earliest entry first, as the parser delivers them).
    pub(crate) fn write(
        &mut self,
        conn: &Connection,
        package: &mut Package,
        reporter: &dyn Reporter,
    ) -> rusqlite::Result<()> {
        self.package.execute(params![package.pkg_id()])?;
        package.pkg_key = conn.last_insert_rowid();

        for entry in &package.changelogs {
            let result = self.changelog.execute(params![
                package.pkg_key,
                package.opt_text(entry.author),
                entry.date,
                package.opt_text(entry.text),
            ]);
            if let Err(e) = result {
                reporter.log(LogLevel::Error, &format!("error adding changelog to SQL: {e}"));
            }
        }

        Ok(())
    }
}
