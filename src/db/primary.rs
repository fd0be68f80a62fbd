//! Primary schema: full package rows plus per-file and per-dependency
//! tables.

use rusqlite::{Connection, Statement, params};

use crate::package::{Dependency, Package};
use crate::reporter::{LogLevel, Reporter};

const DEP_TABLES: [&str; 4] = ["requires", "provides", "conflicts", "obsoletes"];

pub(crate) fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE packages (
            pkgKey INTEGER PRIMARY KEY,
            pkgId TEXT,
            name TEXT,
            arch TEXT,
            version TEXT,
            epoch TEXT,
            release TEXT,
            summary TEXT,
            description TEXT,
            url TEXT,
            time_file INTEGER,
            time_build INTEGER,
            rpm_license TEXT,
            rpm_vendor TEXT,
            rpm_group TEXT,
            rpm_buildhost TEXT,
            rpm_sourcerpm TEXT,
            rpm_header_start INTEGER,
            rpm_header_end INTEGER,
            rpm_packager TEXT,
            size_package INTEGER,
            size_installed INTEGER,
            size_archive INTEGER,
            location_href TEXT,
            location_base TEXT,
            checksum_type TEXT
        );

        CREATE TABLE files (
            name TEXT,
            type TEXT,
            pkgKey INTEGER
        );
        ",
    )?;

    for table in DEP_TABLES {
        // `requires` carries the pre-install marker; the text literals
        // TRUE/FALSE are what existing cache readers expect.
        let pre = if table == "requires" {
            ", pre BOOLEAN DEFAULT FALSE"
        } else {
            ""
        };
        conn.execute(
            &format!(
                "CREATE TABLE {table} (
                    name TEXT,
                    flags TEXT,
                    epoch TEXT,
                    version TEXT,
                    release TEXT,
                    pkgKey INTEGER{pre}
                )"
            ),
            [],
        )?;
    }

    conn.execute_batch(
        "
        CREATE TRIGGER removals AFTER DELETE ON packages
        BEGIN
            DELETE FROM files WHERE pkgKey = old.pkgKey;
            DELETE FROM requires WHERE pkgKey = old.pkgKey;
            DELETE FROM provides WHERE pkgKey = old.pkgKey;
            DELETE FROM conflicts WHERE pkgKey = old.pkgKey;
            DELETE FROM obsoletes WHERE pkgKey = old.pkgKey;
        END;
        ",
    )
}

/// Index creation is deferred until after the bulk load; maintaining them
/// during insertion roughly doubles ingest time on large repositories.
pub(crate) fn create_indexes(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS packagename ON packages (name);
        CREATE INDEX IF NOT EXISTS packageId ON packages (pkgId);
        CREATE INDEX IF NOT EXISTS filenames ON files (name);
        CREATE INDEX IF NOT EXISTS pkgfiles ON files (pkgKey);
        CREATE INDEX IF NOT EXISTS pkgrequires ON requires (pkgKey);
        CREATE INDEX IF NOT EXISTS requiresname ON requires (name);
        CREATE INDEX IF NOT EXISTS pkgprovides ON provides (pkgKey);
        CREATE INDEX IF NOT EXISTS providesname ON provides (name);
        CREATE INDEX IF NOT EXISTS pkgconflicts ON conflicts (pkgKey);
        CREATE INDEX IF NOT EXISTS pkgobsoletes ON obsoletes (pkgKey);
        ",
    )
}

/// Prepared insert statements for one primary-schema ingest.
///
/// All text bindings borrow from the arena-backed package, so each statement
/// is stepped and reset before the package is dropped.
pub(crate) struct PrimaryWriter<'conn> {
    package: Statement<'conn>,
    requires: Statement<'conn>,
    provides: Statement<'conn>,
    conflicts: Statement<'conn>,
    obsoletes: Statement<'conn>,
    files: Statement<'conn>,
}

impl<'conn> PrimaryWriter<'conn> {
    pub(crate) fn prepare(conn: &'conn Connection) -> rusqlite::Result<Self> {
        Ok(Self {
            package: conn.prepare(
                "INSERT INTO packages (
                    pkgId, name, arch, version, epoch, release, summary, description,
                    url, time_file, time_build, rpm_license, rpm_vendor, rpm_group,
                    rpm_buildhost, rpm_sourcerpm, rpm_header_start, rpm_header_end,
                    rpm_packager, size_package, size_installed, size_archive,
                    location_href, location_base, checksum_type
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?,
            requires: conn.prepare(
                "INSERT INTO requires (name, flags, epoch, version, release, pkgKey, pre)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )?,
            provides: conn.prepare(
                "INSERT INTO provides (name, flags, epoch, version, release, pkgKey)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )?,
            conflicts: conn.prepare(
                "INSERT INTO conflicts (name, flags, epoch, version, release, pkgKey)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )?,
            obsoletes: conn.prepare(
                "INSERT INTO obsoletes (name, flags, epoch, version, release, pkgKey)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )?,
            files: conn.prepare("INSERT INTO files (name, type, pkgKey) VALUES (?, ?, ?)")?,
        })
    }

    /// Writes one package row and all of its child rows, assigning
    /// `package.pkg_key` from the inserted row id.
    ///
    /// Returns `Err` only when the package row itself fails; its child rows
    /// are then skipped, since a key-less child set is worse than none.
    /// Individual child failures are logged and the remainder continues.
    pub(crate) fn write(
        &mut self,
        conn: &Connection,
        package: &mut Package,
        reporter: &dyn Reporter,
    ) -> rusqlite::Result<()> {
        self.package.execute(params![
            package.pkg_id(),
            package.opt_text(package.name),
            package.opt_text(package.arch),
            package.opt_text(package.version),
            package.opt_text(package.epoch),
            package.opt_text(package.release),
            package.opt_text(package.summary),
            package.opt_text(package.description),
            package.opt_text(package.url),
            package.time_file,
            package.time_build,
            package.opt_text(package.rpm_license),
            package.opt_text(package.rpm_vendor),
            package.opt_text(package.rpm_group),
            package.opt_text(package.rpm_buildhost),
            package.opt_text(package.rpm_sourcerpm),
            package.rpm_header_start,
            package.rpm_header_end,
            package.opt_text(package.rpm_packager),
            package.size_package,
            package.size_installed,
            package.size_archive,
            package.opt_text(package.location_href),
            package.opt_text(package.location_base),
            package.opt_text(package.checksum_type),
        ])?;
        package.pkg_key = conn.last_insert_rowid();

        write_deps(
            &mut self.requires,
            package,
            &package.requires,
            true,
            reporter,
        );
        write_deps(
            &mut self.provides,
            package,
            &package.provides,
            false,
            reporter,
        );
        write_deps(
            &mut self.conflicts,
            package,
            &package.conflicts,
            false,
            reporter,
        );
        write_deps(
            &mut self.obsoletes,
            package,
            &package.obsoletes,
            false,
            reporter,
        );

        for file in &package.files {
            let result = self.files.execute(params![
                package.text(file.name),
                file.kind.as_str(),
                package.pkg_key,
            ]);
            if let Err(e) = result {
                reporter.log(LogLevel::Error, &format!("error adding package file to SQL: {e}"));
            }
        }

        Ok(())
    }
}

fn write_deps(
    stmt: &mut Statement<'_>,
    package: &Package,
    deps: &[Dependency],
    is_requires: bool,
    reporter: &dyn Reporter,
) {
    for dep in deps {
        let result = if is_requires {
            stmt.execute(params![
                package.text(dep.name),
                package.opt_text(dep.flags),
                package.opt_text(dep.epoch),
                package.opt_text(dep.version),
                package.opt_text(dep.release),
                package.pkg_key,
                if dep.pre { "TRUE" } else { "FALSE" },
            ])
        } else {
            stmt.execute(params![
                package.text(dep.name),
                package.opt_text(dep.flags),
                package.opt_text(dep.epoch),
                package.opt_text(dep.version),
                package.opt_text(dep.release),
                package.pkg_key,
            ])
        };
        if let Err(e) = result {
            reporter.log(LogLevel::Error, &format!("error adding dependency to SQL: {e}"));
        }
    }
}
