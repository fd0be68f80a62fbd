//! repomd-cache
//!
//! Turns the three XML metadata documents of an RPM repository (`primary`,
//! `filelists`, and `other`) into three SQLite cache databases that package
//! resolvers query instead of re-parsing XML.
//!
//! # Overview
//!
//! Each [`update_primary`], [`update_filelist`], or [`update_other`] call
//! transforms one document into `"<md_filename>.sqlite"` next to it. The
//! caller supplies an opaque checksum of the document; a cache whose stored
//! schema version and checksum both match is returned untouched, anything
//! else is rebuilt from scratch. Within a rebuild over an existing cache the
//! XML is authoritative: new packages are inserted, vanished packages are
//! deleted (child rows cascade), unchanged packages keep their row key.
//!
//! # Architecture
//!
//! - **Streaming parsers**: each document type has an explicit SAX-style
//!   state machine; a package is fully assembled in memory, handed to the
//!   updater, and dropped before the next one starts.
//! - **Per-package arenas**: all of a package's strings live in one
//!   append-only buffer ([`Arena`]) addressed by [`Str`] handles, released
//!   as a unit.
//! - **One orchestration, three schemas**: the update procedure is generic
//!   over a trait bundling schema DDL, prepared statements, parser, and
//!   writer.
//!
//! Hosts observe progress and log output through the [`Reporter`] trait;
//! [`TracingReporter`] forwards logs to `tracing` by default.
//!
//! ```no_run
//! use repomd_cache::update_primary;
//!
//! let cache = update_primary("repodata/primary.xml", "3f1-checksum")?;
//! println!("resolver can now open {}", cache.display());
//! # Ok::<(), repomd_cache::CacheError>(())
//! ```

mod arena;
mod db;
mod error;
mod package;
mod reporter;
mod update;
mod xml;

use std::path::{Path, PathBuf};

pub use arena::{Arena, Str};
pub use db::filelists::{EncodedDir, decode, encode_files};
pub use db::{DB_VERSION, cache_filename};
pub use error::{CacheError, ParseError};
pub use package::{ChangelogEntry, Dependency, FileType, Package, PackageFile};
pub use reporter::{LogLevel, Reporter, TracingReporter};

use update::{FilelistsCache, OtherCache, PrimaryCache};

/// Builds or refreshes the cache for a `primary.xml` document.
///
/// Returns the cache path (`"<md_filename>.sqlite"`). `checksum` is an
/// opaque fingerprint of the document chosen by the caller; it is only
/// compared for equality against the value stored in the cache.
pub fn update_primary(
    md_filename: impl AsRef<Path>,
    checksum: &str,
) -> Result<PathBuf, CacheError> {
    update_primary_with(md_filename, checksum, &TracingReporter)
}

/// [`update_primary`] with an explicit [`Reporter`] for log and progress
/// callbacks.
pub fn update_primary_with(
    md_filename: impl AsRef<Path>,
    checksum: &str,
    reporter: &dyn Reporter,
) -> Result<PathBuf, CacheError> {
    update::run_update::<PrimaryCache>(md_filename.as_ref(), checksum, reporter)
}

/// Builds or refreshes the cache for a `filelists.xml` document.
pub fn update_filelist(
    md_filename: impl AsRef<Path>,
    checksum: &str,
) -> Result<PathBuf, CacheError> {
    update_filelist_with(md_filename, checksum, &TracingReporter)
}

/// [`update_filelist`] with an explicit [`Reporter`].
pub fn update_filelist_with(
    md_filename: impl AsRef<Path>,
    checksum: &str,
    reporter: &dyn Reporter,
) -> Result<PathBuf, CacheError> {
    update::run_update::<FilelistsCache>(md_filename.as_ref(), checksum, reporter)
}

/// Builds or refreshes the cache for an `other.xml` document.
pub fn update_other(
    md_filename: impl AsRef<Path>,
    checksum: &str,
) -> Result<PathBuf, CacheError> {
    update_other_with(md_filename, checksum, &TracingReporter)
}

/// [`update_other`] with an explicit [`Reporter`].
pub fn update_other_with(
    md_filename: impl AsRef<Path>,
    checksum: &str,
    reporter: &dyn Reporter,
) -> Result<PathBuf, CacheError> {
    update::run_update::<OtherCache>(md_filename.as_ref(), checksum, reporter)
}
