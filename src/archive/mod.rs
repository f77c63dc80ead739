//! Read-only access to zip archives.
//!
//! [`ArchiveReader`] lists the entries of a local archive as plain
//! [`ArchiveEntry`] values and copies an entry's bytes into any writer. Callers
//! never touch `zip` types directly, so planning code and tests work with
//! ordinary structs.
//!
//! Zip archives store modification times as local DOS timestamps with two
//! second resolution. They are converted to [`SystemTime`] in the local time
//! zone. A time skipped by a daylight saving change is moved forward by an
//! hour; entries without a valid date report the Unix epoch.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{Local, NaiveDate, NaiveDateTime, TimeDelta};
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

/// Errors raised while reading an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive file could not be opened.
    #[error("failed to open archive {}: {source}", path.display())]
    Open {
        /// Archive path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The file is not a readable zip archive.
    #[error("{} is not a valid zip archive: {source}", path.display())]
    Corrupt {
        /// Archive path
        path: PathBuf,
        /// Underlying zip error
        #[source]
        source: ZipError,
    },

    /// An entry header could not be read.
    #[error("failed to read archive entry #{index}: {source}")]
    Entry {
        /// Position of the entry in the archive
        index: usize,
        /// Underlying zip error
        #[source]
        source: ZipError,
    },

    /// Copying an entry's content failed.
    #[error("failed to copy archive entry '{name}': {source}")]
    Copy {
        /// Entry name
        name: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Metadata of one archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Position in the archive, used to fetch the content.
    pub index: usize,
    /// Archive-relative name with forward slashes.
    pub name: String,
    /// Whether the entry is a directory.
    pub is_directory: bool,
    /// Modification time recorded in the archive.
    pub last_modified: SystemTime,
    /// Uncompressed size in bytes.
    pub size: u64,
}

/// An open zip archive.
pub struct ArchiveReader {
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl std::fmt::Debug for ArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("path", &self.path)
            .field("entries", &self.archive.len())
            .finish()
    }
}

impl ArchiveReader {
    /// Opens the archive at `path` and reads its central directory.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|source| ArchiveError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let archive = ZipArchive::new(file).map_err(|source| ArchiveError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Opened {} with {} entries", path.display(), archive.len());
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    /// Number of entries in the archive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Whether the archive has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Lists all entries in archive order.
    pub fn entries(&mut self) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        (0..self.archive.len())
            .map(|index| {
                let file = self.archive.by_index(index).map_err(|source| ArchiveError::Entry {
                    index,
                    source,
                })?;
                Ok(ArchiveEntry {
                    index,
                    name: file.name().replace('\\', "/"),
                    is_directory: file.is_dir(),
                    last_modified: file.last_modified().map_or(SystemTime::UNIX_EPOCH, dos_to_system_time),
                    size: file.size(),
                })
            })
            .collect()
    }

    /// Decompresses the entry at `index` into `writer`, returning the number
    /// of bytes written.
    pub fn copy_entry(&mut self, index: usize, writer: &mut dyn Write) -> Result<u64, ArchiveError> {
        let mut file = self.archive.by_index(index).map_err(|source| ArchiveError::Entry {
            index,
            source,
        })?;
        let name = file.name().to_string();
        io::copy(&mut file, writer).map_err(|source| ArchiveError::Copy {
            name,
            source,
        })
    }
}

fn dos_to_system_time(dt: zip::DateTime) -> SystemTime {
    NaiveDate::from_ymd_opt(i32::from(dt.year()), u32::from(dt.month()), u32::from(dt.day()))
        .and_then(|date| {
            date.and_hms_opt(u32::from(dt.hour()), u32::from(dt.minute()), u32::from(dt.second()))
        })
        .map_or(SystemTime::UNIX_EPOCH, local_to_system_time)
}

fn local_to_system_time(naive: NaiveDateTime) -> SystemTime {
    naive
        .and_local_timezone(Local)
        .earliest()
        .or_else(|| (naive + TimeDelta::hours(1)).and_local_timezone(Local).earliest())
        .map_or_else(|| SystemTime::from(naive.and_utc()), SystemTime::from)
}
