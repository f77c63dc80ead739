//! Test fixtures for theme archives
//!
//! Archives are written with `zip::ZipWriter` so tests exercise the same
//! reader as production code.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

use chrono::{Local, NaiveDate};
use zip::DateTime;
use zip::write::SimpleFileOptions;

/// Timestamp used for entries added without an explicit one.
pub const DEFAULT_STAMP: (u16, u8, u8, u8, u8, u8) = (2024, 1, 15, 12, 0, 0);

#[derive(Clone, Debug)]
struct FixtureEntry {
    name: String,
    content: Option<Vec<u8>>,
    stamp: (u16, u8, u8, u8, u8, u8),
}

/// Builder for zip archives used as theme packages.
///
/// ```rust,no_run
/// use skin_updater::test_utils::ZipFixture;
///
/// # fn example(dir: &std::path::Path) -> anyhow::Result<()> {
/// ZipFixture::new()
///     .dir("Theme/A/sub/")
///     .file("Theme/A/file.txt", "content")
///     .write_to(&dir.join("theme.zip"))?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct ZipFixture {
    entries: Vec<FixtureEntry>,
}

impl ZipFixture {
    /// An empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// The layout of a typical theme release: a versioned wrapper folder with
    /// styles, a customisation file and a resource folder.
    pub fn theme_release(wrapper: &str) -> Self {
        Self::new()
            .dir(&format!("{wrapper}/"))
            .file(&format!("{wrapper}/steam.styles"), "steam styles")
            .file(&format!("{wrapper}/custom.styles"), "packaged custom styles")
            .dir(&format!("{wrapper}/resource/"))
            .file(&format!("{wrapper}/resource/menus.res"), "menus")
            .file("Extras/readme.txt", "not part of the theme")
    }

    /// Adds a directory entry.
    pub fn dir(mut self, name: &str) -> Self {
        self.entries.push(FixtureEntry {
            name: name.to_string(),
            content: None,
            stamp: DEFAULT_STAMP,
        });
        self
    }

    /// Adds a file entry with the default timestamp.
    pub fn file(self, name: &str, content: &str) -> Self {
        self.file_at(name, content, DEFAULT_STAMP)
    }

    /// Adds a file entry modified at `(year, month, day, hour, minute, second)`.
    pub fn file_at(mut self, name: &str, content: &str, stamp: (u16, u8, u8, u8, u8, u8)) -> Self {
        self.entries.push(FixtureEntry {
            name: name.to_string(),
            content: Some(content.as_bytes().to_vec()),
            stamp,
        });
        self
    }

    /// Writes the archive to `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create archive {}", path.display()))?;
        let mut zip = zip::ZipWriter::new(file);

        for entry in &self.entries {
            let (year, month, day, hour, minute, second) = entry.stamp;
            let stamp = DateTime::from_date_and_time(year, month, day, hour, minute, second)
                .map_err(|e| anyhow::anyhow!("Invalid fixture timestamp: {e}"))?;
            let options = SimpleFileOptions::default().last_modified_time(stamp);

            match &entry.content {
                Some(content) => {
                    zip.start_file(entry.name.as_str(), options)?;
                    zip.write_all(content)?;
                }
                None => zip.add_directory(entry.name.as_str(), options)?,
            }
        }

        zip.finish().context("Failed to finish archive")?;
        Ok(())
    }

    /// Writes the archive and returns its bytes, for serving over HTTP.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("fixture.zip");
        self.write_to(&path)?;
        Ok(std::fs::read(&path)?)
    }
}

/// The local-time [`SystemTime`] of a fixture timestamp, matching what the
/// archive reader reports for it.
pub fn stamp_to_system_time(stamp: (u16, u8, u8, u8, u8, u8)) -> Option<SystemTime> {
    let (year, month, day, hour, minute, second) = stamp;
    NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))?
        .and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second))?
        .and_local_timezone(Local)
        .earliest()
        .map(SystemTime::from)
}
