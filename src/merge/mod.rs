//! Selective extraction of a theme archive into the skins folder.
//!
//! A theme archive usually wraps its content in a versioned top-level folder
//! (`Metro for Steam 4.2.1/...`). Merging installs that content under the
//! stable `<skins>/<theme_name>` folder instead, and leaves a user's
//! customisation file alone when it is at least as new as the packaged one.
//!
//! Merging is split in two steps:
//!
//! 1. [`MergePlanner::plan`] selects the entries, computes each entry's
//!    effective name and decides whether to write or skip it. This only reads
//!    the filesystem.
//! 2. [`MergePlanner::execute`] carries out a [`MergePlan`], writing through
//!    an [`ArchiveReader`] and counting what happened.
//!
//! # Selection and remapping
//!
//! - Entries whose name starts with `theme_name` are selected
//! - The root folder is the directory part of the first entry (in archive
//!   order) whose name contains `theme_name`
//! - A non-empty root folder prefix is replaced by `theme_name`
//!
//! # Customisation files
//!
//! An entry whose effective name contains [`PROTECTED_TOKEN`] is skipped when
//! the file already exists and its modification time is greater than or
//! equal to the entry's. Every written file gets the entry's modification
//! time, so merging the same archive twice skips these files the second time.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::{debug, info};

use crate::archive::{ArchiveEntry, ArchiveError, ArchiveReader};

/// Name fragment identifying user customisation files.
pub const PROTECTED_TOKEN: &str = "custom.styles";

/// Errors that abort a merge.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The archive could not be opened or read.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// An entry would be written outside the target folder.
    #[error("archive entry '{name}' escapes the target folder")]
    UnsafePath {
        /// Effective entry name
        name: String,
    },

    /// Writing to the target folder failed.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// Path being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// What to do with one selected entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    /// Create the directory or write the file.
    Write,
    /// Keep the existing customisation file.
    Skip,
}

/// One selected entry and its planned action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    /// The archive entry.
    pub entry: ArchiveEntry,
    /// Name relative to the target root after remapping.
    pub effective_name: String,
    /// Write or skip.
    pub action: MergeAction,
}

impl PlannedEntry {
    /// Destination path under `target_root`.
    #[must_use]
    pub fn destination(&self, target_root: &Path) -> PathBuf {
        target_root.join(self.effective_name.trim_end_matches('/'))
    }
}

/// The result of planning a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    /// `target_root/theme_name`, created before any entry is written.
    pub theme_dir: PathBuf,
    /// Wrapper folder being replaced by the theme name, if any.
    pub root_folder: Option<String>,
    /// Selected entries in archive order.
    pub entries: Vec<PlannedEntry>,
}

/// Counts reported after a successful merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Files written.
    pub files_extracted: usize,
    /// Directories created.
    pub folders_extracted: usize,
    /// Customisation files left untouched.
    pub skipped: usize,
}

/// Plans and executes merges of one theme into one target folder.
#[derive(Debug, Clone)]
pub struct MergePlanner {
    theme_name: String,
    target_root: PathBuf,
}

impl MergePlanner {
    /// Creates a planner installing `theme_name` under `target_root`.
    pub fn new(theme_name: impl Into<String>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            theme_name: theme_name.into(),
            target_root: target_root.into(),
        }
    }

    /// Opens the archive at `archive_path`, plans and executes the merge.
    pub fn merge(&self, archive_path: &Path) -> Result<ExtractionResult, MergeError> {
        let mut reader = ArchiveReader::open(archive_path)?;
        let entries = reader.entries()?;
        let plan = self.plan(&entries)?;
        self.execute(&plan, &mut reader)
    }

    /// Computes the merge plan for `entries`.
    pub fn plan(&self, entries: &[ArchiveEntry]) -> Result<MergePlan, MergeError> {
        let root_folder = root_folder(entries, &self.theme_name);
        debug!("Theme root folder in archive: {:?}", root_folder);

        let mut planned = Vec::new();
        for entry in entries.iter().filter(|e| e.name.starts_with(&self.theme_name)) {
            let effective_name = effective_name(&entry.name, root_folder.as_deref(), &self.theme_name);
            if !is_safe_relative(&effective_name) {
                return Err(MergeError::UnsafePath {
                    name: effective_name,
                });
            }

            let action = if self.keeps_existing(entry, &effective_name) {
                MergeAction::Skip
            } else {
                MergeAction::Write
            };

            planned.push(PlannedEntry {
                entry: entry.clone(),
                effective_name,
                action,
            });
        }

        Ok(MergePlan {
            theme_dir: self.target_root.join(&self.theme_name),
            root_folder,
            entries: planned,
        })
    }

    /// Executes `plan`, reading entry content from `reader`.
    ///
    /// Stops at the first failure; no counts are reported in that case.
    pub fn execute(
        &self,
        plan: &MergePlan,
        reader: &mut ArchiveReader,
    ) -> Result<ExtractionResult, MergeError> {
        create_dir(&plan.theme_dir)?;

        let mut result = ExtractionResult::default();
        for planned in &plan.entries {
            let dest = planned.destination(&self.target_root);
            match planned.action {
                MergeAction::Skip => {
                    info!("Keeping customised {}", dest.display());
                    result.skipped += 1;
                }
                MergeAction::Write if planned.entry.is_directory => {
                    create_dir(&dest)?;
                    result.folders_extracted += 1;
                }
                MergeAction::Write => {
                    write_file(reader, &planned.entry, &dest)?;
                    result.files_extracted += 1;
                }
            }
        }

        info!(
            "Merged {} files and {} folders, skipped {}",
            result.files_extracted, result.folders_extracted, result.skipped
        );
        Ok(result)
    }

    fn keeps_existing(&self, entry: &ArchiveEntry, effective_name: &str) -> bool {
        if entry.is_directory || !effective_name.contains(PROTECTED_TOKEN) {
            return false;
        }
        let existing = self.target_root.join(effective_name);
        match fs::metadata(&existing).and_then(|m| m.modified()) {
            Ok(modified) => modified >= entry.last_modified,
            Err(_) => false,
        }
    }
}

/// Directory portion of the first entry whose name contains `theme_name`.
fn root_folder(entries: &[ArchiveEntry], theme_name: &str) -> Option<String> {
    entries
        .iter()
        .find(|e| e.name.contains(theme_name))
        .and_then(|e| e.name.rsplit_once('/').map(|(dir, _)| dir.to_string()))
        .filter(|dir| !dir.is_empty())
}

fn effective_name(name: &str, root_folder: Option<&str>, theme_name: &str) -> String {
    match root_folder.and_then(|root| name.strip_prefix(root)) {
        Some(rest) => format!("{theme_name}{rest}"),
        None => name.to_string(),
    }
}

fn is_safe_relative(name: &str) -> bool {
    Path::new(name).components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn create_dir(path: &Path) -> Result<(), MergeError> {
    fs::create_dir_all(path).map_err(|source| MergeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(reader: &mut ArchiveReader, entry: &ArchiveEntry, dest: &Path) -> Result<(), MergeError> {
    if let Some(parent) = dest.parent() {
        create_dir(parent)?;
    }
    let io_err = |source| MergeError::Io {
        path: dest.to_path_buf(),
        source,
    };

    let mut file = File::create(dest).map_err(io_err)?;
    reader.copy_entry(entry.index, &mut file)?;
    if entry.last_modified > SystemTime::UNIX_EPOCH {
        file.set_modified(entry.last_modified).map_err(io_err)?;
    }
    debug!("Wrote {}", dest.display());
    Ok(())
}
