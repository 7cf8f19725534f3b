//! Artifact merging: combining a run's week artifacts with any pre-existing
//! on-disk state.
//!
//! Three artifacts with divergent merge rules: the narrative replaces
//! overlapping week sections, the changelog folds new changes into
//! `Unreleased` while preserving version sections byte-identically, and the
//! daily log replaces or inserts per-date entries. Each file write is
//! individually atomic (temp file + rename); there is no multi-file
//! transaction.

pub mod changelog;
pub mod daily_log;
pub mod narrative;

use crate::errors::{ChronicleError, Result};
use crate::log_debug;
use crate::types::buckets::WeekArtifact;
use chrono::NaiveDate;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Output locations for the three artifacts
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub narrative: PathBuf,
    pub changelog: PathBuf,
    pub daily_log: PathBuf,
}

impl ArtifactPaths {
    /// Conventional filenames under one output directory
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            narrative: dir.join("NARRATIVE.md"),
            changelog: dir.join("CHANGELOG.md"),
            daily_log: dir.join("DAILY_LOG.md"),
        }
    }
}

/// Merges week artifacts into the persistent files
pub struct ArtifactMerger {
    paths: ArtifactPaths,
}

impl ArtifactMerger {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self { paths }
    }

    /// Merge this run's weeks into all three artifacts.
    ///
    /// `release_tag` triggers changelog promotion: the merged `Unreleased`
    /// content moves under a new version heading dated `today`.
    pub fn merge(
        &self,
        weeks: &[WeekArtifact],
        release_tag: Option<&str>,
        today: NaiveDate,
    ) -> Result<()> {
        let narrative = narrative::merge(read_existing(&self.paths.narrative)?.as_deref(), weeks);
        write_atomic(&self.paths.narrative, &narrative)?;

        let changelog = changelog::merge(
            read_existing(&self.paths.changelog)?.as_deref(),
            weeks,
            release_tag,
            today,
        );
        write_atomic(&self.paths.changelog, &changelog)?;

        let daily_log = daily_log::merge(read_existing(&self.paths.daily_log)?.as_deref(), weeks);
        write_atomic(&self.paths.daily_log, &daily_log)?;

        log_debug!("Merged {} week artifact(s) into {:?}", weeks.len(), self.paths);
        Ok(())
    }
}

fn read_existing(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ChronicleError::Io(e)),
    }
}

/// Write-then-rename so readers never observe a partial file.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    fs::create_dir_all(&dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(path).map_err(|e| ChronicleError::Io(e.error))?;
    Ok(())
}
