//! Low-level repository handle and diff plumbing.

use crate::errors::{ChronicleError, Result};
use crate::log_debug;
use git2::{Diff, DiffFormat, DiffOptions, Oid, Repository};
use std::path::{Path, PathBuf};

/// Handle on a local Git repository.
///
/// git2 repository objects are not `Send`, so the handle stores only the
/// path and reopens per operation; opening is cheap relative to the work
/// done per call.
pub struct GitRepo {
    repo_path: PathBuf,
}

impl GitRepo {
    /// Open an existing repository, failing fast when the path is not one.
    pub fn open(repo_path: &Path) -> Result<Self> {
        Repository::open(repo_path).map_err(|e| {
            ChronicleError::Repository(format!(
                "cannot open repository at {}: {}",
                repo_path.display(),
                e.message()
            ))
        })?;
        Ok(Self {
            repo_path: repo_path.to_path_buf(),
        })
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub(crate) fn open_repo(&self) -> Result<Repository> {
        Ok(Repository::open(&self.repo_path)?)
    }

    /// Unified diff text between two commits, following first-parent
    /// ancestry semantics: the old side is `from`'s tree (the empty tree
    /// when `None`), the new side is `to`'s tree.
    pub fn diff_between(&self, from: Option<&str>, to: &str) -> Result<String> {
        let repo = self.open_repo()?;
        let new_tree = repo.find_commit(Oid::from_str(to)?)?.tree()?;
        let old_tree = match from {
            Some(id) => Some(repo.find_commit(Oid::from_str(id)?)?.tree()?),
            None => None,
        };

        let mut options = DiffOptions::new();
        options.context_lines(3);
        let mut diff =
            repo.diff_tree_to_tree(old_tree.as_ref(), Some(&new_tree), Some(&mut options))?;

        let mut find_options = git2::DiffFindOptions::new();
        find_options.renames(true);
        diff.find_similar(Some(&mut find_options))?;

        render_patch(&diff)
    }
}

/// Render a diff as unified patch text.
///
/// Renames keep their `rename from`/`rename to` header lines; binary files
/// appear as a single "Binary files ... differ" line without content.
pub(crate) fn render_patch(diff: &Diff<'_>) -> Result<String> {
    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        match line.origin() {
            '+' | '-' | ' ' => text.push(line.origin()),
            _ => {}
        }
        text.push_str(std::str::from_utf8(line.content()).unwrap_or("<non-utf8 line>\n"));
        true
    })?;
    log_debug!("Rendered patch of {} bytes", text.len());
    Ok(text)
}
