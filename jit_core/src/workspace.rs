//! Work-tree scanning.

use crate::error::Result;
use crate::repository::GIT_DIR;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The files of a work tree that belong in a snapshot.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create a Workspace rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Work-tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List every regular file under the root, sorted by path.
    ///
    /// `.gitignore` rules apply, hidden files are included and the `.git`
    /// directory is never entered. Symlinks are skipped.
    pub fn list_files(&self) -> Result<Vec<PathBuf>> {
        let walker = ignore::WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .require_git(false)
            .filter_entry(|entry| entry.file_name() != GIT_DIR)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_some_and(|t| t.is_file()) {
                files.push(entry.into_path());
            }
        }
        files.sort();

        debug!(root = %self.root.display(), files = files.len(), "scanned work tree");
        Ok(files)
    }
}
