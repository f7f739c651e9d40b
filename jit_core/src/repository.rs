//! Repository handle and on-disk layout.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::head::Head;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the metadata directory inside the work tree.
pub const GIT_DIR: &str = ".git";

/// A repository rooted at a work-tree directory.
///
/// Holds every path the store needs; operations borrow it instead of
/// consulting any global state.
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
    git_dir: PathBuf,
    objects_dir: PathBuf,
    refs_dir: PathBuf,
    head_path: PathBuf,
    config: Config,
}

impl Repository {
    /// Initialize a repository at the given work-tree root.
    ///
    /// Creates the layout:
    /// - `.git/objects/` for loose objects
    /// - `.git/refs/` (reserved)
    /// - `.git/HEAD`, empty until the first commit
    /// - `.git/config` with the repository format
    ///
    /// Re-running on an existing repository keeps its HEAD and config.
    pub fn init<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let git_dir = root.join(GIT_DIR);

        fs::create_dir_all(git_dir.join("objects"))?;
        fs::create_dir_all(git_dir.join("refs"))?;

        create_if_missing(&git_dir.join("HEAD"), b"")?;
        create_if_missing(
            &git_dir.join("config"),
            Config::default().to_file_string().as_bytes(),
        )?;

        debug!(root = %root.display(), "initialized repository");
        Self::open(root)
    }

    /// Open an existing repository at the given work-tree root.
    ///
    /// Validates the layout and reads the configuration.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.is_dir() {
            return Err(Error::invalid_repository(&root, "directory does not exist"));
        }

        let git_dir = root.join(GIT_DIR);
        if !git_dir.is_dir() {
            return Err(Error::invalid_repository(
                &root,
                format!("{} directory missing", GIT_DIR),
            ));
        }

        let config = Config::load(&git_dir.join("config"))?;

        let objects_dir = git_dir.join("objects");
        if !objects_dir.is_dir() {
            return Err(Error::invalid_repository(&root, "objects directory missing"));
        }

        let refs_dir = git_dir.join("refs");
        if !refs_dir.is_dir() {
            return Err(Error::invalid_repository(&root, "refs directory missing"));
        }

        let head_path = git_dir.join("HEAD");

        Ok(Self {
            root,
            git_dir,
            objects_dir,
            refs_dir,
            head_path,
            config,
        })
    }

    /// Work-tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.git` metadata directory.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Loose object directory.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// References directory.
    pub fn refs_dir(&self) -> &Path {
        &self.refs_dir
    }

    /// Path of the HEAD file.
    pub fn head_path(&self) -> &Path {
        &self.head_path
    }

    /// Configuration read at open time.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The head pointer of this repository.
    pub fn head(&self) -> Head<'_> {
        Head::new(self)
    }
}

/// Create `path` holding `content` unless it already exists.
fn create_if_missing(path: &Path, content: &[u8]) -> Result<()> {
    match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(content)?;
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e.into()),
    }
}
