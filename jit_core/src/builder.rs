//! Bottom-up tree construction from a directory hierarchy.

use crate::error::{Error, Result};
use crate::oid::ObjectId;
use crate::repository::Repository;
use crate::tree::{FileMode, Tree, TreeEntry};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// A file to snapshot: its entry name, mode and where to read its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInput {
    /// Entry name inside its directory.
    pub name: String,
    /// Regular or executable.
    pub mode: FileMode,
    /// Path the content is read from.
    pub source: PathBuf,
}

/// Direct contents of one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryInput {
    /// Files directly inside the directory.
    pub files: Vec<FileInput>,
    /// Names of the immediate sub-directories.
    pub subdirs: BTreeSet<String>,
}

/// Directories keyed by path relative to the work-tree root.
///
/// The root itself is the empty path and is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryForest {
    dirs: BTreeMap<PathBuf, DirectoryInput>,
}

impl Default for DirectoryForest {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryForest {
    /// A forest holding only an empty root directory.
    pub fn new() -> Self {
        let mut dirs = BTreeMap::new();
        dirs.insert(PathBuf::new(), DirectoryInput::default());
        Self { dirs }
    }

    /// Group already-filtered file paths under `root` into directories.
    ///
    /// Every intermediate directory is registered with its parent. File
    /// modes come from the permissions on disk.
    pub fn from_files<I, P>(root: &Path, files: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut forest = Self::new();

        for path in files {
            let path = path.as_ref();
            let relative = path.strip_prefix(root).map_err(|_| {
                Error::invalid_tree_entry(format!(
                    "{} is outside {}",
                    path.display(),
                    root.display()
                ))
            })?;

            let name = relative
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    Error::invalid_tree_entry(format!("Invalid filename: {}", path.display()))
                })?;
            let dir = relative.parent().unwrap_or_else(|| Path::new(""));

            let mode = get_file_mode(&fs::metadata(path)?);
            forest.add_file(dir, name, mode, path)?;
        }

        Ok(forest)
    }

    /// Add a file to `dir`, registering the directory and its ancestors.
    pub fn add_file(
        &mut self,
        dir: &Path,
        name: impl Into<String>,
        mode: FileMode,
        source: impl Into<PathBuf>,
    ) -> Result<()> {
        let directory = self.add_directory(dir)?;
        directory.files.push(FileInput {
            name: name.into(),
            mode,
            source: source.into(),
        });
        Ok(())
    }

    /// Register `dir` (and its ancestors), returning its listing.
    pub fn add_directory(&mut self, dir: &Path) -> Result<&mut DirectoryInput> {
        let mut current = PathBuf::new();

        for component in dir.components() {
            let name = match component {
                Component::Normal(name) => name.to_str().ok_or_else(|| {
                    Error::invalid_tree_entry(format!(
                        "Invalid directory name: {}",
                        dir.display()
                    ))
                })?,
                Component::CurDir => continue,
                _ => {
                    return Err(Error::invalid_tree_entry(format!(
                        "Directory must be relative to the root: {}",
                        dir.display()
                    )));
                }
            };

            self.dirs
                .entry(current.clone())
                .or_default()
                .subdirs
                .insert(name.to_string());
            current.push(name);
        }

        Ok(self.dirs.entry(current).or_default())
    }

    /// Listing of `dir`, if registered.
    pub fn get(&self, dir: &Path) -> Option<&DirectoryInput> {
        self.dirs.get(dir)
    }

    /// Number of directories, root included.
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// Whether the forest has no files and no sub-directories.
    pub fn is_empty(&self) -> bool {
        self.dirs.values().all(|d| d.files.is_empty() && d.subdirs.is_empty())
    }

    /// Directories ordered so that children always precede their parent.
    fn post_order(&self) -> Vec<(&PathBuf, &DirectoryInput)> {
        let mut order: Vec<_> = self.dirs.iter().collect();
        order.sort_by_key(|(path, _)| Reverse(path.components().count()));
        order
    }
}

/// Stores blobs and trees for a [`DirectoryForest`], deepest directory first.
pub struct TreeBuilder<'a> {
    repo: &'a Repository,
}

impl<'a> TreeBuilder<'a> {
    /// Create a TreeBuilder writing into `repo`.
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Build every tree in the forest and return the root tree's id.
    ///
    /// Each file is stored as a blob; each directory's tree is stored only
    /// after all of its sub-directories' trees.
    pub fn build(&self, forest: &DirectoryForest) -> Result<ObjectId> {
        let mut built: HashMap<&Path, ObjectId> = HashMap::new();
        let mut blobs_created = 0usize;
        let mut trees_created = 0usize;

        for (dir, listing) in forest.post_order() {
            let mut entries = Vec::with_capacity(listing.files.len() + listing.subdirs.len());

            for file in &listing.files {
                let content = fs::read(&file.source)?;
                let stored = self.repo.put_blob(&content)?;
                blobs_created += usize::from(stored.is_created());
                entries.push(TreeEntry::new(file.mode, file.name.clone(), stored.id)?);
            }

            for name in &listing.subdirs {
                let child = dir.join(name);
                let id = built
                    .get(child.as_path())
                    .copied()
                    .ok_or_else(|| Error::missing_subtree(&child))?;
                entries.push(TreeEntry::new(FileMode::Tree, name.clone(), id)?);
            }

            let stored = self.repo.put_tree(&Tree::new(entries)?)?;
            trees_created += usize::from(stored.is_created());
            built.insert(dir.as_path(), stored.id);
        }

        let root = built
            .get(Path::new(""))
            .copied()
            .ok_or_else(|| Error::missing_subtree(""))?;

        debug!(
            %root,
            directories = forest.len(),
            blobs_created,
            trees_created,
            "built trees"
        );
        Ok(root)
    }
}

/// Get the tree entry mode from file metadata.
#[cfg(unix)]
fn get_file_mode(metadata: &fs::Metadata) -> FileMode {
    use std::os::unix::fs::PermissionsExt;
    FileMode::from_permissions(metadata.permissions().mode())
}

/// Get the tree entry mode from file metadata (non-Unix fallback).
#[cfg(not(unix))]
fn get_file_mode(_metadata: &fs::Metadata) -> FileMode {
    FileMode::Regular
}
