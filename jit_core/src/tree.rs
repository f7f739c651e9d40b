//! Tree encoding and directory structure.

use crate::error::{Error, Result};
use crate::object::{self, ObjectKind};
use crate::oid::ObjectId;
use std::cmp::Ordering;
use std::fmt;

/// Longest accepted entry name, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// Mode tag of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// Regular (non-executable) file.
    Regular,
    /// Executable file.
    Executable,
    /// Sub-directory.
    Tree,
}

impl FileMode {
    /// Mode as written into tree bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Regular => "100644",
            FileMode::Executable => "100755",
            FileMode::Tree => "40000",
        }
    }

    /// Parse from the textual form.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "100644" => Ok(FileMode::Regular),
            "100755" => Ok(FileMode::Executable),
            "40000" => Ok(FileMode::Tree),
            _ => Err(Error::invalid_mode(s)),
        }
    }

    /// Pick the file mode matching POSIX permission bits.
    ///
    /// Any execute bit makes the file executable.
    pub fn from_permissions(mode: u32) -> Self {
        if mode & 0o111 != 0 {
            FileMode::Executable
        } else {
            FileMode::Regular
        }
    }

    /// Whether entries with this mode point at trees.
    pub fn is_tree(&self) -> bool {
        matches!(self, FileMode::Tree)
    }

    /// The object kind entries with this mode point at.
    pub fn object_kind(&self) -> ObjectKind {
        match self {
            FileMode::Regular | FileMode::Executable => ObjectKind::Blob,
            FileMode::Tree => ObjectKind::Tree,
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry in a tree (file or subdirectory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    mode: FileMode,
    name: String,
    id: ObjectId,
}

impl TreeEntry {
    /// Create a new tree entry.
    ///
    /// The name must be a single non-empty path segment.
    pub fn new(mode: FileMode, name: impl Into<String>, id: ObjectId) -> Result<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(Error::invalid_tree_entry("Name cannot be empty"));
        }

        if name == "." || name == ".." {
            return Err(Error::invalid_tree_entry(format!(
                "Name cannot be {:?}",
                name
            )));
        }

        if name.len() > MAX_NAME_LEN {
            return Err(Error::invalid_tree_entry(format!(
                "Name too long: {} bytes (max {})",
                name.len(),
                MAX_NAME_LEN
            )));
        }

        if name.contains('/') {
            return Err(Error::invalid_tree_entry(format!(
                "Name cannot contain a path separator: {:?}",
                name
            )));
        }

        if name.contains('\0') {
            return Err(Error::invalid_tree_entry("Name cannot contain null bytes"));
        }

        Ok(Self { mode, name, id })
    }

    /// Mode of the entry.
    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// Name of the entry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the blob or tree the entry points at.
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Append `{mode} {name}\0{20-byte id}` to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.mode.as_str().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.name.as_bytes());
        buf.push(0);
        buf.extend_from_slice(self.id.as_bytes());
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeEntry {
    /// Bytewise name order, with tree names compared as if they ended in `/`.
    ///
    /// Mode and id only break ties between entries sharing a name.
    fn cmp(&self, other: &Self) -> Ordering {
        let slash = |entry: &Self| entry.mode.is_tree().then_some(&b'/');
        let lhs = self.name.as_bytes().iter().chain(slash(self));
        let rhs = other.name.as_bytes().iter().chain(slash(other));
        lhs.cmp(rhs)
            .then_with(|| self.mode.as_str().cmp(other.mode.as_str()))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// A directory snapshot, kept in canonical entry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a tree, sorting entries into canonical order.
    ///
    /// Two entries with the same name are rejected.
    pub fn new(mut entries: Vec<TreeEntry>) -> Result<Self> {
        entries.sort();

        let mut names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(Error::invalid_tree_entry(format!(
                "Duplicate entry name: {:?}",
                pair[0]
            )));
        }

        Ok(Self { entries })
    }

    /// Entries in encoding order.
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode the tree body (no header).
    pub fn encode_body(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for entry in &self.entries {
            entry.encode_into(&mut buf);
        }
        buf
    }

    /// Encode the full tree object, header included.
    pub fn encode(&self) -> Vec<u8> {
        object::encode(ObjectKind::Tree, &self.encode_body())
    }

    /// The id this tree is stored under.
    pub fn id(&self) -> ObjectId {
        ObjectId::hash_bytes(&self.encode())
    }
}
