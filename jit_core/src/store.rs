//! Loose object storage.

use crate::commit::Commit;
use crate::error::{Error, Result};
use crate::object::{self, ObjectKind};
use crate::oid::ObjectId;
use crate::repository::Repository;
use crate::tree::Tree;
use flate2::write::ZlibEncoder;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// What a put did on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    /// The object file was written by this call.
    Created,
    /// An object with this id was already present; nothing was written.
    AlreadyExists,
}

/// Result of storing an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    /// Address of the object.
    pub id: ObjectId,
    /// Whether the object was newly written.
    pub outcome: WriteOutcome,
}

impl StoredObject {
    /// Whether this call wrote the object file.
    pub fn is_created(&self) -> bool {
        self.outcome == WriteOutcome::Created
    }
}

impl Repository {
    /// Get the path to an object file given its id.
    ///
    /// Returns: `.git/objects/{prefix}/{suffix}`
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        self.objects_dir().join(id.prefix()).join(id.suffix())
    }

    /// Whether an object with this id is present.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.object_path(id).exists()
    }

    /// Store `body` as an object of `kind`.
    ///
    /// The id is the SHA-1 of the encoded header and body. Storing an object
    /// that is already present is not an error: the outcome is
    /// [`WriteOutcome::AlreadyExists`] and the existing file is left alone.
    pub fn put(&self, kind: ObjectKind, body: &[u8]) -> Result<StoredObject> {
        let encoded = object::encode(kind, body);
        let id = ObjectId::hash_bytes(&encoded);

        let outcome = if self.contains(&id) {
            WriteOutcome::AlreadyExists
        } else {
            self.write_object_atomic(&id, &encoded)?
        };

        match outcome {
            WriteOutcome::Created => debug!(%id, %kind, size = body.len(), "stored object"),
            WriteOutcome::AlreadyExists => debug!(%id, %kind, "object already exists"),
        }

        Ok(StoredObject { id, outcome })
    }

    /// Store file content as a blob.
    pub fn put_blob(&self, content: &[u8]) -> Result<StoredObject> {
        self.put(ObjectKind::Blob, content)
    }

    /// Store a tree.
    pub fn put_tree(&self, tree: &Tree) -> Result<StoredObject> {
        self.put(ObjectKind::Tree, &tree.encode_body())
    }

    /// Store a commit.
    pub fn put_commit(&self, commit: &Commit) -> Result<StoredObject> {
        self.put(ObjectKind::Commit, &commit.encode_body())
    }

    /// Write a compressed object atomically using tempfile.
    ///
    /// The compressed bytes go to a temporary file next to the final path and
    /// are published with a no-clobber rename, so readers never see a
    /// partial object. Losing the rename to a concurrent writer of the same
    /// object yields `AlreadyExists`.
    fn write_object_atomic(&self, id: &ObjectId, encoded: &[u8]) -> Result<WriteOutcome> {
        let obj_path = self.object_path(id);
        let prefix_dir = self.objects_dir().join(id.prefix());

        ensure_dir(&prefix_dir).map_err(|e| Error::store_write(&prefix_dir, e))?;

        let temp_file = tempfile::Builder::new()
            .prefix("tmp_obj_")
            .tempfile_in(&prefix_dir)
            .map_err(|e| Error::store_write(&obj_path, e))?;

        let mut encoder = ZlibEncoder::new(temp_file, self.config().compression);
        encoder
            .write_all(encoded)
            .map_err(|e| Error::store_write(&obj_path, e))?;
        let temp_file = encoder
            .finish()
            .map_err(|e| Error::store_write(&obj_path, e))?;

        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| Error::store_write(&obj_path, e))?;
        set_read_only(temp_file.path()).map_err(|e| Error::store_write(&obj_path, e))?;

        match temp_file.persist_noclobber(&obj_path) {
            Ok(_) => Ok(WriteOutcome::Created),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                Ok(WriteOutcome::AlreadyExists)
            }
            Err(e) => Err(Error::store_write(&obj_path, e.error)),
        }
    }
}

/// Create `dir`, treating an existing directory as success.
///
/// Two writers storing objects with the same prefix may race to create it.
fn ensure_dir(dir: &Path) -> io::Result<()> {
    match fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Drop write permission from a finished object file.
#[cfg(unix)]
fn set_read_only(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o444))
}

/// Drop write permission from a finished object file (no-op off Unix).
#[cfg(not(unix))]
fn set_read_only(_path: &Path) -> io::Result<()> {
    Ok(())
}
