//! The HEAD pointer and its lock-protected update.

use crate::commit::{Author, Commit};
use crate::error::{Error, Result};
use crate::lockfile::Lockfile;
use crate::oid::ObjectId;
use crate::repository::Repository;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{info, warn};

/// Reads and advances a repository's HEAD.
pub struct Head<'a> {
    repo: &'a Repository,
}

impl<'a> Head<'a> {
    /// Create a Head for the given repository.
    pub(crate) fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Path of the HEAD file.
    pub fn path(&self) -> &Path {
        self.repo.head_path()
    }

    /// Current head commit, or `None` before the first commit.
    ///
    /// An absent or blank HEAD file both mean "no commit yet".
    pub fn read(&self) -> Result<Option<ObjectId>> {
        let content = match fs::read_to_string(self.path()) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let value = content.trim();
        if value.is_empty() {
            return Ok(None);
        }

        ObjectId::from_hex(value).map(Some).map_err(|_| {
            Error::invalid_head(
                self.path(),
                format!("expected an object id, found {:?}", value),
            )
        })
    }

    /// Record a new commit of `tree` on top of the current head.
    ///
    /// Takes the HEAD lock first so the parent read and the update form one
    /// step; a concurrent update makes this fail with
    /// [`Error::LockContention`] and nothing is retried. If reading HEAD or
    /// storing the commit fails, the lock is released before returning.
    pub fn advance(&self, tree: &ObjectId, author: &Author, message: &str) -> Result<ObjectId> {
        let mut lock = Lockfile::new(self.path());
        if !lock.acquire()? {
            return Err(Error::lock_contention(lock.lock_path()));
        }

        let staged = self.store_commit(tree, author, message).and_then(|(id, parent)| {
            lock.write(id.to_hex().as_bytes())?;
            Ok((id, parent))
        });

        let (id, parent) = match staged {
            Ok(staged) => staged,
            Err(e) => {
                if let Err(rollback_err) = lock.rollback() {
                    warn!(error = %rollback_err, "failed to release HEAD lock");
                }
                return Err(e);
            }
        };

        lock.commit()?;

        match parent {
            Some(parent) => info!(commit = %id, %parent, "advanced HEAD"),
            None => info!(commit = %id, "advanced HEAD (root commit)"),
        }
        Ok(id)
    }

    fn store_commit(
        &self,
        tree: &ObjectId,
        author: &Author,
        message: &str,
    ) -> Result<(ObjectId, Option<ObjectId>)> {
        let parent = self.read()?;
        let commit = Commit::new(*tree, parent, author.clone(), message);
        let stored = self.repo.put_commit(&commit)?;
        Ok((stored.id, parent))
    }
}
