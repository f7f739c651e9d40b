//! Exclusive lock files guarding single-file updates.
//!
//! A [`Lockfile`] protects a target file (HEAD, for instance) by creating a
//! sibling lock path with the target's extension replaced by `lock`
//! (`HEAD` → `HEAD.lock`). Creation is exclusive and never blocks, so at most
//! one holder exists across processes. New content is written to the lock
//! path and published by renaming it over the target, which readers observe
//! atomically.
//!
//! ```text
//! Unlocked --acquire--> Held --commit--> Committed
//!                        |                   |
//!                        +--rollback--> Unlocked <-- (acquire again)
//! ```
//!
//! Dropping a held lock does **not** remove the lock path. A process that
//! dies or gives up mid-update leaves it behind, and every later
//! [`Lockfile::acquire`] reports the target as held until an operator removes
//! it. Removing it automatically could let two writers both believe they hold
//! the lock.

use crate::error::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::mem;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extension given to lock paths.
pub const LOCK_EXTENSION: &str = "lock";

#[derive(Debug)]
enum LockState {
    Unlocked,
    Held(BufWriter<File>),
    Committed,
}

/// Exclusive-acquisition, buffered-write, atomic-commit guard over one file.
#[derive(Debug)]
pub struct Lockfile {
    target: PathBuf,
    lock_path: PathBuf,
    state: LockState,
}

impl Lockfile {
    /// Create an unlocked guard for `target`.
    pub fn new(target: impl Into<PathBuf>) -> Self {
        let target = target.into();
        let lock_path = target.with_extension(LOCK_EXTENSION);
        Self {
            target,
            lock_path,
            state: LockState::Unlocked,
        }
    }

    /// The file being protected.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// The lock path created while held.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Whether this instance currently holds the lock.
    pub fn is_held(&self) -> bool {
        matches!(self.state, LockState::Held(_))
    }

    /// Whether the last update through this instance was committed.
    pub fn is_committed(&self) -> bool {
        matches!(self.state, LockState::Committed)
    }

    /// Try to take the lock without waiting.
    ///
    /// Returns `Ok(true)` when this instance holds the lock (including when
    /// it already did) and `Ok(false)` when the lock path exists, meaning
    /// another holder or a stale lock.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingParent`] if the target's directory does not exist.
    /// - [`Error::NoPermission`] if the lock path cannot be created.
    pub fn acquire(&mut self) -> Result<bool> {
        if self.is_held() {
            return Ok(true);
        }

        let opened = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path);

        match opened {
            Ok(file) => {
                debug!(lock = %self.lock_path.display(), "acquired lock");
                self.state = LockState::Held(BufWriter::new(file));
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!(lock = %self.lock_path.display(), "lock is held elsewhere");
                Ok(false)
            }
            Err(e) => Err(acquire_error(&self.lock_path, e)),
        }
    }

    /// Buffer `bytes` for the next commit.
    ///
    /// Nothing becomes visible at the target path until [`Lockfile::commit`].
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        match &mut self.state {
            LockState::Held(writer) => {
                writer.write_all(bytes)?;
                Ok(())
            }
            _ => Err(Error::stale_lock(&self.lock_path)),
        }
    }

    /// Publish the written content by renaming the lock path over the target.
    ///
    /// If flushing or renaming fails the lock path is left in place, exactly
    /// as if the process had died while holding it.
    pub fn commit(&mut self) -> Result<()> {
        let writer = self.take_held()?;

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&self.lock_path, &self.target)?;
        self.state = LockState::Committed;

        debug!(path = %self.target.display(), "committed lock");
        Ok(())
    }

    /// Give up a held lock without touching the target.
    ///
    /// Removes the lock path this instance created and returns to unlocked.
    pub fn rollback(&mut self) -> Result<()> {
        let writer = self.take_held()?;
        drop(writer);

        fs::remove_file(&self.lock_path)?;

        debug!(lock = %self.lock_path.display(), "rolled back lock");
        Ok(())
    }

    /// Move out of `Held`, leaving `Unlocked` behind.
    fn take_held(&mut self) -> Result<BufWriter<File>> {
        match mem::replace(&mut self.state, LockState::Unlocked) {
            LockState::Held(writer) => Ok(writer),
            other => {
                self.state = other;
                Err(Error::stale_lock(&self.lock_path))
            }
        }
    }
}

/// Map a failed exclusive create of `lock_path` to a lock error.
fn acquire_error(lock_path: &Path, err: io::Error) -> Error {
    match err.kind() {
        io::ErrorKind::NotFound => Error::missing_parent(lock_path),
        io::ErrorKind::PermissionDenied => Error::no_permission(lock_path),
        _ => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use tempfile::TempDir;

    fn target_in(temp_dir: &TempDir) -> PathBuf {
        let target = temp_dir.path().join("HEAD");
        fs::write(&target, b"old").unwrap();
        target
    }

    #[test]
    fn test_lock_path_derivation() {
        assert_eq!(Lockfile::new("/r/.git/HEAD").lock_path(), Path::new("/r/.git/HEAD.lock"));
        assert_eq!(Lockfile::new("/r/config.toml").lock_path(), Path::new("/r/config.lock"));
    }

    #[test]
    fn test_acquire_creates_lock_path() {
        let temp_dir = TempDir::new().unwrap();
        let target = target_in(&temp_dir);

        let mut lock = Lockfile::new(&target);
        assert!(!lock.is_held());
        assert!(lock.acquire().unwrap());
        assert!(lock.is_held());
        assert!(lock.lock_path().exists());
        assert_eq!(fs::read(&target).unwrap(), b"old");
    }

    #[test]
    fn test_acquire_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let mut lock = Lockfile::new(target_in(&temp_dir));

        assert!(lock.acquire().unwrap());
        assert!(lock.acquire().unwrap());
        assert!(lock.is_held());
    }

    #[test]
    fn test_mutual_exclusion() {
        let temp_dir = TempDir::new().unwrap();
        let target = target_in(&temp_dir);

        let mut a = Lockfile::new(&target);
        let mut b = Lockfile::new(&target);

        assert!(a.acquire().unwrap());
        assert!(!b.acquire().unwrap());
        assert!(!b.is_held());

        a.write(b"from a").unwrap();
        a.commit().unwrap();

        let mut c = Lockfile::new(&target);
        assert!(c.acquire().unwrap());
        c.rollback().unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"from a");
    }

    #[test]
    fn test_missing_parent() {
        let temp_dir = TempDir::new().unwrap();
        let mut lock = Lockfile::new(temp_dir.path().join("missing/HEAD"));

        assert!(matches!(lock.acquire(), Err(Error::MissingParent { .. })));
        assert!(!lock.is_held());
    }

    #[test]
    #[cfg(unix)]
    fn test_no_permission() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("ro");
        fs::create_dir(&dir).unwrap();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users ignore directory permissions
        let canary = dir.join("canary");
        if fs::write(&canary, b"").is_ok() {
            fs::remove_file(&canary).unwrap();
            fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let mut lock = Lockfile::new(dir.join("HEAD"));
        let result = lock.acquire();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(Error::NoPermission { .. })));
    }

    #[test]
    fn test_acquire_error_mapping() {
        let lock_path = Path::new("/repo/.git/HEAD.lock");

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(
            acquire_error(lock_path, denied),
            Error::NoPermission { path } if path == lock_path
        ));

        let missing = io::Error::from(io::ErrorKind::NotFound);
        assert!(matches!(
            acquire_error(lock_path, missing),
            Error::MissingParent { path } if path == lock_path
        ));

        let other = io::Error::other("disk on fire");
        assert!(matches!(acquire_error(lock_path, other), Error::Io { .. }));
    }

    #[test]
    fn test_write_and_commit_without_acquire() {
        let temp_dir = TempDir::new().unwrap();
        let mut lock = Lockfile::new(target_in(&temp_dir));

        assert!(matches!(lock.write(b"x"), Err(Error::StaleLock { .. })));
        assert!(matches!(lock.commit(), Err(Error::StaleLock { .. })));
        assert!(matches!(lock.rollback(), Err(Error::StaleLock { .. })));
    }

    #[test]
    fn test_failed_acquire_is_not_held() {
        let temp_dir = TempDir::new().unwrap();
        let target = target_in(&temp_dir);

        let mut a = Lockfile::new(&target);
        let mut b = Lockfile::new(&target);
        assert!(a.acquire().unwrap());
        assert!(!b.acquire().unwrap());

        assert!(matches!(b.write(b"x"), Err(Error::StaleLock { .. })));
        assert!(matches!(b.commit(), Err(Error::StaleLock { .. })));
    }

    #[test]
    fn test_write_invisible_until_commit() {
        let temp_dir = TempDir::new().unwrap();
        let target = target_in(&temp_dir);

        let mut lock = Lockfile::new(&target);
        lock.acquire().unwrap();
        lock.write(b"new ").unwrap();
        lock.write(b"content").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"old");

        lock.commit().unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new content");
        assert!(!lock.lock_path().exists());
        assert!(lock.is_committed());
    }

    #[test]
    fn test_commit_creates_missing_target() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("HEAD");

        let mut lock = Lockfile::new(&target);
        lock.acquire().unwrap();
        lock.write(b"first").unwrap();
        lock.commit().unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"first");
    }

    #[test]
    fn test_second_commit_is_stale() {
        let temp_dir = TempDir::new().unwrap();
        let mut lock = Lockfile::new(target_in(&temp_dir));

        lock.acquire().unwrap();
        lock.commit().unwrap();

        assert!(matches!(lock.commit(), Err(Error::StaleLock { .. })));
        assert!(matches!(lock.write(b"late"), Err(Error::StaleLock { .. })));
        assert!(lock.is_committed());
    }

    #[test]
    fn test_reacquire_after_commit() {
        let temp_dir = TempDir::new().unwrap();
        let target = target_in(&temp_dir);
        let mut lock = Lockfile::new(&target);

        lock.acquire().unwrap();
        lock.write(b"one").unwrap();
        lock.commit().unwrap();

        assert!(lock.acquire().unwrap());
        lock.write(b"two").unwrap();
        lock.commit().unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"two");
    }

    #[test]
    fn test_abandoned_lock_stays_held() {
        let temp_dir = TempDir::new().unwrap();
        let target = target_in(&temp_dir);

        {
            let mut abandoned = Lockfile::new(&target);
            abandoned.acquire().unwrap();
            abandoned.write(b"never published").unwrap();
        }

        let mut next = Lockfile::new(&target);
        assert!(next.lock_path().exists());
        assert!(!next.acquire().unwrap());
        assert_eq!(fs::read(&target).unwrap(), b"old");

        // Operator cleanup
        fs::remove_file(next.lock_path()).unwrap();
        assert!(next.acquire().unwrap());
    }

    #[test]
    fn test_rollback_releases_lock() {
        let temp_dir = TempDir::new().unwrap();
        let target = target_in(&temp_dir);

        let mut a = Lockfile::new(&target);
        a.acquire().unwrap();
        a.write(b"discarded").unwrap();
        a.rollback().unwrap();

        assert!(!a.is_held());
        assert!(!a.lock_path().exists());
        assert_eq!(fs::read(&target).unwrap(), b"old");

        let mut b = Lockfile::new(&target);
        assert!(b.acquire().unwrap());
    }

    #[test]
    fn test_atomic_publish_under_concurrent_reads() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("HEAD");
        let old = vec![b'o'; 64 * 1024];
        let new = vec![b'n'; 64 * 1024];
        fs::write(&target, &old).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let reader = {
            let done = Arc::clone(&done);
            let target = target.clone();
            let (old, new) = (old.clone(), new.clone());
            thread::spawn(move || {
                let mut reads = 0usize;
                while !done.load(Ordering::SeqCst) {
                    let seen = fs::read(&target).unwrap();
                    assert!(seen == old || seen == new, "observed a partial write");
                    reads += 1;
                }
                reads
            })
        };

        let mut lock = Lockfile::new(&target);
        lock.acquire().unwrap();
        for chunk in new.chunks(1024) {
            lock.write(chunk).unwrap();
        }
        lock.commit().unwrap();
        done.store(true, Ordering::SeqCst);

        reader.join().unwrap();
        assert_eq!(fs::read(&target).unwrap(), new);
    }

    // Property-based tests
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            max_shrink_iters: 1000,
            ..ProptestConfig::default()
        })]

        /// The target ends up with exactly the concatenation of all writes
        #[test]
        fn prop_commit_publishes_all_writes(
            chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..256), 0..16)
        ) {
            let temp_dir = TempDir::new().unwrap();
            let target = target_in(&temp_dir);

            let mut lock = Lockfile::new(&target);
            prop_assert!(lock.acquire()?);
            for chunk in &chunks {
                lock.write(chunk)?;
            }
            lock.commit()?;

            prop_assert_eq!(fs::read(&target).unwrap(), chunks.concat());
        }

        /// Only one of several contenders wins
        #[test]
        fn prop_single_winner(contenders in 2usize..8) {
            let temp_dir = TempDir::new().unwrap();
            let target = target_in(&temp_dir);

            let mut locks: Vec<Lockfile> = (0..contenders).map(|_| Lockfile::new(&target)).collect();
            let mut winners = 0;
            for lock in &mut locks {
                if lock.acquire()? {
                    winners += 1;
                }
            }
            prop_assert_eq!(winners, 1);
            prop_assert!(locks[0].is_held());
        }
    }
}
