//! # jit core
//!
//! A minimal content-addressed version store laid out like git's loose
//! objects.
//!
//! Files become blobs, directories become trees and snapshots become commits,
//! each addressed by the SHA-1 of its encoded bytes and stored zlib-compressed
//! under `.git/objects`. Blob and tree encodings are byte-identical to git's;
//! commits use a simpler body with a bare identity line and no
//! `author`/`committer` headers, so git's own tools do not accept them.
//!
//! HEAD is advanced through an exclusive lockfile so that concurrent writers
//! never interleave.
//!
//! ## Features
//!
//! - Deduplicating object store with atomic, no-clobber writes
//! - Bottom-up tree construction from a directory hierarchy
//! - Lockfile with acquire / write / commit / rollback
//! - Linear commit history recorded in HEAD
//!
//! ## Example
//!
//! ```no_run
//! use jit_core::{Author, DirectoryForest, Repository, TreeBuilder, Workspace};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = Repository::init("./project")?;
//!
//! // Snapshot the work tree
//! let files = Workspace::new(repo.root()).list_files()?;
//! let forest = DirectoryForest::from_files(repo.root(), &files)?;
//! let tree = TreeBuilder::new(&repo).build(&forest)?;
//!
//! // Record it on top of HEAD
//! let author = Author::now("Ada", "ada@example.com")?;
//! let commit = repo.head().advance(&tree, &author, "Initial commit")?;
//! println!("{}", commit);
//! # Ok(())
//! # }
//! ```

mod builder;
mod commit;
mod config;
mod error;
mod head;
mod lockfile;
mod object;
mod oid;
mod repository;
mod store;
mod tree;
mod workspace;

pub use builder::{DirectoryForest, DirectoryInput, FileInput, TreeBuilder};
pub use commit::{Author, Commit};
pub use config::{Config, FORMAT_VERSION};
pub use error::{Error, Result};
pub use head::Head;
pub use lockfile::{LOCK_EXTENSION, Lockfile};
pub use object::{ObjectHeader, ObjectKind, encode, hash_object};
pub use oid::{OID_HEX_LEN, OID_SIZE, ObjectId};
pub use repository::{GIT_DIR, Repository};
pub use store::{StoredObject, WriteOutcome};
pub use tree::{FileMode, MAX_NAME_LEN, Tree, TreeEntry};
pub use workspace::Workspace;
