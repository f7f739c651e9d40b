//! Commit and author encoding.

use crate::error::{Error, Result};
use crate::object::{self, ObjectKind};
use crate::oid::ObjectId;
use chrono::{DateTime, FixedOffset, Local};

/// Identity and timestamp recorded in a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    name: String,
    email: String,
    time: DateTime<FixedOffset>,
}

impl Author {
    /// Create an author stamped with `time`.
    ///
    /// Name and email may not contain `<`, `>` or line breaks, since those
    /// delimit the identity in the encoded line.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        time: DateTime<FixedOffset>,
    ) -> Result<Self> {
        let name = name.into();
        let email = email.into();

        if name.trim().is_empty() {
            return Err(Error::invalid_author("Name cannot be empty"));
        }

        for (field, value) in [("name", &name), ("email", &email)] {
            if value.contains(['<', '>', '\n', '\r', '\0']) {
                return Err(Error::invalid_author(format!(
                    "The {} {:?} contains a reserved character",
                    field, value
                )));
            }
        }

        Ok(Self { name, email, time })
    }

    /// Create an author stamped with the current local time.
    pub fn now(name: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        Self::new(name, email, Local::now().fixed_offset())
    }

    /// Author name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Author email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Timestamp with its UTC offset.
    pub fn time(&self) -> &DateTime<FixedOffset> {
        &self.time
    }

    /// Encode as `{name} <{email}> {unix-seconds} {+HHMM}`.
    pub fn encode(&self) -> String {
        format!(
            "{} <{}> {}",
            self.name,
            self.email,
            self.time.format("%s %z")
        )
    }
}

/// A history node: a root tree, at most one parent, an author and a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    tree: ObjectId,
    parent: Option<ObjectId>,
    author: Author,
    message: String,
}

impl Commit {
    /// Create a commit. `parent` is `None` for the first commit.
    pub fn new(
        tree: ObjectId,
        parent: Option<ObjectId>,
        author: Author,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tree,
            parent,
            author,
            message: message.into(),
        }
    }

    /// Root tree id.
    pub fn tree(&self) -> &ObjectId {
        &self.tree
    }

    /// Parent commit id, if any.
    pub fn parent(&self) -> Option<&ObjectId> {
        self.parent.as_ref()
    }

    /// Author of the commit.
    pub fn author(&self) -> &Author {
        &self.author
    }

    /// Commit message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Encode the commit body (no header).
    ///
    /// ```text
    /// tree {hex}
    /// parent {hex}        (only with a parent)
    /// {author line}
    ///
    /// {message}
    /// ```
    pub fn encode_body(&self) -> Vec<u8> {
        let mut body = format!("tree {}\n", self.tree);
        if let Some(parent) = &self.parent {
            body.push_str(&format!("parent {}\n", parent));
        }
        body.push_str(&self.author.encode());
        body.push_str("\n\n");
        body.push_str(&self.message);
        body.push('\n');
        body.into_bytes()
    }

    /// Encode the full commit object, header included.
    pub fn encode(&self) -> Vec<u8> {
        object::encode(ObjectKind::Commit, &self.encode_body())
    }

    /// The id this commit is stored under.
    pub fn id(&self) -> ObjectId {
        ObjectId::hash_bytes(&self.encode())
    }
}
