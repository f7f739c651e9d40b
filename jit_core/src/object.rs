//! Loose object encoding.
//!
//! Every object is stored as a text header followed by the body:
//!
//! ```text
//! {kind} {body_len}\0{body}
//! ```
//!
//! `kind` is one of `blob`, `tree`, `commit` and `body_len` is the body size
//! in bytes as ASCII decimal. The object id is the SHA-1 of these bytes, and
//! the file on disk is the same bytes zlib-compressed.

use crate::error::{Error, Result};
use crate::oid::ObjectId;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Raw file content.
    Blob,
    /// Directory snapshot.
    Tree,
    /// History node.
    Commit,
}

impl ObjectKind {
    /// Get the header name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }

    /// Parse from the header name.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(ObjectKind::Blob),
            "tree" => Ok(ObjectKind::Tree),
            "commit" => Ok(ObjectKind::Commit),
            _ => Err(Error::corrupted_object(format!(
                "Invalid object kind: {:?}",
                s
            ))),
        }
    }
}

impl FromStr for ObjectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix `body` with its `{kind} {len}\0` header.
pub fn encode(kind: ObjectKind, body: &[u8]) -> Vec<u8> {
    let header = format!("{} {}\0", kind.as_str(), body.len());
    let mut buf = Vec::with_capacity(header.len() + body.len());
    buf.extend_from_slice(header.as_bytes());
    buf.extend_from_slice(body);
    buf
}

/// Compute the id `body` would be stored under, without writing anything.
pub fn hash_object(kind: ObjectKind, body: &[u8]) -> ObjectId {
    ObjectId::hash_bytes(&encode(kind, body))
}

/// The parsed header of an encoded (uncompressed) object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    /// Object kind.
    pub kind: ObjectKind,
    /// Declared body length in bytes.
    pub body_len: usize,
}

impl ObjectHeader {
    /// Parse the header of an encoded object.
    ///
    /// Returns the header and the offset where the body starts. The declared
    /// length must match the number of bytes after the null separator.
    pub fn parse(encoded: &[u8]) -> Result<(Self, usize)> {
        let nul = encoded
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::corrupted_object("Missing null byte after header"))?;

        let header = std::str::from_utf8(&encoded[..nul])
            .map_err(|e| Error::corrupted_object(format!("Header is not UTF-8: {}", e)))?;

        let (kind, len) = header
            .split_once(' ')
            .ok_or_else(|| Error::corrupted_object(format!("Malformed header: {:?}", header)))?;

        let kind = ObjectKind::parse(kind)?;
        let body_len = len
            .parse::<usize>()
            .map_err(|_| Error::corrupted_object(format!("Invalid body length: {:?}", len)))?;

        let body_start = nul + 1;
        let actual = encoded.len() - body_start;
        if actual != body_len {
            return Err(Error::corrupted_object(format!(
                "Body length mismatch: header says {}, got {}",
                body_len, actual
            )));
        }

        Ok((Self { kind, body_len }, body_start))
    }
}
