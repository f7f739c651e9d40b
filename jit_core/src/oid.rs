//! Object ids: SHA-1 digests over encoded objects.

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use sha1::{Digest, Sha1};
use std::fmt;
use std::str::FromStr;

/// Digest size in bytes (SHA-1 produces 160-bit digests).
pub const OID_SIZE: usize = 20;

/// Length of an object id rendered as hex.
pub const OID_HEX_LEN: usize = OID_SIZE * 2;

/// A 20-byte content address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; OID_SIZE]);

impl ObjectId {
    /// Create an ObjectId from raw bytes.
    pub fn from_bytes(bytes: [u8; OID_SIZE]) -> Self {
        ObjectId(bytes)
    }

    /// Create an ObjectId from a hex string (40 hex characters).
    ///
    /// Upper-case digits are accepted; ids are always rendered lower-case.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != OID_HEX_LEN {
            return Err(Error::invalid_object_id(format!(
                "Expected {} hex characters, got {}",
                OID_HEX_LEN,
                hex_str.len()
            )));
        }

        let mut bytes = [0u8; OID_SIZE];
        hex::decode_to_slice(hex_str, &mut bytes)
            .map_err(|e| Error::invalid_object_id(format!("Invalid hex: {}", e)))?;
        Ok(ObjectId(bytes))
    }

    /// Convert to hex string (40 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The first 2 hex characters, naming the prefix directory.
    pub fn prefix(&self) -> String {
        hex::encode(&self.0[..1])
    }

    /// The remaining 38 hex characters, naming the object file.
    pub fn suffix(&self) -> String {
        hex::encode(&self.0[1..])
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; OID_SIZE] {
        &self.0
    }

    /// Hash already-encoded object bytes (header included).
    pub fn hash_bytes(data: &[u8]) -> Self {
        let digest = Sha1::digest(data);
        let mut bytes = [0u8; OID_SIZE];
        bytes.copy_from_slice(&digest);
        ObjectId(bytes)
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_empty() {
        let oid = ObjectId::hash_bytes(b"");
        assert_eq!(oid.to_hex(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn test_hash_blob_hello() {
        let oid = ObjectId::hash_bytes(b"blob 5\0hello");
        assert_eq!(oid.to_hex(), "b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0");
    }

    #[test]
    fn test_from_hex_roundtrip() {
        let original = ObjectId::hash_bytes(b"test data");
        let parsed = ObjectId::from_hex(&original.to_hex()).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_from_hex_uppercase() {
        let lower = "b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0";
        let parsed = ObjectId::from_hex(&lower.to_uppercase()).unwrap();
        assert_eq!(parsed.to_hex(), lower);
    }

    #[test]
    fn test_from_hex_invalid_length() {
        assert!(ObjectId::from_hex("abcd").is_err());
        assert!(ObjectId::from_hex("").is_err());
        assert!(ObjectId::from_hex(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_from_hex_invalid_chars() {
        let invalid = "z".repeat(OID_HEX_LEN);
        assert!(matches!(
            ObjectId::from_hex(&invalid),
            Err(Error::InvalidObjectId { .. })
        ));
    }

    #[test]
    fn test_prefix_suffix() {
        let oid = ObjectId::hash_bytes(b"blob 5\0hello");
        assert_eq!(oid.prefix(), "b6");
        assert_eq!(oid.suffix(), "fc4c620b67d95f953a5c1c1230aaab5db5a1b0");
    }

    #[test]
    fn test_parse_and_display() {
        let oid: ObjectId = "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391".parse().unwrap();
        assert_eq!(format!("{}", oid), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
        assert_eq!(
            format!("{:?}", oid),
            "ObjectId(e69de29bb2d1d6434b8b29ae775ad8c2e48c5391)"
        );
    }

    // Property-based tests
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            max_shrink_iters: 10000,
            ..ProptestConfig::default()
        })]

        /// Hashing the same bytes always produces the same id
        #[test]
        fn prop_hash_deterministic(data: Vec<u8>) {
            prop_assert_eq!(ObjectId::hash_bytes(&data), ObjectId::hash_bytes(&data));
        }

        /// Round-trip through hex preserves the id
        #[test]
        fn prop_hex_roundtrip(bytes in prop::array::uniform20(any::<u8>())) {
            let oid = ObjectId::from_bytes(bytes);
            let parsed = ObjectId::from_hex(&oid.to_hex())?;
            prop_assert_eq!(oid, parsed);
        }

        /// Prefix directory plus file name is the full hex id
        #[test]
        fn prop_prefix_suffix_concat(bytes in prop::array::uniform20(any::<u8>())) {
            let oid = ObjectId::from_bytes(bytes);
            let joined = format!("{}{}", oid.prefix(), oid.suffix());
            prop_assert_eq!(oid.to_hex(), joined);
        }

        /// Any length other than 40 is rejected
        #[test]
        fn prop_invalid_hex_length_fails(
            s in "[0-9a-f]{0,39}|[0-9a-f]{41,80}"
        ) {
            prop_assert!(ObjectId::from_hex(&s).is_err());
        }
    }
}
