//! Build identifier hashing.
//!
//! A build id content-addresses one build of one dependency: the same commit,
//! version and option set always hash to the same id, and changing any of
//! them changes it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{OptionSet, Version};

/// Bytes of the Blake3 digest kept in the id (64 bits)
const BUILD_ID_BYTES: usize = 8;

/// Short hex hash used as a path segment under work/ and store/
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(String);

impl BuildId {
    /// Hash commit, version and options, in that order
    pub fn compute(commit: &str, version: &Version, options: &OptionSet) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(commit.as_bytes());
        hasher.update(&[0]);
        hasher.update(version.to_string().as_bytes());
        hasher.update(&[0]);
        for (name, value) in options {
            update_field(&mut hasher, name.as_bytes());
            update_field(&mut hasher, value.tag().as_bytes());
            update_field(&mut hasher, value.to_string().as_bytes());
        }

        let digest = hasher.finalize();
        Self(hex::encode(&digest.as_bytes()[..BUILD_ID_BYTES]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Length-prefixed field; option text cannot alias a different option set
fn update_field(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BuildId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
