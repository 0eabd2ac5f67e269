//! Hashing of the merged option table.
//!
//! The hash names per-configuration output directories (`$build/$option_hash`),
//! so two runs with the same options always produce the same value and any
//! changed option produces a different one.

use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};

use crate::consts::OPTION_HASH_LEN;

/// A truncated SHA-256 of an option table.
///
/// # Format
///
/// A lowercase hexadecimal string of [`OPTION_HASH_LEN`] characters, e.g. `"3fa9c01e"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OptionHash(pub String);

impl fmt::Display for OptionHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash `options` as the string `name=value,` repeated in name order.
pub fn hash_options(options: &BTreeMap<String, String>) -> OptionHash {
  let mut hasher = Sha256::new();
  for (name, value) in options {
    hasher.update(format!("{name}={value},").as_bytes());
  }

  let full = hex::encode(hasher.finalize());
  OptionHash(full[..OPTION_HASH_LEN].to_string())
}
