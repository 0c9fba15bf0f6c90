//! Hash primitives used as identifiers inside property bins.
//!
//! Both hash types optionally retain the string they were computed from.
//! Identity (equality, ordering, hashing) only ever looks at the numeric value.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use xxhash_rust::xxh64::xxh64;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Case-insensitive 32-bit FNV-1a over the UTF-8 bytes of `text`.
pub fn fnv1a_lower(text: &str) -> u32 {
    text.to_lowercase()
        .bytes()
        .fold(FNV_OFFSET_BASIS, |hash, byte| {
            (hash ^ byte as u32).wrapping_mul(FNV_PRIME)
        })
}

/// Normalizes an archive-relative path: forward slashes, lower case.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}

/// 64-bit XXH64 (seed 0) of the normalized path.
pub fn xxh64_path(path: &str) -> u64 {
    xxh64(normalize_path(path).as_bytes(), 0)
}

/// A 32-bit name hash (field names, class names, entry names, links).
#[derive(Debug, Clone, Default)]
pub struct NameHash {
    pub hash: u32,
    pub name: Option<String>,
}

impl NameHash {
    pub const fn new(hash: u32) -> Self {
        Self { hash, name: None }
    }

    /// Hashes `name` and keeps the original string around for display.
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            hash: fnv1a_lower(&name),
            name: Some(name),
        }
    }

    pub fn is_null(&self) -> bool {
        self.hash == 0
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl PartialEq for NameHash {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for NameHash {}

impl Hash for NameHash {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state)
    }
}

impl PartialOrd for NameHash {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NameHash {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash.cmp(&other.hash)
    }
}

impl From<u32> for NameHash {
    fn from(hash: u32) -> Self {
        Self::new(hash)
    }
}

impl From<&str> for NameHash {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl fmt::Display for NameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:08x}", self.hash),
        }
    }
}

/// A 64-bit path hash (file references and archive path identifiers).
#[derive(Debug, Clone, Default)]
pub struct PathHash {
    pub hash: u64,
    pub path: Option<String>,
}

impl PathHash {
    pub const fn new(hash: u64) -> Self {
        Self { hash, path: None }
    }

    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            hash: xxh64_path(&path),
            path: Some(path),
        }
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl PartialEq for PathHash {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for PathHash {}

impl Hash for PathHash {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state)
    }
}

impl PartialOrd for PathHash {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathHash {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash.cmp(&other.hash)
    }
}

impl From<u64> for PathHash {
    fn from(hash: u64) -> Self {
        Self::new(hash)
    }
}

impl fmt::Display for PathHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => f.write_str(path),
            None => write!(f, "0x{:016x}", self.hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(fnv1a_lower(""), 0x811c9dc5);
        assert_eq!(fnv1a_lower("a"), 0xe40c292c);
    }

    #[test]
    fn test_fnv1a_is_case_insensitive() {
        assert_eq!(fnv1a_lower("SkinMeshDataProperties"), fnv1a_lower("skinmeshdataproperties"));
    }

    #[test]
    fn test_path_hash_normalizes_separators_and_case() {
        assert_eq!(
            xxh64_path("ASSETS\\Characters\\Ahri\\Skin0.dds"),
            xxh64_path("assets/characters/ahri/skin0.dds")
        );
        assert_eq!(xxh64_path("a.bin"), xxh64(b"a.bin", 0));
    }

    #[test]
    fn test_identity_ignores_retained_string() {
        let named = NameHash::from_name("mSkinMeshProperties");
        let bare = NameHash::new(named.hash);
        assert_eq!(named, bare);

        let mut set = HashSet::new();
        set.insert(named);
        assert!(set.contains(&bare));
    }

    #[test]
    fn test_display() {
        assert_eq!(NameHash::new(0x1234).to_string(), "0x00001234");
        assert_eq!(NameHash::from_name("Shader").to_string(), "Shader");
        assert_eq!(PathHash::new(1).to_string(), "0x0000000000000001");
    }
}
