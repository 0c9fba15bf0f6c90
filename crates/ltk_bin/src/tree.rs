//! The property tree: named top-level sections.

use std::collections::BTreeMap;

use crate::error::{BinError, Result};
use crate::hash::NameHash;
use crate::kind::BinKind;
use crate::value::{BinList, BinMap, BinObject, BinValue};

pub const SECTION_TYPE: &str = "type";
pub const SECTION_VERSION: &str = "version";
pub const SECTION_LINKED: &str = "linked";
pub const SECTION_ENTRIES: &str = "entries";
pub const SECTION_PATCHES: &str = "patches";
/// Opaque 8 bytes that follow the `PTCH` magic.
pub const SECTION_PATCH_HEADER: &str = "patch_header";

pub const PROP_MAGIC: &[u8; 4] = b"PROP";
pub const PTCH_MAGIC: &[u8; 4] = b"PTCH";

/// Value written after `PTCH` when the tree does not carry one.
pub const DEFAULT_PATCH_HEADER: u64 = 1;

/// A decoded property bin.
///
/// Sections are stored by name. The codec understands `type`, `version`,
/// `linked`, `entries`, `patches` and `patch_header`; anything else is carried
/// along by the text format but ignored by the binary writer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyTree {
    pub sections: BTreeMap<String, BinValue>,
}

impl PropertyTree {
    /// Creates a `PROP` tree from linked paths and `(entry name, object)` pairs.
    pub fn new(
        version: u32,
        linked: Vec<String>,
        entries: impl IntoIterator<Item = (NameHash, BinObject)>,
    ) -> Self {
        let mut tree = Self::default();
        tree.set(SECTION_TYPE, BinValue::String("PROP".to_string()));
        tree.set(SECTION_VERSION, BinValue::U32(version));
        tree.set(
            SECTION_LINKED,
            BinValue::List(BinList::new(
                BinKind::String,
                linked.into_iter().map(BinValue::String).collect(),
            )),
        );
        let mut map = BinMap::new(BinKind::Hash, BinKind::Embed);
        map.entries = entries
            .into_iter()
            .map(|(name, obj)| (BinValue::Hash(name), BinValue::Embed(obj)))
            .collect();
        tree.set(SECTION_ENTRIES, BinValue::Map(map));
        tree
    }

    pub fn get_section(&self, name: &str) -> Option<&BinValue> {
        self.sections.get(name)
    }

    pub fn set(&mut self, name: &str, value: BinValue) -> Option<BinValue> {
        self.sections.insert(name.to_string(), value)
    }

    pub fn is_patch(&self) -> bool {
        matches!(self.get_section(SECTION_TYPE), Some(BinValue::String(s)) if s == "PTCH")
    }

    pub fn version(&self) -> Result<u32> {
        match self.get_section(SECTION_VERSION) {
            Some(BinValue::U32(v)) => Ok(*v),
            Some(other) => Err(invalid(SECTION_VERSION, BinKind::U32, other)),
            None => Err(BinError::MissingSection(SECTION_VERSION)),
        }
    }

    pub fn patch_header(&self) -> u64 {
        match self.get_section(SECTION_PATCH_HEADER) {
            Some(BinValue::U64(v)) => *v,
            _ => DEFAULT_PATCH_HEADER,
        }
    }

    /// Linked tree paths; empty when the section is absent.
    pub fn linked(&self) -> Result<Vec<&str>> {
        match self.get_section(SECTION_LINKED) {
            None => Ok(Vec::new()),
            Some(BinValue::List(list)) | Some(BinValue::List2(list)) => list
                .items
                .iter()
                .map(|item| {
                    item.as_str()
                        .ok_or_else(|| invalid(SECTION_LINKED, BinKind::String, item))
                })
                .collect(),
            Some(other) => Err(invalid(SECTION_LINKED, BinKind::List, other)),
        }
    }

    pub fn entries(&self) -> Option<&BinMap> {
        match self.get_section(SECTION_ENTRIES) {
            Some(BinValue::Map(map)) => Some(map),
            _ => None,
        }
    }

    pub fn entries_mut(&mut self) -> Option<&mut BinMap> {
        match self.sections.get_mut(SECTION_ENTRIES) {
            Some(BinValue::Map(map)) => Some(map),
            _ => None,
        }
    }

    pub fn patches(&self) -> Option<&BinMap> {
        match self.get_section(SECTION_PATCHES) {
            Some(BinValue::Map(map)) => Some(map),
            _ => None,
        }
    }

    /// Looks up an entry by its name hash.
    pub fn entry(&self, name: impl Into<NameHash>) -> Option<&BinObject> {
        let key = BinValue::Hash(name.into());
        self.entries()?.get(&key)?.as_object()
    }

    /// Iterates `(entry name, object)` pairs in stored order.
    pub fn iter_entries(&self) -> impl Iterator<Item = (&NameHash, &BinObject)> {
        self.entries()
            .into_iter()
            .flat_map(|map| map.entries.iter())
            .filter_map(|(key, value)| match (key, value) {
                (BinValue::Hash(name), BinValue::Embed(obj)) => Some((name, obj)),
                _ => None,
            })
    }
}

fn invalid(name: &str, expected: BinKind, found: &BinValue) -> BinError {
    BinError::InvalidSection {
        name: name.to_string(),
        reason: format!("expected {expected}, found {}", found.kind()),
    }
}
