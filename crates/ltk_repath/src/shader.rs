//! Fuzzy replacement of shader links that no longer exist in the game.
//!
//! Shader definitions are listed as `<hex hash> <path>` lines. A definition
//! "exists" when the current `shaders.bin` has an entry of class
//! `CustomShaderDef` under its hash. A link to a missing definition is swapped
//! for the existing sibling (same parent folder) whose name shares the most
//! `_`-separated tokens with it.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};

use camino::Utf8Path;
use ltk_bin::{fnv1a_lower, BinValue, NameHash, NodePath, PathStep, PropertyTree};

use crate::error::{RepathError, Result};

pub const SHADER_CLASS: &str = "CustomShaderDef";
pub const SHADER_FIELD: &str = "shader";

const SYNONYMS: &[(&str, &str)] = &[("multilayered", "multilayer"), ("addative", "additive")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderEntry {
    pub hash: u32,
    pub path: String,
    pub exists: bool,
}

impl ShaderEntry {
    fn parent(&self) -> &str {
        self.path.rsplit_once('/').map_or("", |(parent, _)| parent)
    }

    fn name(&self) -> &str {
        self.path.rsplit_once('/').map_or(self.path.as_str(), |(_, name)| name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderResolution {
    Exists,
    Replaced { from: String, to: String, hash: u32 },
    /// Known but missing, with no eligible replacement.
    Unresolved { path: String },
    /// Not in the listing at all.
    Unknown,
}

#[derive(Debug, Clone, Default)]
pub struct ShaderTable {
    entries: Vec<ShaderEntry>,
    by_hash: HashMap<u32, usize>,
}

fn tokens(name: &str) -> HashSet<String> {
    name.split('_')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Tokens of a missing shader's name, with known renames applied.
fn wanted_tokens(name: &str) -> HashSet<String> {
    tokens(name)
        .into_iter()
        .map(|token| {
            SYNONYMS
                .iter()
                .find(|(from, _)| *from == token)
                .map_or(token, |(_, to)| (*to).to_string())
        })
        .collect()
}

impl ShaderTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => RepathError::ListingNotFound(path.to_owned()),
            _ => RepathError::Io(err),
        })?;
        let table = Self::from_listing(BufReader::new(file))?;
        tracing::debug!("Loaded shader listing path={} shaders={}", path, table.len());
        Ok(table)
    }

    pub fn from_listing(reader: impl BufRead) -> Result<Self> {
        let mut table = Self::new();
        for line in reader.lines() {
            let line = line?;
            let Some((hash, path)) = line.trim().split_once(' ') else {
                continue;
            };
            let hash = hash.trim_start_matches("0x");
            let Ok(hash) = u32::from_str_radix(hash, 16) else {
                continue;
            };
            table.insert(hash, path.trim());
        }
        Ok(table)
    }

    pub fn insert(&mut self, hash: u32, path: impl Into<String>) {
        if self.by_hash.contains_key(&hash) {
            return;
        }
        self.by_hash.insert(hash, self.entries.len());
        self.entries.push(ShaderEntry {
            hash,
            path: path.into(),
            exists: false,
        });
    }

    /// Marks every listed shader defined in `shaders` as existing. Returns the
    /// number marked.
    pub fn mark_existing(&mut self, shaders: &PropertyTree) -> usize {
        let class = fnv1a_lower(SHADER_CLASS);
        let mut marked = 0;
        for (key, object) in shaders.iter_entries() {
            if object.class.hash != class {
                continue;
            }
            if let Some(&i) = self.by_hash.get(&key.hash) {
                if !self.entries[i].exists {
                    self.entries[i].exists = true;
                    marked += 1;
                }
            }
        }
        tracing::debug!("Marked existing shaders count={}", marked);
        marked
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, hash: u32) -> Option<&ShaderEntry> {
        self.by_hash.get(&hash).map(|&i| &self.entries[i])
    }

    pub fn resolve(&self, hash: u32) -> ShaderResolution {
        let Some(target) = self.get(hash) else {
            return ShaderResolution::Unknown;
        };
        if target.exists {
            return ShaderResolution::Exists;
        }

        let wanted = wanted_tokens(target.name());
        let parent = target.parent();
        let mut best: Option<(&ShaderEntry, usize, usize)> = None;

        for candidate in self
            .entries
            .iter()
            .filter(|e| e.exists && e.hash != hash && e.parent() == parent)
        {
            let have = tokens(candidate.name());
            let mutual = have.intersection(&wanted).count();
            if mutual == 0 {
                continue;
            }
            let extra = have.len() - mutual;
            let better = match best {
                None => true,
                Some((_, best_mutual, best_extra)) => {
                    mutual > best_mutual || (mutual == best_mutual && extra < best_extra)
                }
            };
            if better {
                best = Some((candidate, mutual, extra));
            }
        }

        match best {
            Some((entry, _, _)) => ShaderResolution::Replaced {
                from: target.path.clone(),
                to: entry.path.clone(),
                hash: entry.hash,
            },
            None => ShaderResolution::Unresolved {
                path: target.path.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderReport {
    pub replaced: Vec<(String, String)>,
    pub unresolved: Vec<String>,
}

/// Rewrites every `shader` link field whose definition no longer exists.
pub fn fix_shader_links(tree: &mut PropertyTree, table: &ShaderTable) -> Result<ShaderReport> {
    let field = fnv1a_lower(SHADER_FIELD);
    let mut links: Vec<(NodePath, u32)> = Vec::new();
    tree.walk(|path, value| {
        let Some(object) = value.as_object() else {
            return;
        };
        for (i, f) in object.fields.iter().enumerate() {
            if f.name.hash != field {
                continue;
            }
            if let BinValue::Link(link) = &f.value {
                links.push((path.child(PathStep::Field(i)), link.hash));
            }
        }
    });

    let mut report = ShaderReport::default();
    for (path, hash) in links {
        match table.resolve(hash) {
            ShaderResolution::Replaced { from, to, hash } => {
                tracing::info!("Replaced shader from={} to={}", from, to);
                let link = NameHash {
                    hash,
                    name: Some(to.clone()),
                };
                tree.replace(&path, BinValue::Link(link))?;
                report.replaced.push((from, to));
            }
            ShaderResolution::Unresolved { path: missing } => {
                tracing::warn!("No replacement for missing shader path={}", missing);
                report.unresolved.push(missing);
            }
            ShaderResolution::Exists | ShaderResolution::Unknown => {}
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltk_bin::{BinField, BinObject};

    const LISTING: &str = "\
00000001 Shaders/SkinnedMesh/Base_Color_Add
00000002 Shaders/SkinnedMesh/Base_Color_Mult
00000003 Shaders/SkinnedMesh/Base_Color_Add_Glow
00000004 Shaders/StaticMesh/Base_Color_Add
00000005 Shaders/SkinnedMesh/MultiLayer_Additive
00000006 Shaders/SkinnedMesh/MultiLayered_Addative_Old
";

    fn table(existing: &[u32]) -> ShaderTable {
        let mut table = ShaderTable::from_listing(LISTING.as_bytes()).unwrap();
        let shaders = PropertyTree::new(
            3,
            Vec::new(),
            existing
                .iter()
                .map(|&h| (NameHash::new(h), BinObject::new(SHADER_CLASS, Vec::new()))),
        );
        table.mark_existing(&shaders);
        table
    }

    #[test]
    fn test_existing_shader_untouched() {
        assert_eq!(table(&[1]).resolve(1), ShaderResolution::Exists);
        assert_eq!(table(&[1]).resolve(99), ShaderResolution::Unknown);
    }

    #[test]
    fn test_best_match_in_same_folder() {
        let table = table(&[2, 3, 4]);
        match table.resolve(1) {
            ShaderResolution::Replaced { to, hash, .. } => {
                assert_eq!(to, "Shaders/SkinnedMesh/Base_Color_Add_Glow");
                assert_eq!(hash, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_fewer_extra_tokens_wins_tie() {
        let mut table = ShaderTable::new();
        table.insert(1, "Shaders/Mesh/Base_Color_Add");
        table.insert(2, "Shaders/Mesh/Base_Color_Add_Glow_Extra");
        table.insert(3, "Shaders/Mesh/Base_Color_Add_Glow");
        table.insert(4, "Shaders/Mesh/Base_Color_Add_Fade");
        table.mark_existing(&PropertyTree::new(
            3,
            Vec::new(),
            [2u32, 3, 4].map(|h| (NameHash::new(h), BinObject::new(SHADER_CLASS, Vec::new()))),
        ));

        // 3 beats 2 on extras; 4 only ties with 3, so 3 is kept.
        assert!(matches!(
            table.resolve(1),
            ShaderResolution::Replaced { hash: 3, .. }
        ));
    }

    #[test]
    fn test_synonyms_are_applied() {
        let table = table(&[5]);
        assert!(matches!(
            table.resolve(6),
            ShaderResolution::Replaced { hash: 5, .. }
        ));
    }

    #[test]
    fn test_synonyms_only_rewrite_the_missing_name() {
        let mut table = ShaderTable::new();
        table.insert(1, "Shaders/SkinShaders/Foo_MultiLayered");
        table.insert(2, "Shaders/SkinShaders/Bar_MultiLayered");
        table.insert(3, "Shaders/SkinShaders/Baz_MultiLayer");
        let shaders = PropertyTree::new(
            3,
            Vec::new(),
            [2, 3].map(|h| (NameHash::new(h), BinObject::new(SHADER_CLASS, Vec::new()))),
        );
        table.mark_existing(&shaders);

        match table.resolve(1) {
            ShaderResolution::Replaced { to, hash, .. } => {
                assert_eq!(to, "Shaders/SkinShaders/Baz_MultiLayer");
                assert_eq!(hash, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_no_mutual_tokens_is_unresolved() {
        let table = table(&[5]);
        assert_eq!(
            table.resolve(2),
            ShaderResolution::Unresolved {
                path: "Shaders/SkinnedMesh/Base_Color_Mult".to_string()
            }
        );
    }

    #[test]
    fn test_other_classes_do_not_count() {
        let mut table = ShaderTable::from_listing(LISTING.as_bytes()).unwrap();
        let shaders = PropertyTree::new(
            3,
            Vec::new(),
            [(NameHash::new(1), BinObject::new("StaticMaterialDef", Vec::new()))],
        );
        assert_eq!(table.mark_existing(&shaders), 0);
        assert!(!table.get(1).unwrap().exists);
    }

    #[test]
    fn test_fix_shader_links_rewrites_field() {
        let table = table(&[2, 3]);
        let mut tree = PropertyTree::new(
            3,
            Vec::new(),
            [(
                NameHash::new(10),
                BinObject::new(
                    "StaticMaterialDef",
                    vec![
                        BinField::new(SHADER_FIELD, BinValue::Link(NameHash::new(1))),
                        BinField::new("other", BinValue::Link(NameHash::new(1))),
                    ],
                ),
            )],
        );

        let report = fix_shader_links(&mut tree, &table).unwrap();
        assert_eq!(report.replaced.len(), 1);
        let entry = tree.entry(NameHash::new(10)).unwrap();
        assert_eq!(entry.field(SHADER_FIELD), Some(&BinValue::Link(NameHash::new(3))));
        assert_eq!(entry.field("other"), Some(&BinValue::Link(NameHash::new(1))));
    }
}
