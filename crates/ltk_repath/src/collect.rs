//! Collecting path references from a property tree.

use std::collections::HashMap;

use ltk_bin::tree::SECTION_TYPE;
use ltk_bin::PropertyTree;

use crate::target::{texture_twin, ResolutionTarget};

/// A string is treated as a path when it has a non-empty extension of at
/// most five characters.
pub fn is_path_reference(text: &str) -> bool {
    match text.rfind('.') {
        Some(dot) => dot + 1 < text.len() && text.len() - dot <= 6,
        None => false,
    }
}

/// Walks every string in the tree and groups path references into targets.
///
/// Strings equal to an earlier target's path (ignoring case), or to its
/// `.dds`/`.tex` twin, become extra references of that target.
pub fn collect_targets(tree: &PropertyTree) -> Vec<ResolutionTarget> {
    let mut targets: Vec<ResolutionTarget> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (path, text) in tree.string_paths() {
        if path.section == SECTION_TYPE || !is_path_reference(&text) {
            continue;
        }
        let key = text.to_lowercase();
        let existing = index.get(&key).copied().or_else(|| {
            texture_twin(&key).and_then(|twin| index.get(&twin).copied())
        });

        match existing {
            Some(i) => targets[i].references.push(path),
            None => {
                index.insert(key, targets.len());
                let mut target = ResolutionTarget::new(text);
                target.references.push(path);
                targets.push(target);
            }
        }
    }

    tracing::debug!("Collected path references targets={}", targets.len());
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltk_bin::{BinField, BinKind, BinList, BinObject, BinValue, NameHash};

    #[test]
    fn test_is_path_reference() {
        assert!(is_path_reference("ASSETS/Skin.dds"));
        assert!(is_path_reference("a.anm"));
        assert!(is_path_reference("x.troy5"));
        assert!(!is_path_reference("x.troybin"));
        assert!(!is_path_reference("x.toolongext"));
        assert!(!is_path_reference("nodot"));
        assert!(!is_path_reference("trailing."));
    }

    #[test]
    fn test_collect_merges_case_and_texture_twins() {
        let tree = PropertyTree::new(
            3,
            Vec::new(),
            [(
                NameHash::new(1),
                BinObject::new(
                    "Skin",
                    vec![
                        BinField::new("a", BinValue::String("ASSETS/Skin.dds".into())),
                        BinField::new("b", BinValue::String("assets/skin.DDS".into())),
                        BinField::new("c", BinValue::String("ASSETS/Skin.tex".into())),
                        BinField::new("d", BinValue::String("not a path".into())),
                        BinField::new(
                            "e",
                            BinValue::List(BinList::new(
                                BinKind::String,
                                vec![BinValue::String("ASSETS/Mesh.sco".into())],
                            )),
                        ),
                    ],
                ),
            )],
        );

        let targets = collect_targets(&tree);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].original_path, "ASSETS/Skin.dds");
        assert_eq!(targets[0].references.len(), 3);
        assert_eq!(targets[1].candidates, vec!["ASSETS/Mesh.sco", "ASSETS/Mesh.scb"]);
    }
}
