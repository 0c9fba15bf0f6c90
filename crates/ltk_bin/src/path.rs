//! Addressing nodes inside a [`PropertyTree`].
//!
//! A [`NodePath`] is a section name followed by structural steps. Paths stay
//! valid as long as the shape of the tree does not change, which makes them a
//! safe way to remember references during a walk and rewrite them afterwards.

use std::fmt;

use crate::error::{BinError, Result};
use crate::kind::BinKind;
use crate::tree::PropertyTree;
use crate::value::BinValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Item of a list.
    Item(usize),
    MapKey(usize),
    MapValue(usize),
    /// Field of a pointer or embed, by position.
    Field(usize),
    OptionItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePath {
    pub section: String,
    pub steps: Vec<PathStep>,
}

impl NodePath {
    pub fn section(name: impl Into<String>) -> Self {
        Self {
            section: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn child(&self, step: PathStep) -> Self {
        let mut path = self.clone();
        path.steps.push(step);
        path
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.section)?;
        for step in &self.steps {
            match step {
                PathStep::Item(i) => write!(f, "[{i}]")?,
                PathStep::MapKey(i) => write!(f, ".key[{i}]")?,
                PathStep::MapValue(i) => write!(f, ".value[{i}]")?,
                PathStep::Field(i) => write!(f, ".field[{i}]")?,
                PathStep::OptionItem => f.write_str("?")?,
            }
        }
        Ok(())
    }
}

fn step_into(value: &BinValue, step: PathStep) -> Option<&BinValue> {
    match (value, step) {
        (BinValue::List(list) | BinValue::List2(list), PathStep::Item(i)) => list.items.get(i),
        (BinValue::Map(map), PathStep::MapKey(i)) => map.entries.get(i).map(|(k, _)| k),
        (BinValue::Map(map), PathStep::MapValue(i)) => map.entries.get(i).map(|(_, v)| v),
        (BinValue::Pointer(obj) | BinValue::Embed(obj), PathStep::Field(i)) => {
            obj.fields.get(i).map(|f| &f.value)
        }
        (BinValue::Option(option), PathStep::OptionItem) => option.item.as_deref(),
        _ => None,
    }
}

fn step_into_mut(value: &mut BinValue, step: PathStep) -> Option<&mut BinValue> {
    match (value, step) {
        (BinValue::List(list) | BinValue::List2(list), PathStep::Item(i)) => {
            list.items.get_mut(i)
        }
        (BinValue::Map(map), PathStep::MapKey(i)) => map.entries.get_mut(i).map(|(k, _)| k),
        (BinValue::Map(map), PathStep::MapValue(i)) => map.entries.get_mut(i).map(|(_, v)| v),
        (BinValue::Pointer(obj) | BinValue::Embed(obj), PathStep::Field(i)) => {
            obj.fields.get_mut(i).map(|f| &mut f.value)
        }
        (BinValue::Option(option), PathStep::OptionItem) => option.item.as_deref_mut(),
        _ => None,
    }
}

/// Kind a child at `step` must have, if the parent constrains it.
fn slot_kind(parent: &BinValue, step: PathStep) -> Option<BinKind> {
    match (parent, step) {
        (BinValue::List(list) | BinValue::List2(list), PathStep::Item(_)) => Some(list.value_kind),
        (BinValue::Map(map), PathStep::MapKey(_)) => Some(map.key_kind),
        (BinValue::Map(map), PathStep::MapValue(_)) => Some(map.value_kind),
        (BinValue::Option(option), PathStep::OptionItem) => Some(option.value_kind),
        _ => None,
    }
}

fn walk_value<F>(path: &mut NodePath, value: &BinValue, visit: &mut F)
where
    F: FnMut(&NodePath, &BinValue),
{
    visit(path, value);

    let mut descend = |path: &mut NodePath, step: PathStep, child: &BinValue| {
        path.steps.push(step);
        walk_value(path, child, &mut *visit);
        path.steps.pop();
    };

    match value {
        BinValue::List(list) | BinValue::List2(list) => {
            for (i, item) in list.items.iter().enumerate() {
                descend(path, PathStep::Item(i), item);
            }
        }
        BinValue::Map(map) => {
            for (i, (key, val)) in map.entries.iter().enumerate() {
                descend(path, PathStep::MapKey(i), key);
                descend(path, PathStep::MapValue(i), val);
            }
        }
        BinValue::Pointer(obj) | BinValue::Embed(obj) => {
            for (i, field) in obj.fields.iter().enumerate() {
                descend(path, PathStep::Field(i), &field.value);
            }
        }
        BinValue::Option(option) => {
            if let Some(item) = &option.item {
                descend(path, PathStep::OptionItem, item);
            }
        }
        _ => {}
    }
}

impl PropertyTree {
    /// Visits every node depth-first, parents before children.
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(&NodePath, &BinValue),
    {
        for (name, value) in &self.sections {
            let mut path = NodePath::section(name.as_str());
            walk_value(&mut path, value, &mut visit);
        }
    }

    pub fn get(&self, path: &NodePath) -> Option<&BinValue> {
        let mut node = self.sections.get(&path.section)?;
        for step in &path.steps {
            node = step_into(node, *step)?;
        }
        Some(node)
    }

    fn get_mut(&mut self, path: &NodePath) -> Option<&mut BinValue> {
        let mut node = self.sections.get_mut(&path.section)?;
        for step in &path.steps {
            node = step_into_mut(node, *step)?;
        }
        Some(node)
    }

    /// Puts `value` at `path` and returns the value it replaced.
    ///
    /// Inside a list, map or option the new value must have the container's
    /// element kind.
    pub fn replace(&mut self, path: &NodePath, value: BinValue) -> Result<BinValue> {
        if let Some((last, parent_steps)) = path.steps.split_last() {
            let parent_path = NodePath {
                section: path.section.clone(),
                steps: parent_steps.to_vec(),
            };
            let parent = self
                .get(&parent_path)
                .ok_or_else(|| BinError::NodeNotFound(path.to_string()))?;
            if let Some(expected) = slot_kind(parent, *last) {
                if value.kind() != expected {
                    return Err(BinError::KindMismatch {
                        at: path.to_string(),
                        expected,
                        found: value.kind(),
                    });
                }
            }
        }

        let node = self
            .get_mut(path)
            .ok_or_else(|| BinError::NodeNotFound(path.to_string()))?;
        Ok(std::mem::replace(node, value))
    }

    /// Collects the paths of all string nodes in walk order.
    pub fn string_paths(&self) -> Vec<(NodePath, String)> {
        let mut out = Vec::new();
        self.walk(|path, value| {
            if let BinValue::String(s) = value {
                out.push((path.clone(), s.clone()));
            }
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::NameHash;
    use crate::value::{BinField, BinList, BinObject};

    fn tree() -> PropertyTree {
        PropertyTree::new(
            3,
            vec!["DATA/Linked.bin".into()],
            [(
                NameHash::new(1),
                BinObject::new(
                    "Holder",
                    vec![
                        BinField::new("count", BinValue::U32(4)),
                        BinField::new(
                            "textures",
                            BinValue::List(BinList::new(
                                BinKind::String,
                                vec![
                                    BinValue::String("a.dds".into()),
                                    BinValue::String("b.tex".into()),
                                ],
                            )),
                        ),
                    ],
                ),
            )],
        )
    }

    #[test]
    fn test_string_paths_in_walk_order() {
        let tree = tree();
        let strings: Vec<String> = tree.string_paths().into_iter().map(|(_, s)| s).collect();
        // entries sort before linked and type in the section map
        assert_eq!(strings, vec!["a.dds", "b.tex", "DATA/Linked.bin", "PROP"]);
    }

    #[test]
    fn test_replace_returns_old_value() {
        let mut tree = tree();
        let (path, _) = tree
            .string_paths()
            .into_iter()
            .find(|(_, s)| s == "b.tex")
            .unwrap();
        assert_eq!(path.to_string(), "entries.value[0].field[1][1]");

        let old = tree
            .replace(&path, BinValue::String("ASSETS/mod/b.tex".into()))
            .unwrap();
        assert_eq!(old, BinValue::String("b.tex".into()));
        assert_eq!(tree.get(&path).and_then(BinValue::as_str), Some("ASSETS/mod/b.tex"));
    }

    #[test]
    fn test_replace_rejects_kind_change_in_container() {
        let mut tree = tree();
        let path = NodePath::section("entries")
            .child(PathStep::MapValue(0))
            .child(PathStep::Field(1))
            .child(PathStep::Item(0));
        assert!(matches!(
            tree.replace(&path, BinValue::U8(1)),
            Err(BinError::KindMismatch { .. })
        ));

        // fields are unconstrained
        let field = NodePath::section("entries")
            .child(PathStep::MapValue(0))
            .child(PathStep::Field(0));
        assert_eq!(tree.replace(&field, BinValue::U8(1)).unwrap(), BinValue::U32(4));
    }

    #[test]
    fn test_replace_missing_node() {
        let mut tree = tree();
        let path = NodePath::section("entries").child(PathStep::MapValue(5));
        assert!(matches!(
            tree.replace(&path, BinValue::None),
            Err(BinError::NodeNotFound(_))
        ));
    }
}
