//! The property value model.

use crate::error::{BinError, Result};
use crate::hash::{NameHash, PathHash};
use crate::kind::BinKind;

/// A single property value. Every variant maps to exactly one [`BinKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum BinValue {
    None,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Row-major 4x4 matrix.
    Mtx44([f32; 16]),
    Rgba([u8; 4]),
    String(String),
    Hash(NameHash),
    File(PathHash),
    List(BinList),
    /// Same layout and semantics as `List`, distinct wire tag.
    List2(BinList),
    /// Nullable object. A zero class hash is the null pointer and has no fields.
    Pointer(BinObject),
    Embed(BinObject),
    Link(NameHash),
    Option(BinOption),
    Map(BinMap),
    Flag(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinList {
    pub value_kind: BinKind,
    pub items: Vec<BinValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinOption {
    pub value_kind: BinKind,
    pub item: Option<Box<BinValue>>,
}

/// Ordered key/value pairs. Keys need not be primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct BinMap {
    pub key_kind: BinKind,
    pub value_kind: BinKind,
    pub entries: Vec<(BinValue, BinValue)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinField {
    pub name: NameHash,
    pub value: BinValue,
}

/// Body shared by pointers and embeds: a class hash and ordered fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinObject {
    pub class: NameHash,
    pub fields: Vec<BinField>,
}

impl BinValue {
    pub fn kind(&self) -> BinKind {
        match self {
            BinValue::None => BinKind::None,
            BinValue::Bool(_) => BinKind::Bool,
            BinValue::I8(_) => BinKind::I8,
            BinValue::U8(_) => BinKind::U8,
            BinValue::I16(_) => BinKind::I16,
            BinValue::U16(_) => BinKind::U16,
            BinValue::I32(_) => BinKind::I32,
            BinValue::U32(_) => BinKind::U32,
            BinValue::I64(_) => BinKind::I64,
            BinValue::U64(_) => BinKind::U64,
            BinValue::F32(_) => BinKind::F32,
            BinValue::Vec2(_) => BinKind::Vec2,
            BinValue::Vec3(_) => BinKind::Vec3,
            BinValue::Vec4(_) => BinKind::Vec4,
            BinValue::Mtx44(_) => BinKind::Mtx44,
            BinValue::Rgba(_) => BinKind::Rgba,
            BinValue::String(_) => BinKind::String,
            BinValue::Hash(_) => BinKind::Hash,
            BinValue::File(_) => BinKind::File,
            BinValue::List(_) => BinKind::List,
            BinValue::List2(_) => BinKind::List2,
            BinValue::Pointer(_) => BinKind::Pointer,
            BinValue::Embed(_) => BinKind::Embed,
            BinValue::Link(_) => BinKind::Link,
            BinValue::Option(_) => BinKind::Option,
            BinValue::Map(_) => BinKind::Map,
            BinValue::Flag(_) => BinKind::Flag,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            BinValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            BinValue::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BinObject> {
        match self {
            BinValue::Pointer(obj) | BinValue::Embed(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut BinObject> {
        match self {
            BinValue::Pointer(obj) | BinValue::Embed(obj) => Some(obj),
            _ => None,
        }
    }

    /// A null pointer (zero class hash, no fields).
    pub fn null_pointer() -> Self {
        BinValue::Pointer(BinObject::default())
    }

    /// Checks element kinds of every container and the null pointer rule, recursively.
    pub fn validate(&self) -> Result<()> {
        self.validate_at("$")
    }

    fn validate_at(&self, at: &str) -> Result<()> {
        match self {
            BinValue::List(list) | BinValue::List2(list) => {
                for (i, item) in list.items.iter().enumerate() {
                    let at = format!("{at}[{i}]");
                    expect_kind(&at, list.value_kind, item)?;
                    item.validate_at(&at)?;
                }
            }
            BinValue::Option(option) => {
                if let Some(item) = &option.item {
                    let at = format!("{at}?");
                    expect_kind(&at, option.value_kind, item)?;
                    item.validate_at(&at)?;
                }
            }
            BinValue::Map(map) => {
                for (i, (key, value)) in map.entries.iter().enumerate() {
                    let key_at = format!("{at}.key[{i}]");
                    expect_kind(&key_at, map.key_kind, key)?;
                    key.validate_at(&key_at)?;
                    let value_at = format!("{at}.value[{i}]");
                    expect_kind(&value_at, map.value_kind, value)?;
                    value.validate_at(&value_at)?;
                }
            }
            BinValue::Pointer(obj) if obj.class.is_null() && !obj.fields.is_empty() => {
                return Err(BinError::NullPointerWithFields {
                    at: at.to_string(),
                    count: obj.fields.len(),
                });
            }
            BinValue::Pointer(obj) | BinValue::Embed(obj) => {
                for field in &obj.fields {
                    field.value.validate_at(&format!("{at}.{}", field.name))?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

pub(crate) fn expect_kind(at: &str, expected: BinKind, value: &BinValue) -> Result<()> {
    let found = value.kind();
    if found != expected {
        return Err(BinError::KindMismatch {
            at: at.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

impl BinList {
    pub fn new(value_kind: BinKind, items: Vec<BinValue>) -> Self {
        Self { value_kind, items }
    }
}

impl BinOption {
    pub fn none(value_kind: BinKind) -> Self {
        Self {
            value_kind,
            item: None,
        }
    }

    pub fn some(item: BinValue) -> Self {
        Self {
            value_kind: item.kind(),
            item: Some(Box::new(item)),
        }
    }
}

impl BinMap {
    pub fn new(key_kind: BinKind, value_kind: BinKind) -> Self {
        Self {
            key_kind,
            value_kind,
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &BinValue) -> Option<&BinValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

impl BinField {
    pub fn new(name: impl Into<NameHash>, value: BinValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl BinObject {
    pub fn new(class: impl Into<NameHash>, fields: Vec<BinField>) -> Self {
        Self {
            class: class.into(),
            fields,
        }
    }

    pub fn field(&self, name: impl Into<NameHash>) -> Option<&BinValue> {
        let name = name.into();
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    pub fn field_mut(&mut self, name: impl Into<NameHash>) -> Option<&mut BinValue> {
        let name = name.into();
        self.fields
            .iter_mut()
            .find(|f| f.name == name)
            .map(|f| &mut f.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_consistent_containers() {
        let value = BinValue::List(BinList::new(
            BinKind::String,
            vec![BinValue::String("a".into()), BinValue::String("b".into())],
        ));
        assert!(value.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_kind_mismatch() {
        let value = BinValue::Map(BinMap {
            key_kind: BinKind::Hash,
            value_kind: BinKind::U32,
            entries: vec![(BinValue::Hash(NameHash::new(1)), BinValue::I32(3))],
        });
        assert!(matches!(
            value.validate(),
            Err(BinError::KindMismatch {
                expected: BinKind::U32,
                found: BinKind::I32,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_null_pointer_with_fields() {
        let value = BinValue::Pointer(BinObject::new(
            0u32,
            vec![BinField::new("x", BinValue::U8(1))],
        ));
        assert!(matches!(
            value.validate(),
            Err(BinError::NullPointerWithFields { count: 1, .. })
        ));
        assert!(BinValue::null_pointer().validate().is_ok());
    }

    #[test]
    fn test_field_lookup_by_name() {
        let obj = BinObject::new(
            "StaticMaterialDef",
            vec![BinField::new("name", BinValue::String("mat".into()))],
        );
        assert_eq!(obj.field("Name").and_then(BinValue::as_str), Some("mat"));
        assert!(obj.field("missing").is_none());
    }
}
