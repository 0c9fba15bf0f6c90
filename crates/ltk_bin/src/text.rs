//! JSON front-end for property trees.
//!
//! The root document is an object of sections:
//!
//! ```json
//! {
//!   "type": { "type": "string", "value": "PROP" },
//!   "version": { "type": "u32", "value": 3 },
//!   "entries": {
//!     "type": "map[hash,embed]",
//!     "value": [
//!       {
//!         "key": "Characters/Ahri/Skins/Skin0",
//!         "value": {
//!           "name": "SkinCharacterDataProperties",
//!           "items": [{ "key": "skinScale", "type": "f32", "value": 1.2 }]
//!         }
//!       }
//!     ]
//!   }
//! }
//! ```
//!
//! Hashes are given as a JSON number, a `0x` prefixed hex string, or any
//! other string, which is hashed and retained.

use serde_json::{json, Map, Value};

use crate::error::{BinError, Result};
use crate::hash::{NameHash, PathHash};
use crate::kind::BinKind;
use crate::tree::PropertyTree;
use crate::value::{BinField, BinList, BinMap, BinObject, BinOption, BinValue};

/// A parsed type name such as `map[hash,list[string]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    Scalar(BinKind),
    List(Box<TypeSpec>),
    List2(Box<TypeSpec>),
    Option(Box<TypeSpec>),
    Map(Box<TypeSpec>, Box<TypeSpec>),
}

impl TypeSpec {
    pub fn parse(text: &str) -> Option<Self> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        Self::parse_compact(&compact.to_ascii_lowercase())
    }

    fn parse_compact(text: &str) -> Option<Self> {
        let Some(open) = text.find('[') else {
            let kind = BinKind::from_name(text)?;
            return (!kind.is_container()).then_some(TypeSpec::Scalar(kind));
        };
        let inner = text[open + 1..].strip_suffix(']')?;
        match &text[..open] {
            "list" => Some(TypeSpec::List(Box::new(Self::parse_compact(inner)?))),
            "list2" => Some(TypeSpec::List2(Box::new(Self::parse_compact(inner)?))),
            "option" => Some(TypeSpec::Option(Box::new(Self::parse_compact(inner)?))),
            "map" => {
                let split = top_level_comma(inner)?;
                Some(TypeSpec::Map(
                    Box::new(Self::parse_compact(&inner[..split])?),
                    Box::new(Self::parse_compact(&inner[split + 1..])?),
                ))
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> BinKind {
        match self {
            TypeSpec::Scalar(kind) => *kind,
            TypeSpec::List(_) => BinKind::List,
            TypeSpec::List2(_) => BinKind::List2,
            TypeSpec::Option(_) => BinKind::Option,
            TypeSpec::Map(..) => BinKind::Map,
        }
    }

    /// Derives the full type name of a value. Element specs are merged over
    /// every item, so an empty nested container early on does not hide the
    /// element types of later ones; parameters no item reaches stay `none`.
    pub fn of(value: &BinValue) -> Self {
        match value {
            BinValue::List(list) => {
                TypeSpec::List(Box::new(element_spec(list.value_kind, &list.items)))
            }
            BinValue::List2(list) => {
                TypeSpec::List2(Box::new(element_spec(list.value_kind, &list.items)))
            }
            BinValue::Option(option) => TypeSpec::Option(Box::new(element_spec(
                option.value_kind,
                option.item.as_deref(),
            ))),
            BinValue::Map(map) => TypeSpec::Map(
                Box::new(element_spec(map.key_kind, map.entries.iter().map(|(k, _)| k))),
                Box::new(element_spec(map.value_kind, map.entries.iter().map(|(_, v)| v))),
            ),
            other => TypeSpec::Scalar(other.kind()),
        }
    }

    /// Fills `none` placeholders in `self` from `other`.
    fn merge(self, other: TypeSpec) -> TypeSpec {
        match (self, other) {
            (TypeSpec::Scalar(BinKind::None), other) => other,
            (TypeSpec::List(a), TypeSpec::List(b)) => TypeSpec::List(Box::new(a.merge(*b))),
            (TypeSpec::List2(a), TypeSpec::List2(b)) => TypeSpec::List2(Box::new(a.merge(*b))),
            (TypeSpec::Option(a), TypeSpec::Option(b)) => {
                TypeSpec::Option(Box::new(a.merge(*b)))
            }
            (TypeSpec::Map(ak, av), TypeSpec::Map(bk, bv)) => {
                TypeSpec::Map(Box::new(ak.merge(*bk)), Box::new(av.merge(*bv)))
            }
            (this, _) => this,
        }
    }
}

fn element_spec<'a>(kind: BinKind, items: impl IntoIterator<Item = &'a BinValue>) -> TypeSpec {
    items
        .into_iter()
        .fold(default_spec(kind), |spec, item| spec.merge(TypeSpec::of(item)))
}

fn default_spec(kind: BinKind) -> TypeSpec {
    let none = || Box::new(TypeSpec::Scalar(BinKind::None));
    match kind {
        BinKind::List => TypeSpec::List(none()),
        BinKind::List2 => TypeSpec::List2(none()),
        BinKind::Option => TypeSpec::Option(none()),
        BinKind::Map => TypeSpec::Map(none(), none()),
        kind => TypeSpec::Scalar(kind),
    }
}

impl std::fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeSpec::Scalar(kind) => f.write_str(kind.name()),
            TypeSpec::List(inner) => write!(f, "list[{inner}]"),
            TypeSpec::List2(inner) => write!(f, "list2[{inner}]"),
            TypeSpec::Option(inner) => write!(f, "option[{inner}]"),
            TypeSpec::Map(key, value) => write!(f, "map[{key},{value}]"),
        }
    }
}

fn top_level_comma(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in text.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            ',' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Parses a JSON document into a property tree.
pub fn from_json_str(text: &str) -> Result<PropertyTree> {
    let root: Value = serde_json::from_str(text)?;
    let Value::Object(sections) = root else {
        return Err(BinError::text("$", "root must be an object of sections"));
    };

    let mut tree = PropertyTree::default();
    for (name, section) in &sections {
        let spec = type_of(section, name)?;
        let value = section
            .get("value")
            .ok_or_else(|| BinError::text(name.as_str(), "missing 'value'"))?;
        tree.set(name, build_value(&spec, value, name)?);
    }
    Ok(tree)
}

fn type_of(node: &Value, path: &str) -> Result<TypeSpec> {
    let name = node
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| BinError::text(path, "missing 'type'"))?;
    TypeSpec::parse(name).ok_or_else(|| BinError::text(path, format!("unknown type '{name}'")))
}

fn build_value(spec: &TypeSpec, json: &Value, path: &str) -> Result<BinValue> {
    let err = |message: String| BinError::text(path, message);
    let kind = spec.kind();

    Ok(match spec {
        TypeSpec::List(inner) | TypeSpec::List2(inner) => {
            let array = json
                .as_array()
                .ok_or_else(|| err(format!("{kind} expects an array")))?;
            let items = array
                .iter()
                .enumerate()
                .map(|(i, item)| build_value(inner, item, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>>>()?;
            let list = BinList::new(inner.kind(), items);
            if matches!(spec, TypeSpec::List(_)) {
                BinValue::List(list)
            } else {
                BinValue::List2(list)
            }
        }
        TypeSpec::Option(inner) => {
            let item = match json {
                Value::Null => None,
                item => Some(Box::new(build_value(inner, item, &format!("{path}?"))?)),
            };
            BinValue::Option(BinOption {
                value_kind: inner.kind(),
                item,
            })
        }
        TypeSpec::Map(key_spec, value_spec) => {
            let mut map = BinMap::new(key_spec.kind(), value_spec.kind());
            match json {
                Value::Array(pairs) => {
                    for (i, pair) in pairs.iter().enumerate() {
                        let pair_path = format!("{path}[{i}]");
                        let key = pair
                            .get("key")
                            .ok_or_else(|| BinError::text(&pair_path, "missing 'key'"))?;
                        let value = pair
                            .get("value")
                            .ok_or_else(|| BinError::text(&pair_path, "missing 'value'"))?;
                        map.entries.push((
                            build_value(key_spec, key, &format!("{pair_path}.key"))?,
                            build_value(value_spec, value, &format!("{pair_path}.value"))?,
                        ));
                    }
                }
                // Objects are accepted as a shorthand when keys are strings or hashes.
                Value::Object(pairs) => {
                    for (key, value) in pairs {
                        let key_path = format!("{path}.{key}");
                        map.entries.push((
                            build_value(key_spec, &Value::String(key.clone()), &key_path)?,
                            build_value(value_spec, value, &key_path)?,
                        ));
                    }
                }
                _ => return Err(err("map expects an array of {key, value}".to_string())),
            }
            BinValue::Map(map)
        }
        TypeSpec::Scalar(kind) => build_scalar(*kind, json, path)?,
    })
}

fn build_scalar(kind: BinKind, json: &Value, path: &str) -> Result<BinValue> {
    let err = |message: &str| BinError::text(path, format!("{kind}: {message}"));
    let int = |json: &Value| json.as_i64().ok_or_else(|| err("expected an integer"));
    let uint = |json: &Value| json.as_u64().ok_or_else(|| err("expected an unsigned integer"));
    let range = || err("integer out of range");

    Ok(match kind {
        BinKind::None => match json {
            Value::Null => BinValue::None,
            _ => return Err(err("expected null")),
        },
        BinKind::Bool => BinValue::Bool(as_bool(json).ok_or_else(|| err("expected a bool"))?),
        BinKind::Flag => BinValue::Flag(as_bool(json).ok_or_else(|| err("expected a bool"))?),
        BinKind::I8 => BinValue::I8(i8::try_from(int(json)?).map_err(|_| range())?),
        BinKind::U8 => BinValue::U8(u8::try_from(uint(json)?).map_err(|_| range())?),
        BinKind::I16 => BinValue::I16(i16::try_from(int(json)?).map_err(|_| range())?),
        BinKind::U16 => BinValue::U16(u16::try_from(uint(json)?).map_err(|_| range())?),
        BinKind::I32 => BinValue::I32(i32::try_from(int(json)?).map_err(|_| range())?),
        BinKind::U32 => BinValue::U32(u32::try_from(uint(json)?).map_err(|_| range())?),
        BinKind::I64 => BinValue::I64(int(json)?),
        BinKind::U64 => BinValue::U64(uint(json)?),
        BinKind::F32 => BinValue::F32(json.as_f64().ok_or_else(|| err("expected a number"))? as f32),
        BinKind::Vec2 => BinValue::Vec2(floats(json).ok_or_else(|| err("expected 2 numbers"))?),
        BinKind::Vec3 => BinValue::Vec3(floats(json).ok_or_else(|| err("expected 3 numbers"))?),
        BinKind::Vec4 => BinValue::Vec4(floats(json).ok_or_else(|| err("expected 4 numbers"))?),
        BinKind::Mtx44 => {
            BinValue::Mtx44(floats(json).ok_or_else(|| err("expected 16 numbers"))?)
        }
        BinKind::Rgba => {
            let array = json
                .as_array()
                .filter(|a| a.len() == 4)
                .ok_or_else(|| err("expected 4 bytes"))?;
            let mut rgba = [0u8; 4];
            for (slot, item) in rgba.iter_mut().zip(array) {
                *slot = u8::try_from(uint(item)?).map_err(|_| range())?;
            }
            BinValue::Rgba(rgba)
        }
        BinKind::String => BinValue::String(
            json.as_str()
                .ok_or_else(|| err("expected a string"))?
                .to_string(),
        ),
        BinKind::Hash => BinValue::Hash(name_hash(json, path)?),
        BinKind::Link => BinValue::Link(name_hash(json, path)?),
        BinKind::File => BinValue::File(path_hash(json, path)?),
        BinKind::Pointer => match json {
            Value::Null => BinValue::null_pointer(),
            json => {
                let obj = build_object(json, path)?;
                if obj.class.is_null() && !obj.fields.is_empty() {
                    return Err(BinError::NullPointerWithFields {
                        at: path.to_string(),
                        count: obj.fields.len(),
                    });
                }
                BinValue::Pointer(obj)
            }
        },
        BinKind::Embed => BinValue::Embed(build_object(json, path)?),
        BinKind::List | BinKind::List2 | BinKind::Option | BinKind::Map => {
            return Err(err("container types need element types"))
        }
    })
}

fn as_bool(json: &Value) -> Option<bool> {
    match json {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_u64().map(|n| n != 0),
        _ => None,
    }
}

fn floats<const N: usize>(json: &Value) -> Option<[f32; N]> {
    let array = json.as_array().filter(|a| a.len() == N)?;
    let mut out = [0f32; N];
    for (slot, item) in out.iter_mut().zip(array) {
        *slot = item.as_f64()? as f32;
    }
    Some(out)
}

fn build_object(json: &Value, path: &str) -> Result<BinObject> {
    let name = json
        .get("name")
        .ok_or_else(|| BinError::text(path, "object needs a 'name'"))?;
    let class = name_hash(name, &format!("{path}.name"))?;

    let mut fields = Vec::new();
    if let Some(items) = json.get("items") {
        let items = items
            .as_array()
            .ok_or_else(|| BinError::text(path, "'items' must be an array"))?;
        for (i, item) in items.iter().enumerate() {
            let item_path = format!("{path}.items[{i}]");
            let key = item
                .get("key")
                .ok_or_else(|| BinError::text(&item_path, "missing 'key'"))?;
            let name = name_hash(key, &item_path)?;
            let field_path = format!("{path}.{name}");
            let spec = type_of(item, &field_path)?;
            let value = item
                .get("value")
                .ok_or_else(|| BinError::text(&field_path, "missing 'value'"))?;
            fields.push(BinField {
                name,
                value: build_value(&spec, value, &field_path)?,
            });
        }
    }

    Ok(BinObject { class, fields })
}

fn parse_hex(text: &str) -> Option<u64> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}

fn name_hash(json: &Value, path: &str) -> Result<NameHash> {
    let out_of_range = || BinError::text(path, "hash does not fit in 32 bits");
    match json {
        Value::Number(n) => {
            let n = n
                .as_u64()
                .ok_or_else(|| BinError::text(path, "hash must be unsigned"))?;
            Ok(NameHash::new(u32::try_from(n).map_err(|_| out_of_range())?))
        }
        Value::String(s) => match parse_hex(s) {
            Some(n) => Ok(NameHash::new(u32::try_from(n).map_err(|_| out_of_range())?)),
            None => Ok(NameHash::from_name(s.as_str())),
        },
        _ => Err(BinError::text(path, "hash must be a number or a string")),
    }
}

fn path_hash(json: &Value, path: &str) -> Result<PathHash> {
    match json {
        Value::Number(n) => n
            .as_u64()
            .map(PathHash::new)
            .ok_or_else(|| BinError::text(path, "file hash must be unsigned")),
        Value::String(s) => Ok(parse_hex(s)
            .map(PathHash::new)
            .unwrap_or_else(|| PathHash::from_path(s.as_str()))),
        _ => Err(BinError::text(path, "file hash must be a number or a string")),
    }
}

/// Prints a property tree as a JSON document readable by [`from_json_str`].
pub fn to_json_string(tree: &PropertyTree) -> Result<String> {
    let mut root = Map::new();
    for (name, value) in &tree.sections {
        root.insert(
            name.clone(),
            json!({ "type": TypeSpec::of(value).to_string(), "value": value_to_json(value) }),
        );
    }
    Ok(serde_json::to_string_pretty(&Value::Object(root))?)
}

fn value_to_json(value: &BinValue) -> Value {
    match value {
        BinValue::None => Value::Null,
        BinValue::Bool(v) | BinValue::Flag(v) => json!(v),
        BinValue::I8(v) => json!(v),
        BinValue::U8(v) => json!(v),
        BinValue::I16(v) => json!(v),
        BinValue::U16(v) => json!(v),
        BinValue::I32(v) => json!(v),
        BinValue::U32(v) => json!(v),
        BinValue::I64(v) => json!(v),
        BinValue::U64(v) => json!(v),
        BinValue::F32(v) => json!(v),
        BinValue::Vec2(v) => json!(v),
        BinValue::Vec3(v) => json!(v),
        BinValue::Vec4(v) => json!(v),
        BinValue::Mtx44(v) => json!(v.to_vec()),
        BinValue::Rgba(v) => json!(v),
        BinValue::String(v) => json!(v),
        BinValue::Hash(h) | BinValue::Link(h) => name_to_json(h),
        BinValue::File(h) => match &h.path {
            Some(path) => json!(path),
            None => json!(format!("0x{:016x}", h.hash)),
        },
        BinValue::List(list) | BinValue::List2(list) => {
            Value::Array(list.items.iter().map(value_to_json).collect())
        }
        BinValue::Option(option) => option
            .item
            .as_deref()
            .map(value_to_json)
            .unwrap_or(Value::Null),
        BinValue::Map(map) => Value::Array(
            map.entries
                .iter()
                .map(|(k, v)| json!({ "key": value_to_json(k), "value": value_to_json(v) }))
                .collect(),
        ),
        BinValue::Pointer(obj) if obj.class.is_null() => Value::Null,
        BinValue::Pointer(obj) | BinValue::Embed(obj) => json!({
            "name": name_to_json(&obj.class),
            "items": obj.fields.iter().map(|field| json!({
                "key": name_to_json(&field.name),
                "type": TypeSpec::of(&field.value).to_string(),
                "value": value_to_json(&field.value),
            })).collect::<Vec<_>>(),
        }),
    }
}

fn name_to_json(hash: &NameHash) -> Value {
    match &hash.name {
        Some(name) => json!(name),
        None => json!(format!("0x{:08x}", hash.hash)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::from_bytes;
    use crate::writer::to_bytes;

    const SAMPLE: &str = r#"{
        "type": { "type": "string", "value": "PROP" },
        "version": { "type": "u32", "value": 3 },
        "linked": { "type": "list[string]", "value": ["DATA/Characters/Ahri/Ahri.bin"] },
        "entries": {
            "type": "map[hash, embed]",
            "value": [
                {
                    "key": "Characters/Ahri/Skins/Skin0",
                    "value": {
                        "name": "SkinCharacterDataProperties",
                        "items": [
                            { "key": "skinScale", "type": "f32", "value": 1.5 },
                            { "key": "0x0000abcd", "type": "string", "value": "ASSETS/Ahri.dds" },
                            { "key": 17, "type": "option[vec3]", "value": [1, 2, 3] },
                            { "key": "tags", "type": "list2[hash]", "value": ["One", "0x2"] },
                            { "key": "colors", "type": "map[u8,rgba]", "value": [{ "key": 1, "value": [255, 0, 0, 255] }] },
                            { "key": "nothing", "type": "pointer", "value": null },
                            { "key": "material", "type": "link", "value": "Materials/Ahri" },
                            { "key": "mesh", "type": "file", "value": "ASSETS/Ahri.skn" }
                        ]
                    }
                }
            ]
        }
    }"#;

    #[test]
    fn test_type_spec_parsing() {
        assert_eq!(
            TypeSpec::parse("map[ hash , list[string] ]"),
            Some(TypeSpec::Map(
                Box::new(TypeSpec::Scalar(BinKind::Hash)),
                Box::new(TypeSpec::List(Box::new(TypeSpec::Scalar(BinKind::String)))),
            ))
        );
        assert_eq!(TypeSpec::parse("Option[U8]").map(|s| s.to_string()), Some("option[u8]".into()));
        assert_eq!(TypeSpec::parse("list"), None);
        assert_eq!(TypeSpec::parse("map[u8]"), None);
        assert_eq!(TypeSpec::parse("vec5"), None);
    }

    #[test]
    fn test_text_matches_binary_model() {
        let tree = from_json_str(SAMPLE).unwrap();
        let bytes = to_bytes(&tree).unwrap();
        let decoded = from_bytes(&bytes).unwrap();
        assert_eq!(decoded, tree);

        let entry = decoded
            .entry(NameHash::from_name("characters/ahri/skins/skin0"))
            .unwrap();
        assert_eq!(entry.class, NameHash::from_name("SkinCharacterDataProperties"));
        assert_eq!(entry.field(0xabcdu32).and_then(BinValue::as_str), Some("ASSETS/Ahri.dds"));
        assert_eq!(
            entry.field(17u32),
            Some(&BinValue::Option(BinOption::some(BinValue::Vec3([1.0, 2.0, 3.0]))))
        );
        assert_eq!(
            entry.field("mesh"),
            Some(&BinValue::File(PathHash::from_path("assets/ahri.skn")))
        );
    }

    #[test]
    fn test_errors_carry_node_path() {
        let bad = r#"{ "entries": { "type": "map[hash,embed]", "value": [
            { "key": "A", "value": { "name": "B", "items": [ { "key": "c", "type": "u8", "value": 300 } ] } }
        ] } }"#;
        match from_json_str(bad) {
            Err(BinError::Text { path, .. }) => assert_eq!(path, "entries[0].value.c"),
            other => panic!("unexpected result: {other:?}"),
        }

        let bad_type = r#"{ "version": { "type": "u33", "value": 1 } }"#;
        assert!(matches!(
            from_json_str(bad_type),
            Err(BinError::Text { path, .. }) if path == "version"
        ));
    }

    #[test]
    fn test_dump_reparses_to_same_tree() {
        let tree = from_json_str(SAMPLE).unwrap();
        let decoded = from_bytes(&to_bytes(&tree).unwrap()).unwrap();
        let dumped = to_json_string(&decoded).unwrap();
        let reparsed = from_json_str(&dumped).unwrap();
        assert_eq!(reparsed, decoded);
    }

    #[test]
    fn test_empty_nested_list_keeps_element_types() {
        let doc = r#"{
            "type": { "type": "string", "value": "PROP" },
            "version": { "type": "u32", "value": 3 },
            "linked": { "type": "list[string]", "value": [] },
            "entries": {
                "type": "map[hash,embed]",
                "value": [{
                    "key": "Nested",
                    "value": {
                        "name": "Holder",
                        "items": [
                            { "key": "paths", "type": "list[list[list[string]]]", "value": [[], [["a"]]] }
                        ]
                    }
                }]
            }
        }"#;
        let decoded = from_bytes(&to_bytes(&from_json_str(doc).unwrap()).unwrap()).unwrap();
        let dumped = to_json_string(&decoded).unwrap();
        assert!(dumped.contains("list[list[list[string]]]"));

        let reparsed = from_json_str(&dumped).unwrap();
        assert_eq!(reparsed, decoded);
        assert_eq!(to_bytes(&reparsed).unwrap(), to_bytes(&decoded).unwrap());
    }

    #[test]
    fn test_none_rejects_values() {
        let doc = r#"{ "extra": { "type": "list[none]", "value": [null, "a"] } }"#;
        assert!(matches!(
            from_json_str(doc),
            Err(BinError::Text { path, .. }) if path == "extra[1]"
        ));
    }
}
