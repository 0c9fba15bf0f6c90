//! Binary encoder.
//!
//! Lengths are written as zero placeholders and patched once the body has been
//! written. The stored length never includes the length field itself.

use std::io::{Cursor, Seek, SeekFrom, Write};

use byteorder::{WriteBytesExt, LE};

use crate::error::{BinError, Result};
use crate::kind::BinKind;
use crate::reader::{PATCH_PATH_FIELD, PATCH_VALUE_FIELD};
use crate::tree::{
    PropertyTree, PROP_MAGIC, PTCH_MAGIC, SECTION_ENTRIES, SECTION_PATCHES, SECTION_TYPE,
};
use crate::value::{expect_kind, BinField, BinList, BinMap, BinObject, BinValue};

/// Encodes a property tree into its binary form.
pub fn to_bytes(tree: &PropertyTree) -> Result<Vec<u8>> {
    let mut writer = BinWriter::default();
    writer.write_tree(tree)?;
    Ok(writer.cursor.into_inner())
}

#[derive(Default)]
struct BinWriter {
    cursor: Cursor<Vec<u8>>,
}

impl BinWriter {
    fn position(&self) -> u64 {
        self.cursor.position()
    }

    fn at(&self) -> String {
        format!("offset {}", self.position())
    }

    fn begin_frame(&mut self) -> Result<u64> {
        let at = self.position();
        self.cursor.write_u32::<LE>(0)?;
        Ok(at)
    }

    fn end_frame(&mut self, at: u64) -> Result<()> {
        let end = self.position();
        let size = (end - at - 4) as usize;
        let size = u32::try_from(size).map_err(|_| BinError::TooLarge {
            what: "body",
            at: format!("offset {at}"),
            size,
        })?;
        self.cursor.seek(SeekFrom::Start(at))?;
        self.cursor.write_u32::<LE>(size)?;
        self.cursor.seek(SeekFrom::Start(end))?;
        Ok(())
    }

    fn count_u32(&self, what: &'static str, len: usize) -> Result<u32> {
        u32::try_from(len).map_err(|_| BinError::TooLarge {
            what,
            at: self.at(),
            size: len,
        })
    }

    fn string(&mut self, value: &str) -> Result<()> {
        let len = u16::try_from(value.len()).map_err(|_| BinError::TooLarge {
            what: "string",
            at: self.at(),
            size: value.len(),
        })?;
        self.cursor.write_u16::<LE>(len)?;
        self.cursor.write_all(value.as_bytes())?;
        Ok(())
    }

    fn write_tree(&mut self, tree: &PropertyTree) -> Result<()> {
        let is_patch = match tree.get_section(SECTION_TYPE) {
            Some(BinValue::String(s)) if s == "PROP" => false,
            Some(BinValue::String(s)) if s == "PTCH" => true,
            Some(other) => {
                return Err(BinError::InvalidSection {
                    name: SECTION_TYPE.to_string(),
                    reason: format!("expected \"PROP\" or \"PTCH\", found {:?}", other),
                })
            }
            None => return Err(BinError::MissingSection(SECTION_TYPE)),
        };

        if is_patch {
            self.cursor.write_all(PTCH_MAGIC)?;
            self.cursor.write_u64::<LE>(tree.patch_header())?;
        }
        self.cursor.write_all(PROP_MAGIC)?;

        let version = tree.version()?;
        self.cursor.write_u32::<LE>(version)?;

        if version >= 2 {
            let linked = tree.linked()?;
            let count = self.count_u32("linked list", linked.len())?;
            self.cursor.write_u32::<LE>(count)?;
            for path in linked {
                self.string(path)?;
            }
        }

        let entries = object_map(tree, SECTION_ENTRIES)?;
        self.write_entries(entries)?;

        if is_patch {
            let patches = object_map(tree, SECTION_PATCHES)?;
            self.write_patches(patches)?;
        }

        Ok(())
    }

    fn write_entries(&mut self, entries: Vec<(u32, &BinObject)>) -> Result<()> {
        let count = self.count_u32("entries", entries.len())?;
        self.cursor.write_u32::<LE>(count)?;

        let table = self.position();
        for _ in 0..count {
            self.cursor.write_u32::<LE>(0)?;
        }

        let mut classes = Vec::with_capacity(entries.len());
        for (name, obj) in entries {
            let frame = self.begin_frame()?;
            self.cursor.write_u32::<LE>(name)?;
            self.write_fields(&obj.fields)?;
            self.end_frame(frame)?;
            classes.push(obj.class.hash);
        }

        let end = self.position();
        self.cursor.seek(SeekFrom::Start(table))?;
        for class in classes {
            self.cursor.write_u32::<LE>(class)?;
        }
        self.cursor.seek(SeekFrom::Start(end))?;
        Ok(())
    }

    fn write_patches(&mut self, patches: Vec<(u32, &BinObject)>) -> Result<()> {
        let count = self.count_u32("patches", patches.len())?;
        self.cursor.write_u32::<LE>(count)?;

        for (name, obj) in patches {
            let path = obj.field(PATCH_PATH_FIELD).and_then(BinValue::as_str);
            let value = obj.field(PATCH_VALUE_FIELD);
            let (Some(path), Some(value)) = (path, value) else {
                return Err(BinError::InvalidSection {
                    name: SECTION_PATCHES.to_string(),
                    reason: format!("patch 0x{name:08x} needs a string 'path' and a 'value'"),
                });
            };

            self.cursor.write_u32::<LE>(name)?;
            let frame = self.begin_frame()?;
            self.cursor.write_u8(value.kind() as u8)?;
            self.string(path)?;
            self.write_value(value)?;
            self.end_frame(frame)?;
        }
        Ok(())
    }

    fn write_fields(&mut self, fields: &[BinField]) -> Result<()> {
        let count = u16::try_from(fields.len()).map_err(|_| BinError::TooLarge {
            what: "field count",
            at: self.at(),
            size: fields.len(),
        })?;
        self.cursor.write_u16::<LE>(count)?;
        for field in fields {
            self.cursor.write_u32::<LE>(field.name.hash)?;
            self.cursor.write_u8(field.value.kind() as u8)?;
            self.write_value(&field.value)?;
        }
        Ok(())
    }

    fn write_object_body(&mut self, obj: &BinObject) -> Result<()> {
        let frame = self.begin_frame()?;
        self.write_fields(&obj.fields)?;
        self.end_frame(frame)
    }

    fn write_value(&mut self, value: &BinValue) -> Result<()> {
        match value {
            BinValue::None => {}
            BinValue::Bool(v) | BinValue::Flag(v) => self.cursor.write_u8(*v as u8)?,
            BinValue::I8(v) => self.cursor.write_i8(*v)?,
            BinValue::U8(v) => self.cursor.write_u8(*v)?,
            BinValue::I16(v) => self.cursor.write_i16::<LE>(*v)?,
            BinValue::U16(v) => self.cursor.write_u16::<LE>(*v)?,
            BinValue::I32(v) => self.cursor.write_i32::<LE>(*v)?,
            BinValue::U32(v) => self.cursor.write_u32::<LE>(*v)?,
            BinValue::I64(v) => self.cursor.write_i64::<LE>(*v)?,
            BinValue::U64(v) => self.cursor.write_u64::<LE>(*v)?,
            BinValue::F32(v) => self.cursor.write_f32::<LE>(*v)?,
            BinValue::Vec2(v) => self.write_f32s(v)?,
            BinValue::Vec3(v) => self.write_f32s(v)?,
            BinValue::Vec4(v) => self.write_f32s(v)?,
            BinValue::Mtx44(v) => self.write_f32s(v)?,
            BinValue::Rgba(v) => self.cursor.write_all(v)?,
            BinValue::String(v) => self.string(v)?,
            BinValue::Hash(v) | BinValue::Link(v) => self.cursor.write_u32::<LE>(v.hash)?,
            BinValue::File(v) => self.cursor.write_u64::<LE>(v.hash)?,
            BinValue::List(list) | BinValue::List2(list) => self.write_list(list)?,
            BinValue::Pointer(obj) => {
                self.cursor.write_u32::<LE>(obj.class.hash)?;
                if obj.class.is_null() {
                    if !obj.fields.is_empty() {
                        return Err(BinError::NullPointerWithFields {
                            at: self.at(),
                            count: obj.fields.len(),
                        });
                    }
                } else {
                    self.write_object_body(obj)?;
                }
            }
            BinValue::Embed(obj) => {
                self.cursor.write_u32::<LE>(obj.class.hash)?;
                self.write_object_body(obj)?;
            }
            BinValue::Option(option) => {
                self.cursor.write_u8(option.value_kind as u8)?;
                match &option.item {
                    Some(item) => {
                        expect_kind(&self.at(), option.value_kind, item)?;
                        self.cursor.write_u8(1)?;
                        self.write_value(item)?;
                    }
                    None => self.cursor.write_u8(0)?,
                }
            }
            BinValue::Map(map) => self.write_map(map)?,
        }
        Ok(())
    }

    fn write_f32s(&mut self, values: &[f32]) -> Result<()> {
        for v in values {
            self.cursor.write_f32::<LE>(*v)?;
        }
        Ok(())
    }

    fn write_list(&mut self, list: &BinList) -> Result<()> {
        self.cursor.write_u8(list.value_kind as u8)?;
        let frame = self.begin_frame()?;
        let count = self.count_u32("list", list.items.len())?;
        self.cursor.write_u32::<LE>(count)?;
        for item in &list.items {
            expect_kind(&self.at(), list.value_kind, item)?;
            self.write_value(item)?;
        }
        self.end_frame(frame)
    }

    fn write_map(&mut self, map: &BinMap) -> Result<()> {
        self.cursor.write_u8(map.key_kind as u8)?;
        self.cursor.write_u8(map.value_kind as u8)?;
        let frame = self.begin_frame()?;
        let count = self.count_u32("map", map.entries.len())?;
        self.cursor.write_u32::<LE>(count)?;
        for (key, value) in &map.entries {
            expect_kind(&self.at(), map.key_kind, key)?;
            self.write_value(key)?;
            expect_kind(&self.at(), map.value_kind, value)?;
            self.write_value(value)?;
        }
        self.end_frame(frame)
    }
}

/// Reads an `entries`/`patches` style section as `(name hash, object)` pairs.
/// An absent section is written as an empty table.
fn object_map<'a>(tree: &'a PropertyTree, section: &'static str) -> Result<Vec<(u32, &'a BinObject)>> {
    let map = match tree.get_section(section) {
        None => return Ok(Vec::new()),
        Some(BinValue::Map(map)) => map,
        Some(other) => {
            return Err(BinError::InvalidSection {
                name: section.to_string(),
                reason: format!("expected map, found {}", other.kind()),
            })
        }
    };

    map.entries
        .iter()
        .map(|(key, value)| match (key, value) {
            (BinValue::Hash(name), BinValue::Embed(obj)) => Ok((name.hash, obj)),
            (key, value) => Err(BinError::KindMismatch {
                at: format!("section '{section}'"),
                expected: if key.kind() == BinKind::Hash {
                    BinKind::Embed
                } else {
                    BinKind::Hash
                },
                found: if key.kind() == BinKind::Hash {
                    value.kind()
                } else {
                    key.kind()
                },
            }),
        })
        .collect()
}
