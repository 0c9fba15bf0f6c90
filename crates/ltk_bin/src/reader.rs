//! Binary decoder.

use std::io::{self, Cursor, Read};

use byteorder::{ReadBytesExt, LE};

use crate::error::{BinError, Result};
use crate::hash::{NameHash, PathHash};
use crate::kind::BinKind;
use crate::tree::{
    PropertyTree, PROP_MAGIC, PTCH_MAGIC, SECTION_ENTRIES, SECTION_LINKED, SECTION_PATCHES,
    SECTION_PATCH_HEADER, SECTION_TYPE, SECTION_VERSION,
};
use crate::value::{BinField, BinList, BinMap, BinObject, BinOption, BinValue};

/// Class hash of the synthetic objects that hold decoded patches.
pub const PATCH_CLASS: &str = "patch";
pub const PATCH_PATH_FIELD: &str = "path";
pub const PATCH_VALUE_FIELD: &str = "value";

/// Deepest container nesting accepted while decoding.
pub const MAX_DEPTH: usize = 128;

/// Decodes a binary property bin.
pub fn from_bytes(data: &[u8]) -> Result<PropertyTree> {
    BinReader::new(data).read_tree()
}

struct BinReader<'a> {
    cursor: Cursor<&'a [u8]>,
    depth: usize,
}

impl<'a> BinReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
            depth: 0,
        }
    }

    fn offset(&self) -> u64 {
        self.cursor.position()
    }

    fn read<T>(&mut self, f: impl FnOnce(&mut Cursor<&'a [u8]>) -> io::Result<T>) -> Result<T> {
        let offset = self.offset();
        f(&mut self.cursor).map_err(|_| BinError::UnexpectedEof { offset })
    }

    fn u8(&mut self) -> Result<u8> {
        self.read(|c| c.read_u8())
    }

    fn u16(&mut self) -> Result<u16> {
        self.read(|c| c.read_u16::<LE>())
    }

    fn u32(&mut self) -> Result<u32> {
        self.read(|c| c.read_u32::<LE>())
    }

    fn u64(&mut self) -> Result<u64> {
        self.read(|c| c.read_u64::<LE>())
    }

    fn f32s<const N: usize>(&mut self) -> Result<[f32; N]> {
        let mut out = [0f32; N];
        self.read(|c| c.read_f32_into::<LE>(&mut out))?;
        Ok(out)
    }

    fn magic(&mut self) -> Result<[u8; 4]> {
        let mut magic = [0u8; 4];
        self.read(|c| c.read_exact(&mut magic))?;
        Ok(magic)
    }

    fn kind(&mut self) -> Result<BinKind> {
        let offset = self.offset();
        let tag = self.u8()?;
        BinKind::try_from(tag).map_err(|tag| BinError::UnknownKind { offset, tag })
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u16()? as usize;
        let offset = self.offset();
        let mut buf = vec![0u8; len];
        self.read(|c| c.read_exact(&mut buf))?;
        String::from_utf8(buf).map_err(|_| BinError::InvalidUtf8 { offset })
    }

    /// Reads a u32 byte length and returns `(declared, body start)`.
    fn begin_frame(&mut self) -> Result<(u64, u64)> {
        let declared = self.u32()? as u64;
        Ok((declared, self.offset()))
    }

    fn end_frame(&self, declared: u64, start: u64) -> Result<()> {
        let actual = self.offset() - start;
        if actual != declared {
            return Err(BinError::LengthMismatch {
                offset: start,
                declared,
                actual,
            });
        }
        Ok(())
    }

    fn read_tree(&mut self) -> Result<PropertyTree> {
        let mut tree = PropertyTree::default();

        let magic = self.magic()?;
        let is_patch = match &magic {
            m if m == PTCH_MAGIC => {
                let header = self.u64()?;
                tree.set(SECTION_PATCH_HEADER, BinValue::U64(header));
                let offset = self.offset();
                let inner = self.magic()?;
                if &inner != PROP_MAGIC {
                    return Err(BinError::InvalidMagic {
                        offset,
                        found: inner,
                    });
                }
                true
            }
            m if m == PROP_MAGIC => false,
            _ => {
                return Err(BinError::InvalidMagic {
                    offset: 0,
                    found: magic,
                })
            }
        };
        let type_name = if is_patch { "PTCH" } else { "PROP" };
        tree.set(SECTION_TYPE, BinValue::String(type_name.to_string()));

        let version = self.u32()?;
        tree.set(SECTION_VERSION, BinValue::U32(version));

        if version >= 2 {
            let count = self.u32()?;
            let mut linked = Vec::new();
            for _ in 0..count {
                linked.push(BinValue::String(self.string()?));
            }
            tree.set(
                SECTION_LINKED,
                BinValue::List(BinList::new(BinKind::String, linked)),
            );
        }

        tree.set(SECTION_ENTRIES, BinValue::Map(self.read_entries()?));

        if is_patch {
            tree.set(SECTION_PATCHES, BinValue::Map(self.read_patches()?));
        }

        let remaining = self.cursor.get_ref().len() as u64 - self.offset();
        if remaining > 0 {
            tracing::debug!("Ignoring trailing bytes after property bin remaining={}", remaining);
        }

        Ok(tree)
    }

    fn read_entries(&mut self) -> Result<BinMap> {
        let count = self.u32()?;
        // Entry class hashes come as one table before any entry body.
        let mut classes = Vec::new();
        for _ in 0..count {
            classes.push(self.u32()?);
        }

        let mut map = BinMap::new(BinKind::Hash, BinKind::Embed);
        for class in classes {
            let (declared, start) = self.begin_frame()?;
            let name = self.u32()?;
            let fields = self.read_fields()?;
            self.end_frame(declared, start)?;
            map.entries.push((
                BinValue::Hash(NameHash::new(name)),
                BinValue::Embed(BinObject {
                    class: NameHash::new(class),
                    fields,
                }),
            ));
        }
        Ok(map)
    }

    fn read_patches(&mut self) -> Result<BinMap> {
        let count = self.u32()?;
        let mut map = BinMap::new(BinKind::Hash, BinKind::Embed);
        for _ in 0..count {
            let name = self.u32()?;
            let (declared, start) = self.begin_frame()?;
            let kind = self.kind()?;
            let path = self.string()?;
            let value = self.read_value(kind)?;
            self.end_frame(declared, start)?;
            map.entries.push((
                BinValue::Hash(NameHash::new(name)),
                BinValue::Embed(BinObject::new(
                    PATCH_CLASS,
                    vec![
                        BinField::new(PATCH_PATH_FIELD, BinValue::String(path)),
                        BinField::new(PATCH_VALUE_FIELD, value),
                    ],
                )),
            ));
        }
        Ok(map)
    }

    fn read_fields(&mut self) -> Result<Vec<BinField>> {
        let count = self.u16()?;
        let mut fields = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = NameHash::new(self.u32()?);
            let kind = self.kind()?;
            let value = self.read_value(kind)?;
            fields.push(BinField { name, value });
        }
        Ok(fields)
    }

    fn read_object_body(&mut self, class: NameHash) -> Result<BinObject> {
        let (declared, start) = self.begin_frame()?;
        let fields = self.read_fields()?;
        self.end_frame(declared, start)?;
        Ok(BinObject { class, fields })
    }

    fn read_value(&mut self, kind: BinKind) -> Result<BinValue> {
        if self.depth >= MAX_DEPTH {
            return Err(BinError::TooDeep {
                offset: self.offset(),
                limit: MAX_DEPTH,
            });
        }
        self.depth += 1;
        let value = self.read_value_at_depth(kind);
        self.depth -= 1;
        value
    }

    fn read_value_at_depth(&mut self, kind: BinKind) -> Result<BinValue> {
        Ok(match kind {
            BinKind::None => BinValue::None,
            BinKind::Bool => BinValue::Bool(self.u8()? != 0),
            BinKind::I8 => BinValue::I8(self.read(|c| c.read_i8())?),
            BinKind::U8 => BinValue::U8(self.u8()?),
            BinKind::I16 => BinValue::I16(self.read(|c| c.read_i16::<LE>())?),
            BinKind::U16 => BinValue::U16(self.u16()?),
            BinKind::I32 => BinValue::I32(self.read(|c| c.read_i32::<LE>())?),
            BinKind::U32 => BinValue::U32(self.u32()?),
            BinKind::I64 => BinValue::I64(self.read(|c| c.read_i64::<LE>())?),
            BinKind::U64 => BinValue::U64(self.u64()?),
            BinKind::F32 => BinValue::F32(self.read(|c| c.read_f32::<LE>())?),
            BinKind::Vec2 => BinValue::Vec2(self.f32s::<2>()?),
            BinKind::Vec3 => BinValue::Vec3(self.f32s::<3>()?),
            BinKind::Vec4 => BinValue::Vec4(self.f32s::<4>()?),
            BinKind::Mtx44 => BinValue::Mtx44(self.f32s::<16>()?),
            BinKind::Rgba => {
                let mut rgba = [0u8; 4];
                self.read(|c| c.read_exact(&mut rgba))?;
                BinValue::Rgba(rgba)
            }
            BinKind::String => BinValue::String(self.string()?),
            BinKind::Hash => BinValue::Hash(NameHash::new(self.u32()?)),
            BinKind::File => BinValue::File(PathHash::new(self.u64()?)),
            BinKind::Link => BinValue::Link(NameHash::new(self.u32()?)),
            BinKind::Flag => BinValue::Flag(self.u8()? != 0),
            BinKind::List => BinValue::List(self.read_list()?),
            BinKind::List2 => BinValue::List2(self.read_list()?),
            BinKind::Pointer => {
                let class = NameHash::new(self.u32()?);
                if class.is_null() {
                    BinValue::null_pointer()
                } else {
                    BinValue::Pointer(self.read_object_body(class)?)
                }
            }
            BinKind::Embed => {
                let class = NameHash::new(self.u32()?);
                BinValue::Embed(self.read_object_body(class)?)
            }
            BinKind::Option => {
                let value_kind = self.kind()?;
                let offset = self.offset();
                let count = self.u8()?;
                let item = match count {
                    0 => None,
                    1 => Some(Box::new(self.read_value(value_kind)?)),
                    count => return Err(BinError::InvalidOptionCount { offset, count }),
                };
                BinValue::Option(BinOption { value_kind, item })
            }
            BinKind::Map => {
                let key_kind = self.kind()?;
                let value_kind = self.kind()?;
                let (declared, start) = self.begin_frame()?;
                let count = self.u32()?;
                let mut entries = Vec::new();
                for _ in 0..count {
                    let key = self.read_value(key_kind)?;
                    let value = self.read_value(value_kind)?;
                    entries.push((key, value));
                }
                self.end_frame(declared, start)?;
                BinValue::Map(BinMap {
                    key_kind,
                    value_kind,
                    entries,
                })
            }
        })
    }

    fn read_list(&mut self) -> Result<BinList> {
        let value_kind = self.kind()?;
        let (declared, start) = self.begin_frame()?;
        let count = self.u32()?;
        let mut items = Vec::new();
        for _ in 0..count {
            items.push(self.read_value(value_kind)?);
        }
        self.end_frame(declared, start)?;
        Ok(BinList { value_kind, items })
    }
}
