use std::fmt;

/// On-wire type tag of a [`BinValue`](crate::BinValue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum BinKind {
    None = 0,
    Bool = 1,
    I8 = 2,
    U8 = 3,
    I16 = 4,
    U16 = 5,
    I32 = 6,
    U32 = 7,
    I64 = 8,
    U64 = 9,
    F32 = 10,
    Vec2 = 11,
    Vec3 = 12,
    Vec4 = 13,
    Mtx44 = 14,
    Rgba = 15,
    String = 16,
    Hash = 17,
    File = 18,
    List = 0x80,
    List2 = 0x81,
    Pointer = 0x82,
    Embed = 0x83,
    Link = 0x84,
    Option = 0x85,
    Map = 0x86,
    Flag = 0x87,
}

const ALL_KINDS: [BinKind; 27] = [
    BinKind::None,
    BinKind::Bool,
    BinKind::I8,
    BinKind::U8,
    BinKind::I16,
    BinKind::U16,
    BinKind::I32,
    BinKind::U32,
    BinKind::I64,
    BinKind::U64,
    BinKind::F32,
    BinKind::Vec2,
    BinKind::Vec3,
    BinKind::Vec4,
    BinKind::Mtx44,
    BinKind::Rgba,
    BinKind::String,
    BinKind::Hash,
    BinKind::File,
    BinKind::List,
    BinKind::List2,
    BinKind::Pointer,
    BinKind::Embed,
    BinKind::Link,
    BinKind::Option,
    BinKind::Map,
    BinKind::Flag,
];

impl BinKind {
    /// Lower-case name used by the text format.
    pub fn name(self) -> &'static str {
        match self {
            BinKind::None => "none",
            BinKind::Bool => "bool",
            BinKind::I8 => "i8",
            BinKind::U8 => "u8",
            BinKind::I16 => "i16",
            BinKind::U16 => "u16",
            BinKind::I32 => "i32",
            BinKind::U32 => "u32",
            BinKind::I64 => "i64",
            BinKind::U64 => "u64",
            BinKind::F32 => "f32",
            BinKind::Vec2 => "vec2",
            BinKind::Vec3 => "vec3",
            BinKind::Vec4 => "vec4",
            BinKind::Mtx44 => "mtx44",
            BinKind::Rgba => "rgba",
            BinKind::String => "string",
            BinKind::Hash => "hash",
            BinKind::File => "file",
            BinKind::List => "list",
            BinKind::List2 => "list2",
            BinKind::Pointer => "pointer",
            BinKind::Embed => "embed",
            BinKind::Link => "link",
            BinKind::Option => "option",
            BinKind::Map => "map",
            BinKind::Flag => "flag",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ALL_KINDS
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Kinds that are parameterized by element kinds (`list[T]`, `map[K,V]`, ...).
    pub fn is_container(self) -> bool {
        matches!(
            self,
            BinKind::List | BinKind::List2 | BinKind::Option | BinKind::Map
        )
    }
}

impl TryFrom<u8> for BinKind {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        ALL_KINDS
            .iter()
            .copied()
            .find(|kind| *kind as u8 == tag)
            .ok_or(tag)
    }
}

impl fmt::Display for BinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
