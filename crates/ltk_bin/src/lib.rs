//! Property bin (`PROP` / `PTCH`) codec.
//!
//! Property bins are recursive, self-describing trees of tagged values. This
//! crate decodes them from bytes ([`from_bytes`]) or from a JSON document
//! ([`text::from_json_str`]) into a [`PropertyTree`], and encodes a tree back
//! into bytes ([`to_bytes`]) with the exact framing the game expects.
//!
//! ```no_run
//! # fn main() -> ltk_bin::Result<()> {
//! let bytes = std::fs::read("skin0.bin")?;
//! let tree = ltk_bin::from_bytes(&bytes)?;
//! assert_eq!(ltk_bin::to_bytes(&tree)?, bytes);
//! # Ok(())
//! # }
//! ```
//!
//! No file I/O happens inside the codec: callers hand in bytes or text and get
//! a tree back.

pub mod error;
pub mod hash;
pub mod kind;
pub mod path;
pub mod reader;
pub mod text;
pub mod tree;
pub mod value;
pub mod writer;

pub use error::{BinError, Result};
pub use hash::{fnv1a_lower, normalize_path, xxh64_path, NameHash, PathHash};
pub use kind::BinKind;
pub use path::{NodePath, PathStep};
pub use reader::from_bytes;
pub use tree::PropertyTree;
pub use value::{BinField, BinList, BinMap, BinObject, BinOption, BinValue};
pub use writer::to_bytes;
