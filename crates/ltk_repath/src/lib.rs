//! Reference resolution for property bins.
//!
//! Mods reference game assets by path. When the game moves or renames those
//! assets the references dangle. This crate finds them and fixes them:
//!
//! 1. [`collect_targets`] groups every path-like string in a [`PropertyTree`]
//!    into [`ResolutionTarget`]s.
//! 2. [`ResolutionPipeline`] looks each target up across an ordered list of
//!    archives, first by exact spelling and then via corpus suggestions from
//!    a [`PathCorpus`]. Matches either rewrite the reference to the spelling
//!    found, or extract the file under a repathed location (see [`PathFixer`]).
//! 3. [`fix_shader_links`] swaps links to removed shader definitions for the
//!    closest existing sibling.
//!
//! [`PropertyTree`]: ltk_bin::PropertyTree

pub mod collect;
pub mod corpus;
pub mod error;
pub mod pipeline;
pub mod repath;
pub mod resolver;
pub mod shader;
pub mod staging;
pub mod target;

pub use collect::{collect_targets, is_path_reference};
pub use corpus::{CorpusSearch, PathCorpus, DEFAULT_PREFIX_PERCENT};
pub use error::{RepathError, Result};
pub use pipeline::{PipelineOptions, ResolutionPipeline};
pub use repath::{clean_root_path, PathFixer, RepathRules};
pub use resolver::{resolve, resolve_pass, ResolveMode, ResolveReport, ResolvedTarget};
pub use shader::{fix_shader_links, ShaderReport, ShaderResolution, ShaderTable};
pub use staging::Staging;
pub use target::{OutputLocation, ResolutionTarget, TargetState};
