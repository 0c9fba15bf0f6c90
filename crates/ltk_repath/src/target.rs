//! Resolution targets and path spelling helpers.

use std::path::PathBuf;

use ltk_bin::NodePath;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetState {
    Pending,
    /// Resolved to the given path string, which every reference now holds.
    Resolved(String),
    /// Terminal: no source or fallback matched.
    Unresolved,
}

/// Where an extracted payload is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    pub root: PathBuf,
    /// Archive-relative output path, forward slashes.
    pub file: String,
}

/// A dangling path reference awaiting a fix.
#[derive(Debug, Clone)]
pub struct ResolutionTarget {
    pub original_path: String,
    /// Hash-equivalent spellings to try, highest priority first.
    pub candidates: Vec<String>,
    /// Every string node in the tree that holds this reference.
    pub references: Vec<NodePath>,
    pub output: Option<OutputLocation>,
    pub state: TargetState,
}

impl ResolutionTarget {
    pub fn new(original_path: impl Into<String>) -> Self {
        let original_path = original_path.into();
        Self {
            candidates: candidate_spellings(&original_path),
            original_path,
            references: Vec::new(),
            output: None,
            state: TargetState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == TargetState::Pending
    }

    pub fn candidate_hashes(&self) -> Vec<u64> {
        self.candidates
            .iter()
            .map(|c| ltk_bin::xxh64_path(c))
            .collect()
    }

    pub fn resolved_path(&self) -> Option<&str> {
        match &self.state {
            TargetState::Resolved(path) => Some(path),
            _ => None,
        }
    }
}

/// Lower-case extension after the last dot of the file name, without the dot.
pub fn extension(path: &str) -> Option<String> {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let (_, ext) = name.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}

pub fn with_extension(path: &str, ext: &str) -> String {
    let name_start = path.rfind(['/', '\\']).map_or(0, |i| i + 1);
    let stem_end = path[name_start..]
        .rfind('.')
        .map_or(path.len(), |i| name_start + i);
    format!("{}.{}", &path[..stem_end], ext)
}

/// Texture references may point at either the `.dds` or the `.tex` file.
pub fn texture_twin(path: &str) -> Option<String> {
    match extension(path)?.as_str() {
        "dds" => Some(with_extension(path, "tex")),
        "tex" => Some(with_extension(path, "dds")),
        _ => None,
    }
}

/// The original spelling followed by its hash-equivalent alternates.
pub fn candidate_spellings(path: &str) -> Vec<String> {
    let mut out = vec![path.to_string()];
    if let Some(twin) = texture_twin(path) {
        out.push(twin);
    }
    if extension(path).as_deref() == Some("sco") {
        out.push(with_extension(path, "scb"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension() {
        assert_eq!(extension("ASSETS/a.b/Skin.DDS").as_deref(), Some("dds"));
        assert_eq!(extension("ASSETS/a.b/noext"), None);
        assert_eq!(extension("trailing."), None);
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(with_extension("a/b.c/d.dds", "tex"), "a/b.c/d.tex");
        assert_eq!(with_extension("a/b.c/d", "tex"), "a/b.c/d.tex");
    }

    #[test]
    fn test_candidate_spellings() {
        assert_eq!(
            candidate_spellings("ASSETS/Skin.dds"),
            vec!["ASSETS/Skin.dds", "ASSETS/Skin.tex"]
        );
        assert_eq!(
            candidate_spellings("ASSETS/Mesh.sco"),
            vec!["ASSETS/Mesh.sco", "ASSETS/Mesh.scb"]
        );
        assert_eq!(candidate_spellings("DATA/a.bin"), vec!["DATA/a.bin"]);
    }
}
