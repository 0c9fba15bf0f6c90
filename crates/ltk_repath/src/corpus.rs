//! Known-path corpus used as a fallback when exact lookups miss.
//!
//! A corpus is loaded from hash listings (`<hash> <path>` per line) and can be
//! augmented with paths seen during the current run, such as the mod's own
//! files.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};

use camino::Utf8Path;
use walkdir::WalkDir;

use crate::error::{RepathError, Result};
use crate::target::{extension, ResolutionTarget};

/// Default share of the data-relative path used as a prefix key.
pub const DEFAULT_PREFIX_PERCENT: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CorpusSearch {
    /// File name up to its first dot.
    BaseName,
    /// The first `percent` of the path after `data/`.
    PathPrefix { percent: f64 },
}

#[derive(Debug, Clone)]
struct CorpusPath {
    path: String,
    lower: String,
    extension: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PathCorpus {
    paths: Vec<CorpusPath>,
    seen: HashSet<String>,
}

impl PathCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let mut corpus = Self::new();
        corpus.add_from_file(path)?;
        Ok(corpus)
    }

    /// Loads every listing file below `dir`. A missing directory is empty.
    pub fn add_from_dir(&mut self, dir: impl AsRef<Utf8Path>) -> Result<usize> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(0);
        }

        let mut added = 0;
        for entry in WalkDir::new(dir.as_std_path())
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            added += self.add_from_reader(BufReader::new(File::open(entry.path())?))?;
        }
        Ok(added)
    }

    pub fn add_from_file(&mut self, path: impl AsRef<Utf8Path>) -> Result<usize> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => RepathError::ListingNotFound(path.to_owned()),
            _ => RepathError::Io(err),
        })?;
        let added = self.add_from_reader(BufReader::new(file))?;
        tracing::debug!("Loaded path listing path={} paths={}", path, added);
        Ok(added)
    }

    /// Reads `<hash> <path>` lines; the path is everything after the first
    /// space, trimmed. Lines without one are skipped.
    pub fn add_from_reader(&mut self, reader: impl BufRead) -> Result<usize> {
        let mut added = 0;
        for line in reader.lines() {
            let line = line?;
            let Some((_, path)) = line.split_once(' ') else {
                continue;
            };
            if self.push(path.trim()) {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Adds paths observed during the current run. Returns how many were new.
    pub fn merge<I, S>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        paths.into_iter().filter(|p| self.push(p.as_ref())).count()
    }

    fn push(&mut self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        let lower = path.to_lowercase();
        if !self.seen.insert(lower.clone()) {
            return false;
        }
        self.paths.push(CorpusPath {
            path: path.to_string(),
            extension: extension(&lower),
            lower,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(|p| p.path.as_str())
    }

    /// Corpus paths that plausibly stand in for `target`.
    ///
    /// Matching is a case-insensitive substring search on the search key,
    /// restricted to compatible extensions. Prefix results are ordered longest
    /// first; base-name results keep corpus order.
    pub fn suggest(&self, target: &str, search: CorpusSearch) -> Vec<String> {
        let key = match search {
            CorpusSearch::BaseName => base_name(target),
            CorpusSearch::PathPrefix { percent } => data_relative_prefix(target, percent),
        };
        if key.is_empty() {
            return Vec::new();
        }
        let target_ext = extension(target);

        let mut matches: Vec<&CorpusPath> = self
            .paths
            .iter()
            .filter(|p| p.lower.contains(&key))
            .filter(|p| extension_compatible(target_ext.as_deref(), p.extension.as_deref()))
            .collect();
        if matches!(search, CorpusSearch::PathPrefix { .. }) {
            matches.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        }
        matches.into_iter().map(|p| p.path.clone()).collect()
    }

    /// Replaces the candidates of every pending target with corpus
    /// suggestions. Returns how many targets received at least one.
    pub fn apply_suggestions(&self, targets: &mut [ResolutionTarget], search: CorpusSearch) -> usize {
        let mut suggested = 0;
        for target in targets.iter_mut().filter(|t| t.is_pending()) {
            target.candidates = self.suggest(&target.original_path, search);
            if !target.candidates.is_empty() {
                suggested += 1;
            }
        }
        tracing::debug!("Applied corpus suggestions search={:?} targets={}", search, suggested);
        suggested
    }
}

/// Lower-case file name up to its first dot.
pub fn base_name(path: &str) -> String {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    name.split('.').next().unwrap_or(name).to_lowercase()
}

/// Lower-case path after the first `data/`, cut to `percent` of its length.
/// Halfway lengths round to the even count.
pub fn data_relative_prefix(path: &str, percent: f64) -> String {
    let lower = path.replace('\\', "/").to_lowercase();
    let relative = match lower.find("data/") {
        Some(i) => &lower[i + "data/".len()..],
        None => lower.as_str(),
    };
    let chars = relative.chars().count();
    let keep = (chars as f64 * percent.clamp(0.0, 100.0) / 100.0).round_ties_even() as usize;
    relative.chars().take(keep.min(chars)).collect()
}

/// Equal extensions match, as do the interchangeable pairs
/// `sco -> scb`, `dds -> tex` and `tex -> dds`.
pub fn extension_compatible(target: Option<&str>, candidate: Option<&str>) -> bool {
    match (target, candidate) {
        (Some(t), Some(c)) => t == c || matches!((t, c), ("sco", "scb") | ("dds", "tex") | ("tex", "dds")),
        (None, None) => true,
        _ => false,
    }
}
