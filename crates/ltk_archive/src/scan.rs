//! Batched lookup of path hashes across an ordered list of archives.
//!
//! Every source is scanned once per batch. For each pending target the scan
//! keeps the best entry of that source (lowest candidate index), then the
//! winners are read in data-offset order and matched targets leave the table
//! before the next source is opened. A target found in an earlier source is
//! never reconsidered by a later one.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::archive::Archive;
use crate::toc::{TocEntry, HEADER_SIZE};

/// Which target a hash belongs to, and at which priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSlot {
    pub target: usize,
    pub candidate: usize,
}

/// Hash to `(target, candidate index)` lookup over every pending target.
///
/// When two targets share a hash, the one inserted first owns it.
#[derive(Debug, Default, Clone)]
pub struct MatchTable {
    slots: HashMap<u64, MatchSlot>,
    by_target: HashMap<usize, Vec<u64>>,
}

impl MatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from each target's candidate hashes, in priority order.
    pub fn from_candidates<I, C>(targets: I) -> Self
    where
        I: IntoIterator<Item = (usize, C)>,
        C: IntoIterator<Item = u64>,
    {
        let mut table = Self::new();
        for (target, hashes) in targets {
            for (candidate, hash) in hashes.into_iter().enumerate() {
                table.insert(hash, target, candidate);
            }
        }
        table
    }

    /// Returns `false` if the hash already belongs to another slot.
    pub fn insert(&mut self, path_hash: u64, target: usize, candidate: usize) -> bool {
        match self.slots.entry(path_hash) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(MatchSlot { target, candidate });
                self.by_target.entry(target).or_default().push(path_hash);
                true
            }
        }
    }

    pub fn get(&self, path_hash: u64) -> Option<MatchSlot> {
        self.slots.get(&path_hash).copied()
    }

    /// Drops every hash owned by `target`.
    pub fn remove_target(&mut self, target: usize) {
        if let Some(hashes) = self.by_target.remove(&target) {
            for hash in hashes {
                self.slots.remove(&hash);
            }
        }
    }

    pub fn contains_target(&self, target: usize) -> bool {
        self.by_target.contains_key(&target)
    }

    pub fn pending_targets(&self) -> impl Iterator<Item = usize> + '_ {
        self.by_target.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Report matches without reading payloads.
    Locate,
    /// Read and decompress every winning entry.
    Extract,
}

/// A winning entry handed to the scan callback.
#[derive(Debug)]
pub struct ScanMatch {
    pub target: usize,
    pub candidate: usize,
    pub source: usize,
    pub entry: TocEntry,
    /// Decompressed payload, present in [`ScanMode::Extract`].
    pub data: Option<Vec<u8>>,
}

/// A source or entry that had to be skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOmission {
    pub source: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub matched: usize,
    pub sources_scanned: usize,
    pub omissions: Vec<SourceOmission>,
}

/// Runs the scan-then-extract loop over `sources` in order.
///
/// `on_match` returns whether it accepted the match. Accepted targets leave the
/// table; rejected ones stay pending for later sources. The loop stops early
/// once the table is empty.
pub fn scan_sources<P, F>(
    sources: &[P],
    table: &mut MatchTable,
    mode: ScanMode,
    mut on_match: F,
) -> ScanReport
where
    P: AsRef<Path>,
    F: FnMut(ScanMatch) -> bool,
{
    let mut report = ScanReport::default();

    for (source_index, source) in sources.iter().enumerate() {
        if table.is_empty() {
            break;
        }
        let source = source.as_ref();
        let omit = |reason: String| SourceOmission {
            source: source.to_path_buf(),
            reason,
        };

        match std::fs::metadata(source) {
            Ok(meta) if meta.is_file() && meta.len() >= HEADER_SIZE => {}
            Ok(_) => {
                tracing::debug!("Skipping source that is not an archive path={}", source.display());
                report.omissions.push(omit("not an archive file".to_string()));
                continue;
            }
            Err(err) => {
                tracing::warn!("Skipping missing source path={} error={}", source.display(), err);
                report.omissions.push(omit(err.to_string()));
                continue;
            }
        }

        let mut archive = match Archive::open(source) {
            Ok(archive) => archive,
            Err(err) => {
                tracing::warn!("Skipping unreadable source path={} error={}", source.display(), err);
                report.omissions.push(omit(err.to_string()));
                continue;
            }
        };
        report.sources_scanned += 1;

        let mut best: HashMap<usize, (usize, TocEntry)> = HashMap::new();
        for entry in archive.entries() {
            let Some(slot) = table.get(entry.path_hash) else {
                continue;
            };
            match best.entry(slot.target) {
                Entry::Vacant(v) => {
                    v.insert((slot.candidate, *entry));
                }
                Entry::Occupied(mut o) => {
                    if slot.candidate < o.get().0 {
                        o.insert((slot.candidate, *entry));
                    }
                }
            }
        }

        let mut winners: Vec<(usize, usize, TocEntry)> = best
            .into_iter()
            .map(|(target, (candidate, entry))| (target, candidate, entry))
            .collect();
        winners.sort_by_key(|(target, _, entry)| (entry.data_offset, entry.path_hash, *target));

        tracing::debug!(
            "Scanned source path={} entries={} winners={}",
            source.display(),
            archive.entries().len(),
            winners.len()
        );

        for (target, candidate, entry) in winners {
            let data = match mode {
                ScanMode::Locate => None,
                ScanMode::Extract => match archive.read_decompressed(&entry) {
                    Ok(data) => Some(data),
                    Err(err) => {
                        tracing::warn!(
                            "Skipping unreadable entry path={} path_hash={:016x} error={}",
                            source.display(),
                            entry.path_hash,
                            err
                        );
                        report.omissions.push(omit(format!(
                            "entry {:016x}: {}",
                            entry.path_hash, err
                        )));
                        continue;
                    }
                },
            };

            let accepted = on_match(ScanMatch {
                target,
                candidate,
                source: source_index,
                entry,
                data,
            });
            if accepted {
                table.remove_target(target);
                report.matched += 1;
            }
        }
    }

    report
}

/// Extracts each path from the first source that contains it.
pub fn extract<P: AsRef<Path>>(paths: &[&str], sources: &[P]) -> Vec<Option<Vec<u8>>> {
    let mut table = MatchTable::from_candidates(
        paths
            .iter()
            .enumerate()
            .map(|(i, path)| (i, [ltk_bin::xxh64_path(path)])),
    );
    let mut out = vec![None; paths.len()];
    scan_sources(sources, &mut table, ScanMode::Extract, |m| {
        out[m.target] = m.data;
        true
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::{pack_directory, PackOptions};
    use ltk_bin::xxh64_path;
    use std::fs;

    fn write_archive(dir: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let src = tempfile::tempdir().unwrap();
        for (path, data) in files {
            let full = src.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, data).unwrap();
        }
        let out = dir.join(name);
        fs::write(&out, pack_directory(src.path(), &PackOptions::default()).unwrap()).unwrap();
        out
    }

    #[test]
    fn test_first_inserted_target_owns_shared_hash() {
        let mut table = MatchTable::new();
        assert!(table.insert(10, 0, 0));
        assert!(!table.insert(10, 1, 0));
        assert!(table.insert(11, 1, 1));
        assert_eq!(table.get(10), Some(MatchSlot { target: 0, candidate: 0 }));

        table.remove_target(0);
        assert_eq!(table.get(10), None);
        assert!(table.contains_target(1));
        table.remove_target(1);
        assert!(table.is_empty());
    }

    #[test]
    fn test_earlier_source_wins_over_candidate_priority() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_archive(dir.path(), "first.wad.client", &[("assets/b.dds", b"from first")]);
        let second = write_archive(
            dir.path(),
            "second.wad.client",
            &[("assets/a.tex", b"a in second"), ("assets/b.dds", b"b in second")],
        );

        let mut table = MatchTable::from_candidates([(
            0usize,
            vec![xxh64_path("assets/a.tex"), xxh64_path("assets/b.dds")],
        )]);
        let mut found = Vec::new();
        let report = scan_sources(&[first, second], &mut table, ScanMode::Extract, |m| {
            found.push((m.source, m.candidate, m.data));
            true
        });

        assert_eq!(found, vec![(0, 1, Some(b"from first".to_vec()))]);
        assert_eq!(report.matched, 1);
        // second source never opened once nothing is pending
        assert_eq!(report.sources_scanned, 1);
        assert!(table.is_empty());
    }

    #[test]
    fn test_best_candidate_within_one_source() {
        let dir = tempfile::tempdir().unwrap();
        let only = write_archive(
            dir.path(),
            "only.wad.client",
            &[("assets/a.tex", b"a"), ("assets/b.dds", b"b")],
        );
        let mut table = MatchTable::from_candidates([(
            0usize,
            vec![xxh64_path("assets/a.tex"), xxh64_path("assets/b.dds")],
        )]);
        let mut candidates = Vec::new();
        scan_sources(&[only], &mut table, ScanMode::Locate, |m| {
            assert!(m.data.is_none());
            candidates.push(m.candidate);
            true
        });
        assert_eq!(candidates, vec![0]);
    }

    #[test]
    fn test_missing_and_foreign_sources_are_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let foreign = dir.path().join("foreign.bin");
        fs::write(&foreign, vec![0u8; 400]).unwrap();
        let small = dir.path().join("small.bin");
        fs::write(&small, b"RW").unwrap();
        let good = write_archive(dir.path(), "good.wad.client", &[("assets/x.bin", b"x")]);

        let sources = vec![dir.path().join("missing.wad.client"), foreign, small, good];
        let results = extract(&["assets/x.bin", "assets/y.bin"], &sources);
        assert_eq!(results, vec![Some(b"x".to_vec()), None]);
    }

    #[test]
    fn test_rejected_match_stays_pending() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_archive(dir.path(), "1.wad.client", &[("assets/x.bin", b"one")]);
        let second = write_archive(dir.path(), "2.wad.client", &[("assets/x.bin", b"two")]);

        let mut table = MatchTable::from_candidates([(0usize, [xxh64_path("assets/x.bin")])]);
        let mut seen = Vec::new();
        let report = scan_sources(&[first, second], &mut table, ScanMode::Extract, |m| {
            seen.push(m.source);
            m.source == 1
        });
        assert_eq!(seen, vec![0, 1]);
        assert_eq!(report.matched, 1);
    }
}
