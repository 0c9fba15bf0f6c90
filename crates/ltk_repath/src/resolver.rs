//! Exact lookup of targets across an ordered list of archives.

use std::path::{Path, PathBuf};

use ltk_archive::{scan_sources, MatchTable, ScanMatch, ScanMode, SourceOmission};
use ltk_bin::{BinValue, PropertyTree};

use crate::target::{extension, with_extension, ResolutionTarget, TargetState};

/// What a pass does with a matched entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// Rewrite references to the spelling that was found.
    #[default]
    Locate,
    /// Write the payload under the target's output location and rewrite
    /// references to the output path.
    Extract,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub original: String,
    pub path: String,
    pub source: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ResolveReport {
    pub resolved: Vec<ResolvedTarget>,
    pub unresolved: Vec<String>,
    pub omissions: Vec<SourceOmission>,
}

impl ResolveReport {
    pub fn merge(&mut self, other: ResolveReport) {
        self.resolved.extend(other.resolved);
        self.unresolved.extend(other.unresolved);
        self.omissions.extend(other.omissions);
    }
}

/// Runs one lookup pass over `sources` for every pending target with
/// candidates. Targets that stay pending are left as they are; see
/// [`resolve`] for a pass that finalizes them.
pub fn resolve_pass<P: AsRef<Path>>(
    tree: &mut PropertyTree,
    targets: &mut [ResolutionTarget],
    sources: &[P],
    mode: ResolveMode,
) -> ResolveReport {
    let mut table = MatchTable::from_candidates(
        targets
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_pending() && !t.candidates.is_empty())
            .map(|(i, t)| (i, t.candidate_hashes())),
    );
    let mut report = ResolveReport::default();
    if table.is_empty() {
        return report;
    }

    let scan_mode = match mode {
        ResolveMode::Locate => ScanMode::Locate,
        ResolveMode::Extract => ScanMode::Extract,
    };

    let scan = scan_sources(sources, &mut table, scan_mode, |found: ScanMatch| {
        let target = &mut targets[found.target];
        let source = sources[found.source].as_ref();
        let Some(candidate) = target.candidates.get(found.candidate).cloned() else {
            return false;
        };

        if !references_writable(tree, target) {
            return false;
        }

        let (path, written) = match mode {
            ResolveMode::Locate => (candidate, None),
            ResolveMode::Extract => {
                match write_output(target, &candidate, found.data.as_deref().unwrap_or_default()) {
                    Ok(output) => output,
                    Err(err) => {
                        tracing::warn!(
                            "Failed to write extracted file target={} error={}",
                            target.original_path,
                            err
                        );
                        return false;
                    }
                }
            }
        };

        if !rewrite_references(tree, target, &path) {
            if let Some(written) = written {
                if let Err(err) = std::fs::remove_file(&written) {
                    tracing::warn!(
                        "Failed to remove extracted file path={} error={}",
                        written.display(),
                        err
                    );
                }
            }
            return false;
        }
        tracing::debug!(
            "Resolved reference from={} to={} source={}",
            target.original_path,
            path,
            source.display()
        );
        report.resolved.push(ResolvedTarget {
            original: target.original_path.clone(),
            path: path.clone(),
            source: source.to_path_buf(),
        });
        target.state = TargetState::Resolved(path);
        true
    });

    report.omissions = scan.omissions;
    report
}

/// One lookup pass; targets it leaves pending become unresolved.
pub fn resolve<P: AsRef<Path>>(
    tree: &mut PropertyTree,
    targets: &mut [ResolutionTarget],
    sources: &[P],
    mode: ResolveMode,
) -> ResolveReport {
    let mut report = resolve_pass(tree, targets, sources, mode);
    report.unresolved = finalize(targets);
    report
}

/// Marks every still-pending target as unresolved and returns their paths.
pub fn finalize(targets: &mut [ResolutionTarget]) -> Vec<String> {
    targets
        .iter_mut()
        .filter(|t| t.is_pending())
        .map(|t| {
            t.state = TargetState::Unresolved;
            t.original_path.clone()
        })
        .collect()
}

/// Output path for `target` with the extension of the spelling that was found.
fn output_file(target: &ResolutionTarget, candidate: &str) -> Option<String> {
    let output = target.output.as_ref()?;
    Some(match extension(candidate) {
        Some(ext) => with_extension(&output.file, &ext),
        None => output.file.clone(),
    })
}

/// Writes the payload and returns the new reference path with the file written.
fn write_output(
    target: &ResolutionTarget,
    candidate: &str,
    data: &[u8],
) -> std::io::Result<(String, Option<PathBuf>)> {
    let (Some(output), Some(file)) = (target.output.as_ref(), output_file(target, candidate)) else {
        // Without an output location the file is only located.
        return Ok((candidate.to_string(), None));
    };

    let destination = output.root.join(&file);
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&destination, data)?;
    tracing::trace!("Wrote extracted file path={} size={}", destination.display(), data.len());
    Ok((file, Some(destination)))
}

/// Every reference must still be a string node before anything is written.
fn references_writable(tree: &PropertyTree, target: &ResolutionTarget) -> bool {
    match target
        .references
        .iter()
        .find(|reference| !matches!(tree.get(reference), Some(BinValue::String(_))))
    {
        Some(reference) => {
            tracing::warn!(
                "Reference is no longer a string target={} at={}",
                target.original_path,
                reference
            );
            false
        }
        None => true,
    }
}

fn rewrite_references(tree: &mut PropertyTree, target: &ResolutionTarget, path: &str) -> bool {
    for reference in &target.references {
        if let Err(err) = tree.replace(reference, BinValue::String(path.to_string())) {
            tracing::warn!(
                "Failed to rewrite reference target={} at={} error={}",
                target.original_path,
                reference,
                err
            );
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::collect_targets;
    use crate::target::OutputLocation;
    use ltk_archive::{ArchiveWriter, PackOptions};
    use ltk_bin::{BinField, BinObject, NameHash, PathStep};

    fn tree(paths: &[&str]) -> PropertyTree {
        PropertyTree::new(
            3,
            Vec::new(),
            [(
                NameHash::new(1),
                BinObject::new(
                    "Skin",
                    paths
                        .iter()
                        .enumerate()
                        .map(|(i, p)| BinField::new(format!("f{i}").as_str(), BinValue::String(p.to_string())))
                        .collect(),
                ),
            )],
        )
    }

    fn write_archive(path: &Path, files: &[(&str, &[u8])]) {
        let mut writer = ArchiveWriter::new();
        for (name, data) in files {
            writer
                .add(name, data.to_vec(), &PackOptions::default())
                .unwrap();
        }
        writer.write_to_file(path).unwrap();
    }

    fn field(tree: &PropertyTree, name: &str) -> String {
        tree.entry(NameHash::new(1))
            .and_then(|e| e.field(name))
            .and_then(|v| v.as_str())
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_locate_prefers_earlier_source_and_alternate_spelling() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.wad.client");
        let second = dir.path().join("second.wad.client");
        write_archive(&first, &[("assets/skin.tex", b"first")]);
        write_archive(&second, &[("assets/skin.dds", b"second")]);

        let mut tree = tree(&["ASSETS/Skin.dds", "ASSETS/Missing.dds"]);
        let mut targets = collect_targets(&tree);
        let report = resolve(&mut tree, &mut targets, &[&first, &second], ResolveMode::Locate);

        assert_eq!(report.resolved.len(), 1);
        assert_eq!(report.resolved[0].source, first);
        assert_eq!(field(&tree, "f0"), "ASSETS/Skin.tex");
        assert_eq!(report.unresolved, vec!["ASSETS/Missing.dds"]);
        assert_eq!(targets[1].state, TargetState::Unresolved);
    }

    #[test]
    fn test_extract_writes_output_with_found_extension() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("game.wad.client");
        write_archive(&source, &[("assets/skin.tex", b"payload")]);
        let out = dir.path().join("out");

        let mut tree = tree(&["ASSETS/Skin.dds"]);
        let mut targets = collect_targets(&tree);
        targets[0].output = Some(OutputLocation {
            root: out.clone(),
            file: "ASSETS/mod_Skin.dds".to_string(),
        });

        let report = resolve(&mut tree, &mut targets, &[&source], ResolveMode::Extract);
        assert!(report.unresolved.is_empty());
        assert_eq!(std::fs::read(out.join("ASSETS/mod_Skin.tex")).unwrap(), b"payload");
        assert_eq!(field(&tree, "f0"), "ASSETS/mod_Skin.tex");
        assert_eq!(targets[0].resolved_path(), Some("ASSETS/mod_Skin.tex"));
    }

    #[test]
    fn test_missing_source_is_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = tree(&["ASSETS/Skin.dds"]);
        let mut targets = collect_targets(&tree);
        let report = resolve(
            &mut tree,
            &mut targets,
            &[dir.path().join("nope.wad.client")],
            ResolveMode::Locate,
        );
        assert_eq!(report.omissions.len(), 1);
        assert_eq!(report.unresolved.len(), 1);
    }

    #[test]
    fn test_pass_skips_resolved_targets() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("game.wad.client");
        write_archive(&source, &[("assets/skin.dds", b"x")]);

        let mut tree = tree(&["ASSETS/Skin.dds"]);
        let mut targets = collect_targets(&tree);
        targets[0].state = TargetState::Resolved("kept".to_string());
        let report = resolve_pass(&mut tree, &mut targets, &[&source], ResolveMode::Locate);
        assert!(report.resolved.is_empty());
        assert_eq!(field(&tree, "f0"), "ASSETS/Skin.dds");
    }

    #[test]
    fn test_extract_leaves_nothing_behind_when_a_reference_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("game.wad.client");
        write_archive(&source, &[("assets/skin.dds", b"payload")]);
        let out = dir.path().join("out");

        let mut tree = tree(&["ASSETS/Skin.dds"]);
        let mut targets = collect_targets(&tree);
        let mut gone = targets[0].references[0].clone();
        gone.steps.push(PathStep::Field(9));
        targets[0].references.push(gone);
        targets[0].output = Some(OutputLocation {
            root: out.clone(),
            file: "ASSETS/mod_Skin.dds".to_string(),
        });

        let report = resolve(&mut tree, &mut targets, &[&source], ResolveMode::Extract);
        assert!(report.resolved.is_empty());
        assert_eq!(report.unresolved, vec!["ASSETS/Skin.dds"]);
        assert!(!out.join("ASSETS/mod_Skin.dds").exists());
        assert_eq!(field(&tree, "f0"), "ASSETS/Skin.dds");
    }
}
