//! Exact lookup followed by corpus fallbacks.

use std::path::Path;

use ltk_bin::PropertyTree;

use crate::collect::collect_targets;
use crate::corpus::{CorpusSearch, PathCorpus, DEFAULT_PREFIX_PERCENT};
use crate::repath::PathFixer;
use crate::resolver::{finalize, resolve_pass, ResolveMode, ResolveReport};
use crate::target::ResolutionTarget;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub mode: ResolveMode,
    /// Retry misses with corpus paths sharing the file's base name.
    pub base_name_fallback: bool,
    /// Retry misses with corpus paths sharing a prefix of the path.
    pub prefix_fallback: bool,
    pub prefix_percent: f64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            mode: ResolveMode::Locate,
            base_name_fallback: true,
            prefix_fallback: true,
            prefix_percent: DEFAULT_PREFIX_PERCENT,
        }
    }
}

/// Resolves every path reference in a tree against an ordered list of
/// archives.
///
/// Passes run in order: exact spellings, then corpus suggestions by base
/// name, then by path prefix. Each pass only sees targets the previous ones
/// left pending; whatever is still pending at the end is unresolved.
#[derive(Debug)]
pub struct ResolutionPipeline<'a> {
    corpus: Option<&'a PathCorpus>,
    fixer: Option<PathFixer>,
    options: PipelineOptions,
}

impl<'a> ResolutionPipeline<'a> {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            corpus: None,
            fixer: None,
            options,
        }
    }

    pub fn with_corpus(mut self, corpus: &'a PathCorpus) -> Self {
        self.corpus = Some(corpus);
        self
    }

    /// Assigns output locations to targets that have none before extracting.
    pub fn with_fixer(mut self, fixer: PathFixer) -> Self {
        self.fixer = Some(fixer);
        self
    }

    /// Collects targets from `tree` and resolves them.
    pub fn run<P: AsRef<Path>>(
        &mut self,
        tree: &mut PropertyTree,
        sources: &[P],
        output_root: &Path,
    ) -> (Vec<ResolutionTarget>, ResolveReport) {
        let mut targets = collect_targets(tree);
        let report = self.resolve(tree, &mut targets, sources, output_root);
        (targets, report)
    }

    pub fn resolve<P: AsRef<Path>>(
        &mut self,
        tree: &mut PropertyTree,
        targets: &mut [ResolutionTarget],
        sources: &[P],
        output_root: &Path,
    ) -> ResolveReport {
        let mode = self.options.mode;
        if mode == ResolveMode::Extract {
            if let Some(fixer) = self.fixer.as_mut() {
                fixer.assign_outputs(targets, output_root);
            }
        }

        let mut report = resolve_pass(tree, targets, sources, mode);
        tracing::info!(
            "Exact pass resolved={} pending={}",
            report.resolved.len(),
            pending(targets)
        );

        if let Some(corpus) = self.corpus {
            let mut searches = Vec::new();
            if self.options.base_name_fallback {
                searches.push(CorpusSearch::BaseName);
            }
            if self.options.prefix_fallback {
                searches.push(CorpusSearch::PathPrefix {
                    percent: self.options.prefix_percent,
                });
            }

            for search in searches {
                if pending(targets) == 0 {
                    break;
                }
                if corpus.apply_suggestions(targets, search) == 0 {
                    continue;
                }
                let pass = resolve_pass(tree, targets, sources, mode);
                tracing::info!(
                    "Corpus pass search={:?} resolved={} pending={}",
                    search,
                    pass.resolved.len(),
                    pending(targets)
                );
                report.merge(pass);
            }
        }

        report.unresolved = finalize(targets);
        for missing in &report.unresolved {
            tracing::warn!("Unresolved reference path={}", missing);
        }
        report
    }
}

fn pending(targets: &[ResolutionTarget]) -> usize {
    targets.iter().filter(|t| t.is_pending()).count()
}
