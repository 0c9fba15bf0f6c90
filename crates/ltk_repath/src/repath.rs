//! Output path rules for extracted assets.
//!
//! Every extracted file is moved under a mod-specific prefix so it cannot
//! collide with the game's own files, and references are rewritten to the
//! new location.

use std::collections::HashSet;
use std::path::Path;

use crate::target::{extension, OutputLocation, ResolutionTarget};

/// Top-level asset categories recognized directly below the root folder.
pub const CATEGORIES: &[&str] = &[
    "characters",
    "items",
    "loadouts",
    "maps",
    "particles",
    "perks",
    "rewards",
    "shared",
    "sounds",
    "spells",
    "ux",
];

const ROOTS: &[&str] = &["assets", "data"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepathRules {
    /// Prefix inserted after the root folder, e.g. `mymod_`.
    pub prefix: String,
    /// Glue the prefix onto the first folder instead of adding a new folder.
    pub in_file_path: bool,
    /// Normalize the root and category folders before repathing.
    pub clean_root: bool,
}

impl Default for RepathRules {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            in_file_path: true,
            clean_root: true,
        }
    }
}

fn split_parts(path: &str) -> Vec<String> {
    path.split(['/', '\\'])
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_root(path: &str) -> &'static str {
    match extension(path).as_deref() {
        None | Some("bin") => "DATA",
        Some(_) => "ASSETS",
    }
}

fn join_non_empty<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    itertools::join(parts.into_iter().filter(|p| !p.is_empty()), "/")
}

/// Matches `part` against `names`: an exact match keeps it, a containing
/// match normalizes it to the known name.
fn match_known(part: &str, names: &[&'static str]) -> Option<&'static str> {
    let lower = part.to_lowercase();
    names
        .iter()
        .find(|name| lower == **name)
        .or_else(|| names.iter().find(|name| lower.contains(**name)))
        .copied()
}

/// Drops everything before the `assets`/`data` folder and normalizes the
/// category folder.
pub fn clean_root_path(path: &str) -> String {
    let mut parts = split_parts(path);

    match parts.iter().position(|p| match_known(p, ROOTS).is_some()) {
        Some(index) => {
            parts.drain(..index);
            if let Some(root) = match_known(&parts[0], ROOTS) {
                if !parts[0].eq_ignore_ascii_case(root) {
                    parts[0] = root.to_string();
                }
            }
        }
        None => parts.insert(0, default_root(path).to_string()),
    }

    if parts.len() > 2 {
        if let Some(category) = match_known(&parts[1], CATEGORIES) {
            if !parts[1].eq_ignore_ascii_case(category) {
                parts[1] = category.to_string();
            }
            return parts.join("/");
        }
    }
    if parts.len() > 3 {
        if let Some(category) = match_known(&parts[2], CATEGORIES) {
            parts[2] = category.to_string();
            parts.remove(1);
        }
    }
    parts.join("/")
}

/// Applies [`RepathRules`] and keeps the produced paths unique.
#[derive(Debug, Clone, Default)]
pub struct PathFixer {
    rules: RepathRules,
    seen: HashSet<String>,
}

impl PathFixer {
    pub fn new(rules: RepathRules) -> Self {
        Self {
            rules,
            seen: HashSet::new(),
        }
    }

    pub fn rules(&self) -> &RepathRules {
        &self.rules
    }

    /// Repaths without reserving the result.
    pub fn fix_local(&self, path: &str) -> String {
        let path = if self.rules.clean_root {
            clean_root_path(path)
        } else {
            path.replace('\\', "/")
        };
        let parts = split_parts(&path);
        let prefix = self.rules.prefix.as_str();

        let Some(first) = parts.first() else {
            return path;
        };

        let root = match first.to_lowercase().as_str() {
            "data" => Some("DATA"),
            "assets" => Some("ASSETS"),
            _ => None,
        };
        if let Some(root) = root {
            let rest = parts.iter().skip(2).map(String::as_str);
            return if self.rules.in_file_path {
                let folder = format!("{prefix}{}", parts.get(1).map_or("", String::as_str));
                join_non_empty([root, folder.as_str()].into_iter().chain(rest))
            } else {
                join_non_empty(
                    [root, prefix]
                        .into_iter()
                        .chain(parts.iter().skip(1).map(String::as_str)),
                )
            };
        }

        if parts.len() == 1 {
            return join_non_empty(["ASSETS", prefix, first.as_str()]);
        }

        let root = default_root(&path);
        if self.rules.in_file_path {
            let folder = format!("{prefix}{first}");
            join_non_empty(
                [root, folder.as_str()]
                    .into_iter()
                    .chain(parts.iter().skip(1).map(String::as_str)),
            )
        } else {
            join_non_empty([root, prefix].into_iter().chain(parts.iter().map(String::as_str)))
        }
    }

    /// Repaths and reserves the result, appending `_N` to the file stem when
    /// an earlier call already produced the same path.
    pub fn fix(&mut self, path: &str) -> String {
        let fixed = self.fix_local(path);
        if self.seen.insert(fixed.to_lowercase()) {
            return fixed;
        }

        let (dir, name) = match fixed.rsplit_once('/') {
            Some((dir, name)) => (Some(dir), name),
            None => (None, fixed.as_str()),
        };
        let (stem, ext) = match name.rfind('.') {
            Some(dot) if dot > 0 => name.split_at(dot),
            _ => (name, ""),
        };

        let mut i = 1;
        loop {
            let candidate = match dir {
                Some(dir) => format!("{dir}/{stem}_{i}{ext}"),
                None => format!("{stem}_{i}{ext}"),
            };
            if self.seen.insert(candidate.to_lowercase()) {
                return candidate;
            }
            i += 1;
        }
    }

    /// Gives every target without an output location one under `root`.
    pub fn assign_outputs(&mut self, targets: &mut [ResolutionTarget], root: &Path) {
        for target in targets.iter_mut().filter(|t| t.output.is_none()) {
            let file = self.fix(&target.original_path);
            tracing::trace!("Assigned output from={} to={}", target.original_path, file);
            target.output = Some(OutputLocation {
                root: root.to_path_buf(),
                file,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixer(prefix: &str, in_file_path: bool) -> PathFixer {
        PathFixer::new(RepathRules {
            prefix: prefix.to_string(),
            in_file_path,
            clean_root: true,
        })
    }

    #[test]
    fn test_clean_root_drops_leading_folders() {
        assert_eq!(
            clean_root_path("C:/mods/x/ASSETS/Characters/Ahri/skin.dds"),
            "ASSETS/Characters/Ahri/skin.dds"
        );
        assert_eq!(clean_root_path("Characters/Ahri/a.bin"), "DATA/Characters/Ahri/a.bin");
        assert_eq!(clean_root_path("Characters/Ahri/a.dds"), "ASSETS/Characters/Ahri/a.dds");
    }

    #[test]
    fn test_clean_root_normalizes_category() {
        assert_eq!(
            clean_root_path("assets/mycharacters/ahri/a.dds"),
            "assets/characters/ahri/a.dds"
        );
        assert_eq!(
            clean_root_path("assets/extra/particles/fx/a.dds"),
            "assets/particles/fx/a.dds"
        );
    }

    #[test]
    fn test_fix_in_file_path() {
        let fixer = fixer("mod_", true);
        assert_eq!(
            fixer.fix_local("ASSETS/Characters/Ahri/skin.dds"),
            "ASSETS/mod_Characters/Ahri/skin.dds"
        );
        assert_eq!(fixer.fix_local("data/characters/a.bin"), "DATA/mod_characters/a.bin");
    }

    #[test]
    fn test_fix_as_folder() {
        let fixer = fixer("mod", false);
        assert_eq!(
            fixer.fix_local("ASSETS/Characters/Ahri/skin.dds"),
            "ASSETS/mod/Characters/Ahri/skin.dds"
        );
    }

    #[test]
    fn test_fix_file_only() {
        let fixer = PathFixer::new(RepathRules {
            prefix: "mod".to_string(),
            in_file_path: true,
            clean_root: false,
        });
        assert_eq!(fixer.fix_local("skin.dds"), "ASSETS/mod/skin.dds");
        assert_eq!(fixer.fix_local("fx/a.bin"), "DATA/modfx/a.bin");
    }

    #[test]
    fn test_fix_unique_suffix() {
        let mut fixer = fixer("mod_", true);
        assert_eq!(fixer.fix("ASSETS/Shared/a.dds"), "ASSETS/mod_Shared/a.dds");
        assert_eq!(fixer.fix("x/ASSETS/shared/A.dds"), "ASSETS/mod_shared/A_1.dds");
        assert_eq!(fixer.fix("ASSETS/Shared/a.dds"), "ASSETS/mod_Shared/a_2.dds");
    }

    #[test]
    fn test_assign_outputs_skips_assigned() {
        let mut targets = vec![
            ResolutionTarget::new("ASSETS/Shared/a.dds"),
            ResolutionTarget::new("ASSETS/Shared/b.dds"),
        ];
        targets[1].output = Some(OutputLocation {
            root: "keep".into(),
            file: "keep.dds".into(),
        });
        let mut fixer = fixer("mod_", true);
        fixer.assign_outputs(&mut targets, Path::new("out"));
        assert_eq!(targets[0].output.as_ref().unwrap().file, "ASSETS/mod_Shared/a.dds");
        assert_eq!(targets[1].output.as_ref().unwrap().file, "keep.dds");
    }
}
