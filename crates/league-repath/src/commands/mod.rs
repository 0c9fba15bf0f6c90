mod build;
mod dump;
mod extract;
mod fix;
mod pack;

pub use build::{build_property_bin, BuildArgs};
pub use dump::{dump_property_bin, DumpArgs};
pub use extract::{extract_paths, ExtractArgs};
pub use fix::{fix_property_bin, FixArgs};
pub use pack::{pack_archive, PackArgs};

use std::path::{Path, PathBuf};

use crate::errors::CliError;
use crate::utils::config::AppConfig;
use miette::Result;

/// Command-line sources, or the configured game archives when none are given.
pub(crate) fn lookup_sources(sources: &[String], config: &AppConfig) -> Result<Vec<PathBuf>> {
    let sources: Vec<PathBuf> = if sources.is_empty() {
        config
            .game_archives
            .iter()
            .map(|p| p.as_std_path().to_path_buf())
            .collect()
    } else {
        sources.iter().map(PathBuf::from).collect()
    };
    if sources.is_empty() {
        return Err(CliError::NoSources.into());
    }
    Ok(sources)
}

pub(crate) fn read_input(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(CliError::file_not_found(path).into());
    }
    Ok(std::fs::read(path).map_err(CliError::from)?)
}

pub(crate) fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(CliError::from)?;
    }
    std::fs::write(path, data).map_err(CliError::from)?;
    Ok(())
}
