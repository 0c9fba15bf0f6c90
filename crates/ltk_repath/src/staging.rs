//! Temporary staging of lookup sources.
//!
//! A loose folder given as a source is packed into a temporary archive so it
//! can be scanned like any other. Everything staged is removed when the
//! [`Staging`] is dropped, on every exit path.

use std::path::{Path, PathBuf};

use ltk_archive::{ArchiveWriter, PackOptions};
use tempfile::TempDir;

use crate::error::Result;

#[derive(Debug)]
pub struct Staging {
    dir: TempDir,
    staged: usize,
    observed: Vec<String>,
}

impl Staging {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("ltk-repath-").tempdir()?;
        tracing::debug!("Created staging directory path={}", dir.path().display());
        Ok(Self {
            dir,
            staged: 0,
            observed: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns an archive path for `source`, packing it first when it is a
    /// directory. Other paths are returned unchanged.
    pub fn stage_source(&mut self, source: &Path) -> Result<PathBuf> {
        if !source.is_dir() {
            return Ok(source.to_path_buf());
        }

        // Loose files are stored uncompressed; they are read back once.
        let options = PackOptions {
            compress: false,
            ..PackOptions::default()
        };
        let writer = ArchiveWriter::from_directory(source, &options)?;
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "source".to_string());
        let staged = self
            .dir
            .path()
            .join(format!("{}_{}.wad.client", self.staged, name));
        let summary = writer.write_to_file(&staged)?;
        self.staged += 1;
        self.observed.extend(writer.paths().map(str::to_string));

        tracing::info!(
            "Staged loose folder path={} entries={}",
            source.display(),
            summary.entries
        );
        Ok(staged)
    }

    /// Archive-relative paths of every file packed from loose folders.
    pub fn observed_paths(&self) -> &[String] {
        &self.observed
    }

    pub fn stage_sources<P: AsRef<Path>>(&mut self, sources: &[P]) -> Result<Vec<PathBuf>> {
        sources
            .iter()
            .map(|source| self.stage_source(source.as_ref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltk_archive::Archive;

    #[test]
    fn test_directory_is_packed_and_cleaned_up() {
        let input = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(input.path().join("assets")).unwrap();
        std::fs::write(input.path().join("assets/a.dds"), b"abc").unwrap();
        let other = tempfile::tempdir().unwrap();
        let file = other.path().join("plain.wad.client");
        std::fs::write(&file, b"not touched").unwrap();

        let mut staging = Staging::new().unwrap();
        let staged = staging
            .stage_sources(&[input.path().to_path_buf(), file.clone()])
            .unwrap();
        assert_eq!(staged[1], file);
        assert!(staged[0].starts_with(staging.path()));
        assert_eq!(staging.observed_paths(), ["assets/a.dds".to_string()]);

        let mut archive = Archive::open(&staged[0]).unwrap();
        let entry = *archive.find_path("assets/a.dds").unwrap();
        assert_eq!(archive.read_decompressed(&entry).unwrap(), b"abc");

        let root = staging.path().to_path_buf();
        drop(archive);
        drop(staging);
        assert!(!root.exists());
    }
}
