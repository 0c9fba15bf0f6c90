use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("File not found: {path}")]
    #[diagnostic(
        code(file::not_found),
        help("Make sure the file exists and the path is correct")
    )]
    FileNotFound { path: PathBuf },

    #[error("Failed to read property bin: {path}")]
    #[diagnostic(
        code(bin::invalid),
        help("The file is not a valid PROP/PTCH bin, or was written by a newer game version")
    )]
    InvalidPropertyBin {
        path: PathBuf,
        #[source]
        source: ltk_bin::BinError,
    },

    #[error("Failed to read property bin document: {path}")]
    #[diagnostic(
        code(bin::invalid_document),
        help("Check the JSON document for a wrong type name or a value that does not match its type")
    )]
    InvalidDocument {
        path: PathBuf,
        #[source]
        source: ltk_bin::BinError,
    },

    #[error("Archive operation failed: {path}")]
    #[diagnostic(code(archive::failed))]
    ArchiveFailed {
        path: PathBuf,
        #[source]
        source: ltk_archive::ArchiveError,
    },

    #[error("No lookup sources given")]
    #[diagnostic(
        code(fix::no_sources),
        help("Pass --source for each archive or folder to search, or set game_archives in repath.toml")
    )]
    NoSources,

    #[error("Reference resolution failed")]
    #[diagnostic(code(fix::failed))]
    Repath {
        #[from]
        source: ltk_repath::RepathError,
    },

    #[error("IO operation failed")]
    #[diagnostic(code(io::operation_failed))]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn invalid_property_bin(path: impl Into<PathBuf>, source: ltk_bin::BinError) -> Self {
        Self::InvalidPropertyBin {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_document(path: impl Into<PathBuf>, source: ltk_bin::BinError) -> Self {
        Self::InvalidDocument {
            path: path.into(),
            source,
        }
    }

    pub fn archive_failed(path: impl Into<PathBuf>, source: ltk_archive::ArchiveError) -> Self {
        Self::ArchiveFailed {
            path: path.into(),
            source,
        }
    }
}
