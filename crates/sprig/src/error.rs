//
// error.rs
//
// Error types and non-fatal scan diagnostics
//

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tower_lsp::lsp_types::Url;
use zip::result::ZipError;

use crate::classfile::ClassParseError;

/// A compiled artifact (class file or archive) that could not be indexed.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("IO error while reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("ZIP error while reading {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("class parse error in {path}: {source}")]
    ClassFile {
        path: PathBuf,
        #[source]
        source: ClassParseError,
    },
}

impl ArtifactError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ArtifactError::Io { path, .. }
            | ArtifactError::Zip { path, .. }
            | ArtifactError::ClassFile { path, .. } => path,
        }
    }
}

/// A source file the front-end could not turn into a syntax tree.
#[derive(Debug, Error)]
pub enum SourceParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} is {size} bytes, over the {limit} byte limit")]
    TooLarge { path: PathBuf, size: u64, limit: u64 },
    #[error("parser produced no tree for {path} (timed out or aborted)")]
    NoTree { path: PathBuf },
    #[error("{path} cannot be expressed as a file URI")]
    InvalidPath { path: PathBuf },
}

/// A directory that claims to be a project root but cannot be loaded.
#[derive(Debug, Error)]
pub enum ProjectResolutionError {
    #[error("failed to read project manifest {path}: {source}")]
    ManifestIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid project manifest {path}: {source}")]
    ManifestFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure reported by a symbol provider for one annotation site.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Failed(String),
    #[error("provider panicked: {0}")]
    Panicked(String),
}

/// Fatal query failure. Everything else degrades to a [`Diagnostic`].
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("cannot enumerate workspace root {path}: {source}")]
    WorkspaceRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Non-fatal problem recorded while indexing or scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Compiled artifact skipped; any previous record was kept.
    ArtifactParse { path: PathBuf, message: String },
    /// Source file skipped.
    SourceParse { path: PathBuf, message: String },
    /// Annotation type did not resolve; site skipped.
    BindingResolution { uri: Url, annotation: String },
    /// Provider failed; site produced no symbol.
    ProviderFailure {
        uri: Url,
        annotation: String,
        message: String,
    },
    /// Project root could not be resolved; subtree skipped.
    ProjectResolution { path: PathBuf, message: String },
    /// Directory below the workspace root could not be listed; subtree skipped.
    DirectoryWalk { path: PathBuf, message: String },
}

impl Diagnostic {
    pub fn artifact(error: &ArtifactError) -> Self {
        Diagnostic::ArtifactParse {
            path: error.path().clone(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ArtifactParse { path, message } => {
                write!(f, "artifact {} skipped: {}", path.display(), message)
            }
            Diagnostic::SourceParse { path, message } => {
                write!(f, "source {} skipped: {}", path.display(), message)
            }
            Diagnostic::BindingResolution { uri, annotation } => {
                write!(f, "unresolved annotation {} in {}", annotation, uri)
            }
            Diagnostic::ProviderFailure {
                uri,
                annotation,
                message,
            } => write!(f, "provider for {} failed in {}: {}", annotation, uri, message),
            Diagnostic::ProjectResolution { path, message } => {
                write!(f, "project {} skipped: {}", path.display(), message)
            }
            Diagnostic::DirectoryWalk { path, message } => {
                write!(f, "directory {} skipped: {}", path.display(), message)
            }
        }
    }
}
