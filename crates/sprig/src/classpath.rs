//
// classpath.rs
//
// Classpath entries, per-project snapshots and the on-disk project manifest
//

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::change_feed::ChangeFeed;
use crate::type_index::TypeIndex;

/// One element of a project's classpath. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClasspathEntry {
    /// Project sources and the folder their class files are compiled into.
    Source { source_dir: PathBuf, output_dir: PathBuf },
    /// A dependency: a jar/zip archive or a directory of class files.
    Binary { path: PathBuf },
}

impl ClasspathEntry {
    pub fn source(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        ClasspathEntry::Source {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn binary(path: impl Into<PathBuf>) -> Self {
        ClasspathEntry::Binary { path: path.into() }
    }

    /// The path whose change events keep this entry's sub-index current.
    pub fn watched_path(&self) -> &Path {
        match self {
            ClasspathEntry::Source { output_dir, .. } => output_dir,
            ClasspathEntry::Binary { path } => path,
        }
    }

    /// True for binary entries naming a jar or zip file.
    pub fn is_archive(&self) -> bool {
        match self {
            ClasspathEntry::Source { .. } => false,
            ClasspathEntry::Binary { path } => is_archive_path(path),
        }
    }
}

/// Whether `path` names an archive by extension, regardless of whether it exists.
pub fn is_archive_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jar") || ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// Ordered classpath of one project. Entry order is lookup precedence.
/// Owns the project's type index, which lives exactly as long as the snapshot.
pub struct ClasspathSnapshot {
    index: TypeIndex,
}

impl ClasspathSnapshot {
    pub fn new(entries: Vec<ClasspathEntry>, feed: &dyn ChangeFeed) -> Self {
        Self {
            index: TypeIndex::new(entries, feed),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &ClasspathEntry> {
        self.index.entries()
    }

    /// Source directories in classpath order.
    pub fn source_dirs(&self) -> impl Iterator<Item = &Path> {
        self.entries().filter_map(|entry| match entry {
            ClasspathEntry::Source { source_dir, .. } => Some(source_dir.as_path()),
            ClasspathEntry::Binary { .. } => None,
        })
    }

    pub fn type_index(&self) -> &TypeIndex {
        &self.index
    }
}

impl std::fmt::Debug for ClasspathSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClasspathSnapshot")
            .field("entries", &self.entries().collect::<Vec<_>>())
            .field("types", &self.index.len())
            .finish()
    }
}

/// Contents of a project manifest (`classpath.json` by default).
///
/// ```json
/// { "name": "demo",
///   "entries": [
///     { "kind": "source", "path": "src/main/java", "outputFolder": "target/classes" },
///     { "kind": "binary", "path": "lib/spring-web.jar" } ] }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ClasspathManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ManifestEntry {
    Source {
        path: PathBuf,
        #[serde(rename = "outputFolder")]
        output_folder: PathBuf,
    },
    Binary {
        path: PathBuf,
    },
}

impl ClasspathManifest {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Resolve the manifest's entries against `root`. Absolute paths are kept.
    pub fn resolve_entries(&self, root: &Path) -> Vec<ClasspathEntry> {
        self.entries
            .iter()
            .map(|entry| match entry {
                ManifestEntry::Source {
                    path,
                    output_folder,
                } => ClasspathEntry::source(root.join(path), root.join(output_folder)),
                ManifestEntry::Binary { path } => ClasspathEntry::binary(root.join(path)),
            })
            .collect()
    }
}
