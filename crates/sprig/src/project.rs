//
// project.rs
//
// Project discovery: which directories are project roots, and their classpaths
//

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use crate::change_feed::ChangeFeed;
use crate::classpath::{ClasspathManifest, ClasspathSnapshot};
use crate::error::ProjectResolutionError;
use crate::file_snapshot::{get_file_snapshot, FileSnapshot};

/// A project root and its classpath. Identity is the root directory.
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    name: String,
    classpath: ClasspathSnapshot,
}

impl Project {
    pub fn new(root: PathBuf, name: String, classpath: ClasspathSnapshot) -> Self {
        Self {
            root,
            name,
            classpath,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn classpath(&self) -> &ClasspathSnapshot {
        &self.classpath
    }
}

impl PartialEq for Project {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl Eq for Project {}

/// Maps directories to projects.
pub trait ProjectFinder: Send + Sync {
    /// Cheap check used at every directory of the workspace walk.
    fn is_project_root(&self, dir: &Path) -> bool;

    /// Load the project rooted at `dir`. `Ok(None)` means the directory turned
    /// out not to be a project after all.
    fn resolve(&self, dir: &Path) -> Result<Option<Arc<Project>>, ProjectResolutionError>;
}

struct CachedProject {
    manifest: FileSnapshot,
    project: Arc<Project>,
}

/// Treats any directory holding a classpath manifest as a project root.
///
/// Projects are cached by root and rebuilt when the manifest's size or mtime
/// changes, which also drops the old type index and its subscriptions.
pub struct ManifestProjectFinder {
    manifest_name: String,
    feed: Arc<dyn ChangeFeed>,
    cache: DashMap<PathBuf, CachedProject>,
}

impl ManifestProjectFinder {
    pub fn new(manifest_name: impl Into<String>, feed: Arc<dyn ChangeFeed>) -> Self {
        Self {
            manifest_name: manifest_name.into(),
            feed,
            cache: DashMap::new(),
        }
    }

    pub fn manifest_name(&self) -> &str {
        &self.manifest_name
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    fn manifest_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.manifest_name)
    }

    fn load(&self, dir: &Path, manifest_path: &Path) -> Result<Project, ProjectResolutionError> {
        let text =
            fs::read_to_string(manifest_path).map_err(|source| ProjectResolutionError::ManifestIo {
                path: manifest_path.to_path_buf(),
                source,
            })?;
        let manifest = ClasspathManifest::parse(&text).map_err(|source| {
            ProjectResolutionError::ManifestFormat {
                path: manifest_path.to_path_buf(),
                source,
            }
        })?;

        let name = manifest.name.clone().unwrap_or_else(|| {
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| dir.display().to_string())
        });
        let entries = manifest.resolve_entries(dir);
        log::info!(
            "Loading project '{}' at {} ({} classpath entries)",
            name,
            dir.display(),
            entries.len()
        );
        let classpath = ClasspathSnapshot::new(entries, self.feed.as_ref());
        Ok(Project::new(dir.to_path_buf(), name, classpath))
    }
}

impl ProjectFinder for ManifestProjectFinder {
    fn is_project_root(&self, dir: &Path) -> bool {
        self.manifest_path(dir).is_file()
    }

    fn resolve(&self, dir: &Path) -> Result<Option<Arc<Project>>, ProjectResolutionError> {
        let manifest_path = self.manifest_path(dir);
        let Some(snapshot) = get_file_snapshot(&manifest_path) else {
            self.cache.remove(dir);
            return Ok(None);
        };

        if let Some(cached) = self.cache.get(dir) {
            if cached.manifest.matches_disk(&snapshot) {
                return Ok(Some(cached.project.clone()));
            }
            log::info!("Manifest changed, reloading project at {}", dir.display());
        }

        match self.load(dir, &manifest_path) {
            Ok(project) => {
                let project = Arc::new(project);
                self.cache.insert(
                    dir.to_path_buf(),
                    CachedProject {
                        manifest: snapshot,
                        project: project.clone(),
                    },
                );
                Ok(Some(project))
            }
            Err(err) => {
                self.cache.remove(dir);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_feed::FileObserver;
    use crate::classpath::ClasspathEntry;
    use crate::test_utils::class_files::{class_bytes, write_class_file};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn finder(observer: &FileObserver) -> ManifestProjectFinder {
        ManifestProjectFinder::new("classpath.json", Arc::new(observer.clone()))
    }

    fn write_manifest(dir: &Path, json: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("classpath.json"), json).unwrap();
    }

    const DEMO_MANIFEST: &str = r#"{
        "name": "demo",
        "entries": [{ "kind": "source", "path": "src", "outputFolder": "out" }]
    }"#;

    #[test]
    fn test_directory_without_manifest_is_not_a_project() {
        let dir = TempDir::new().unwrap();
        let observer = FileObserver::new();
        let finder = finder(&observer);
        assert!(!finder.is_project_root(dir.path()));
        assert!(finder.resolve(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_resolve_builds_classpath_and_index() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), DEMO_MANIFEST);
        write_class_file(&dir.path().join("out"), "demo.Hello", &class_bytes("demo.Hello"));

        let observer = FileObserver::new();
        let finder = finder(&observer);
        assert!(finder.is_project_root(dir.path()));

        let project = finder.resolve(dir.path()).unwrap().unwrap();
        assert_eq!(project.name(), "demo");
        assert_eq!(project.root(), dir.path());
        assert_eq!(
            project.classpath().entries().collect::<Vec<_>>(),
            vec![&ClasspathEntry::source(dir.path().join("src"), dir.path().join("out"))]
        );
        assert!(project.classpath().type_index().contains("demo.Hello"));
    }

    #[test]
    fn test_resolve_is_cached_until_manifest_changes() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), DEMO_MANIFEST);
        let observer = FileObserver::new();
        let finder = finder(&observer);

        let first = finder.resolve(dir.path()).unwrap().unwrap();
        let again = finder.resolve(dir.path()).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(finder.cached_count(), 1);

        write_manifest(
            dir.path(),
            r#"{ "name": "renamed-demo", "entries": [{ "kind": "binary", "path": "lib" }] }"#,
        );
        // Make sure the snapshot differs even on coarse mtime filesystems
        let manifest = fs::File::options()
            .write(true)
            .open(dir.path().join("classpath.json"))
            .unwrap();
        manifest
            .set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();

        let rebuilt = finder.resolve(dir.path()).unwrap().unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(rebuilt.name(), "renamed-demo");
    }

    #[test]
    fn test_invalid_manifest_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), "{ not json");
        let observer = FileObserver::new();
        let finder = finder(&observer);

        assert!(finder.is_project_root(dir.path()));
        assert!(matches!(
            finder.resolve(dir.path()),
            Err(ProjectResolutionError::ManifestFormat { .. })
        ));
        assert_eq!(finder.cached_count(), 0);
    }

    #[test]
    fn test_project_name_defaults_to_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("billing-service");
        write_manifest(&root, r#"{ "entries": [] }"#);
        let observer = FileObserver::new();

        let project = finder(&observer).resolve(&root).unwrap().unwrap();
        assert_eq!(project.name(), "billing-service");
    }
}
