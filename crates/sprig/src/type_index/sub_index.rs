//
// type_index/sub_index.rs
//
// One classpath entry's slice of the type index
//
// Every mutation (eager load and change events) runs under `apply_lock`, so
// events for one entry apply strictly in the order they were delivered. The
// record map is only write-locked for the final insert/remove; artifact I/O
// happens before that, so readers never wait on disk.
//

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use walkdir::WalkDir;

use super::archive::read_archive;
use super::{IndexShared, TypeRecord};
use crate::change_feed::{ChangeEvent, ChangeKind, ChangeListener};
use crate::classfile::parse_class;
use crate::classpath::{is_archive_path, ClasspathEntry};
use crate::error::ArtifactError;

#[derive(Debug, Clone)]
enum Layout {
    /// Class files laid out by package under a root directory.
    Directory(PathBuf),
    /// A single archive, loaded and reloaded wholesale.
    Archive(PathBuf),
}

pub(crate) struct SubIndex {
    entry: ClasspathEntry,
    layout: Layout,
    types: RwLock<HashMap<String, Arc<TypeRecord>>>,
    apply_lock: Mutex<()>,
    shared: Arc<IndexShared>,
}

impl SubIndex {
    pub(crate) fn new(entry: ClasspathEntry, shared: Arc<IndexShared>) -> Self {
        let layout = match &entry {
            ClasspathEntry::Source { output_dir, .. } => Layout::Directory(output_dir.clone()),
            ClasspathEntry::Binary { path } if path.is_dir() => Layout::Directory(path.clone()),
            ClasspathEntry::Binary { path } if is_archive_path(path) || path.is_file() => {
                Layout::Archive(path.clone())
            }
            // Missing and extension-less: expect class files to appear under it
            ClasspathEntry::Binary { path } => Layout::Directory(path.clone()),
        };
        Self {
            entry,
            layout,
            types: RwLock::new(HashMap::new()),
            apply_lock: Mutex::new(()),
            shared,
        }
    }

    pub(crate) fn entry(&self) -> &ClasspathEntry {
        &self.entry
    }

    /// Index whatever is on disk now. Missing roots leave the sub-index empty.
    pub(crate) fn load(&self) {
        let _serial = self.serialize();
        match &self.layout {
            Layout::Directory(root) => {
                let records = self.collect_directory(root, root);
                log::trace!(
                    "Indexed {} type(s) under {}",
                    records.len(),
                    root.display()
                );
                self.replace_all(records);
            }
            Layout::Archive(archive) => {
                if archive.is_file() {
                    self.reload_archive(archive);
                } else {
                    log::trace!("Archive {} not present yet", archive.display());
                }
            }
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<TypeRecord>> {
        self.types.read().ok()?.get(name).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.types.read().map(|types| types.len()).unwrap_or(0)
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.types
            .read()
            .map(|types| types.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn serialize(&self) -> MutexGuard<'_, ()> {
        self.apply_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, event: &ChangeEvent) {
        let Some(path) = event.path() else {
            return;
        };

        let _serial = self.serialize();
        let applied = match &self.layout {
            Layout::Directory(root) => self.apply_in_directory(root, event.kind, &path),
            Layout::Archive(archive) => self.apply_to_archive(archive, event.kind, &path),
        };

        if applied {
            self.shared.counters.record_event_applied();
            log::trace!("Applied {:?} {}", event.kind, path.display());
        } else {
            self.shared.counters.record_event_ignored();
        }
    }

    fn apply_in_directory(&self, root: &Path, kind: ChangeKind, path: &Path) -> bool {
        // The root itself, or an ancestor, appeared or went away
        if root.starts_with(path) {
            if kind == ChangeKind::Changed && root.is_dir() {
                return false;
            }
            let records = self.collect_directory(root, root);
            self.replace_all(records);
            return true;
        }

        if !path.starts_with(root) {
            return false;
        }

        if let Some(name) = derive_type_name(root, path) {
            match kind {
                ChangeKind::Created => self.index_artifact(&name, path),
                ChangeKind::Changed if path.is_file() => self.index_artifact(&name, path),
                ChangeKind::Changed | ChangeKind::Deleted => self.remove(&name),
            }
            return true;
        }

        if has_class_extension(path) {
            // module-info / package-info
            return false;
        }

        // Whole directories appearing or vanishing under the root
        match kind {
            ChangeKind::Deleted => self.prune_under(path),
            ChangeKind::Created | ChangeKind::Changed if path.is_dir() => {
                let records = self.collect_directory(root, path);
                self.insert_all(records);
            }
            ChangeKind::Changed if !path.exists() => self.prune_under(path),
            _ => return false,
        }
        true
    }

    fn apply_to_archive(&self, archive: &Path, kind: ChangeKind, path: &Path) -> bool {
        if path != archive {
            if kind == ChangeKind::Deleted && archive.starts_with(path) {
                self.clear();
                return true;
            }
            return false;
        }

        match kind {
            ChangeKind::Created | ChangeKind::Changed if archive.is_file() => {
                self.reload_archive(archive)
            }
            _ => self.clear(),
        }
        true
    }

    fn index_artifact(&self, name: &str, path: &Path) {
        match read_record(name, path) {
            Ok(record) => {
                self.shared.counters.record_indexed(1);
                if let Ok(mut types) = self.types.write() {
                    types.insert(name.to_string(), Arc::new(record));
                }
            }
            Err(err) => self.shared.report(&err),
        }
    }

    fn remove(&self, name: &str) {
        if let Ok(mut types) = self.types.write() {
            types.remove(name);
        }
    }

    fn prune_under(&self, dir: &Path) {
        if let Ok(mut types) = self.types.write() {
            let before = types.len();
            types.retain(|_, record| !record.origin.starts_with(dir));
            log::trace!(
                "Pruned {} type(s) under {}",
                before - types.len(),
                dir.display()
            );
        }
    }

    fn clear(&self) {
        if let Ok(mut types) = self.types.write() {
            types.clear();
        }
    }

    fn reload_archive(&self, archive: &Path) {
        match read_archive(archive) {
            Ok(contents) => {
                for err in &contents.skipped {
                    self.shared.report(err);
                }
                self.shared.counters.record_indexed(contents.records.len());
                log::trace!(
                    "Indexed {} type(s) from {}",
                    contents.records.len(),
                    archive.display()
                );
                if let Ok(mut types) = self.types.write() {
                    *types = contents.records;
                }
            }
            // Keep the previous contents
            Err(err) => self.shared.report(&err),
        }
    }

    fn collect_directory(&self, root: &Path, dir: &Path) -> Vec<(String, Arc<TypeRecord>)> {
        let mut records = Vec::new();
        if !dir.is_dir() {
            return records;
        }

        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::trace!("Skipping unreadable entry under {}: {}", dir.display(), err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(name) = derive_type_name(root, path) else {
                continue;
            };
            match read_record(&name, path) {
                Ok(record) => records.push((name, Arc::new(record))),
                Err(err) => self.shared.report(&err),
            }
        }

        self.shared.counters.record_indexed(records.len());
        records
    }

    fn replace_all(&self, records: Vec<(String, Arc<TypeRecord>)>) {
        if let Ok(mut types) = self.types.write() {
            *types = records.into_iter().collect();
        }
    }

    fn insert_all(&self, records: Vec<(String, Arc<TypeRecord>)>) {
        if let Ok(mut types) = self.types.write() {
            types.extend(records);
        }
    }
}

impl ChangeListener for SubIndex {
    fn on_change(&self, event: &ChangeEvent) {
        self.apply(event);
    }
}

fn read_record(name: &str, path: &Path) -> Result<TypeRecord, ArtifactError> {
    let bytes = fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = parse_class(&bytes).map_err(|source| ArtifactError::ClassFile {
        path: path.to_path_buf(),
        source,
    })?;
    if parsed.name != name {
        log::trace!(
            "{} declares {} but is indexed by its path as {}",
            path.display(),
            parsed.name,
            name
        );
    }
    Ok(TypeRecord::from_parsed(name.to_string(), parsed, path.to_path_buf()))
}

fn has_class_extension(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("class")
}

/// Type name of a class file relative to `root` (`demo/Hello.class` → `demo.Hello`).
///
/// Returns `None` for paths outside `root`, non-class files, and
/// `module-info`/`package-info`.
pub(crate) fn derive_type_name(root: &Path, path: &Path) -> Option<String> {
    if !has_class_extension(path) {
        return None;
    }
    let relative = path.strip_prefix(root).ok()?;
    let stem = relative.file_stem()?.to_str()?;
    if stem == "module-info" || stem == "package-info" {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    if let Some(parent) = relative.parent() {
        for component in parent.components() {
            segments.push(component.as_os_str().to_str()?);
        }
    }
    segments.push(stem);
    Some(segments.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_type_name() {
        let root = Path::new("/out");
        assert_eq!(
            derive_type_name(root, Path::new("/out/demo/Hello.class")).as_deref(),
            Some("demo.Hello")
        );
        assert_eq!(
            derive_type_name(root, Path::new("/out/a/b/Outer$Inner.class")).as_deref(),
            Some("a.b.Outer$Inner")
        );
        assert_eq!(
            derive_type_name(root, Path::new("/out/Top.class")).as_deref(),
            Some("Top")
        );
    }

    #[test]
    fn test_derive_type_name_rejects() {
        let root = Path::new("/out");
        assert_eq!(derive_type_name(root, Path::new("/out/demo/Hello.java")), None);
        assert_eq!(derive_type_name(root, Path::new("/elsewhere/Hello.class")), None);
        assert_eq!(derive_type_name(root, Path::new("/out/module-info.class")), None);
        assert_eq!(
            derive_type_name(root, Path::new("/out/demo/package-info.class")),
            None
        );
        assert_eq!(derive_type_name(root, Path::new("/out/demo")), None);
    }
}
