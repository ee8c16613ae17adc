//
// type_index/archive.rs
//
// Eager indexing of jar/zip archives
//

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use zip::ZipArchive;

use super::TypeRecord;
use crate::classfile::parse_class;
use crate::error::ArtifactError;

/// Records read from one archive plus the entries that had to be skipped.
#[derive(Debug, Default)]
pub(crate) struct ArchiveContents {
    pub records: HashMap<String, Arc<TypeRecord>>,
    pub skipped: Vec<ArtifactError>,
}

/// Read every class entry of the archive at `path`.
///
/// Failing to open the archive (or its central directory) is an error; a bad
/// individual entry is reported in `skipped` and the rest are kept.
pub(crate) fn read_archive(path: &Path) -> Result<ArchiveContents, ArtifactError> {
    let file = File::open(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|source| ArtifactError::Zip {
        path: path.to_path_buf(),
        source,
    })?;

    let mut contents = ArchiveContents::default();
    let mut buffer = Vec::new();

    for idx in 0..archive.len() {
        let mut entry = match archive.by_index(idx) {
            Ok(entry) => entry,
            Err(source) => {
                contents.skipped.push(ArtifactError::Zip {
                    path: path.to_path_buf(),
                    source,
                });
                continue;
            }
        };

        if !entry.is_file() {
            continue;
        }
        let entry_name = entry.name().to_string();
        let Some(type_name) = entry_type_name(&entry_name) else {
            continue;
        };
        let origin = archive_entry_path(path, &entry_name);

        buffer.clear();
        if let Err(source) = entry.read_to_end(&mut buffer) {
            contents.skipped.push(ArtifactError::Io {
                path: origin,
                source,
            });
            continue;
        }

        match parse_class(&buffer) {
            Ok(parsed) => {
                let record = TypeRecord::from_parsed(type_name.clone(), parsed, origin);
                contents.records.insert(type_name, Arc::new(record));
            }
            Err(source) => contents.skipped.push(ArtifactError::ClassFile {
                path: origin,
                source,
            }),
        }
    }

    Ok(contents)
}

/// Type name for an archive entry, or `None` for entries that are not indexed.
fn entry_type_name(entry: &str) -> Option<String> {
    if entry.starts_with("META-INF/") {
        return None;
    }
    let stem = entry.strip_suffix(".class")?;
    let simple = stem.rsplit('/').next().unwrap_or(stem);
    if simple == "module-info" || simple == "package-info" || simple.is_empty() {
        return None;
    }
    Some(stem.replace('/', "."))
}

fn archive_entry_path(archive: &Path, entry: &str) -> PathBuf {
    PathBuf::from(format!("{}!/{}", archive.display(), entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::class_files::{class_bytes, write_jar, ClassFileBuilder};
    use tempfile::TempDir;

    #[test]
    fn test_entry_type_name() {
        assert_eq!(entry_type_name("demo/Hello.class").as_deref(), Some("demo.Hello"));
        assert_eq!(
            entry_type_name("demo/Outer$Inner.class").as_deref(),
            Some("demo.Outer$Inner")
        );
        assert_eq!(entry_type_name("Top.class").as_deref(), Some("Top"));
        assert_eq!(entry_type_name("META-INF/versions/11/demo/A.class"), None);
        assert_eq!(entry_type_name("module-info.class"), None);
        assert_eq!(entry_type_name("demo/package-info.class"), None);
        assert_eq!(entry_type_name("demo/readme.txt"), None);
    }

    #[test]
    fn test_read_archive_indexes_classes() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("spring-web.jar");
        write_jar(
            &jar,
            &[
                (
                    "org.springframework.web.bind.annotation.GetMapping",
                    ClassFileBuilder::annotation("org.springframework.web.bind.annotation.GetMapping")
                        .build(),
                ),
                ("org.springframework.web.Util", class_bytes("org.springframework.web.Util")),
            ],
        );

        let contents = read_archive(&jar).unwrap();
        assert!(contents.skipped.is_empty());
        assert_eq!(contents.records.len(), 2);
        let mapping = &contents.records["org.springframework.web.bind.annotation.GetMapping"];
        assert!(mapping.is_annotation());
        assert!(mapping.origin.to_string_lossy().contains("spring-web.jar!/"));
    }

    #[test]
    fn test_read_archive_skips_bad_entries() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("mixed.jar");
        write_jar(
            &jar,
            &[
                ("demo.Good", class_bytes("demo.Good")),
                ("demo.Bad", b"not a class".to_vec()),
            ],
        );

        let contents = read_archive(&jar).unwrap();
        assert_eq!(contents.records.len(), 1);
        assert!(contents.records.contains_key("demo.Good"));
        assert_eq!(contents.skipped.len(), 1);
    }

    #[test]
    fn test_read_archive_rejects_non_zip() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("broken.jar");
        std::fs::write(&jar, b"definitely not a zip").unwrap();

        assert!(matches!(read_archive(&jar), Err(ArtifactError::Zip { .. })));
        assert!(matches!(
            read_archive(&dir.path().join("missing.jar")),
            Err(ArtifactError::Io { .. })
        ));
    }
}
