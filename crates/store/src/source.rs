//! Ranked blueprint sources.
//!
//! The repository tries sources in priority order: generated-on-disk first,
//! then the dev directory (debug builds only), then bundled packs. A source
//! that fails to load an id answers "not here"; only the repository decides
//! what total absence means.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use blueprint::Tag;
use tracing::warn;

use crate::error::StoreError;
use crate::file_format;
use crate::id::{BlueprintId, BINARY_EXT, GENERATED_SUBDIR, TEXT_EXT};

pub trait Source: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw (pre-upgrade) tag document for `id`, or `None` if this source does
    /// not carry it.
    fn load(&self, id: &BlueprintId) -> Result<Option<Tag>, StoreError>;

    /// Every id this source can answer for.
    fn list(&self) -> Vec<BlueprintId>;
}

/// Walks `<root>/<namespace>/<subdir>/**/*.<ext>` and parses each hit back
/// into an id.
fn list_tree(root: &Path, subdir: &str, ext: &str) -> Vec<BlueprintId> {
    let mut out = Vec::new();
    let Ok(namespaces) = fs::read_dir(root) else {
        return out;
    };
    for entry in namespaces.flatten() {
        let Some(namespace) = entry.file_name().to_str().map(String::from) else {
            continue;
        };
        let base = entry.path().join(subdir);
        let mut stack = vec![base.clone()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }
                if path.extension().and_then(|e| e.to_str()) != Some(ext) {
                    continue;
                }
                let Ok(rel) = path.with_extension("").strip_prefix(&base).map(PathBuf::from)
                else {
                    continue;
                };
                let rel = rel.to_string_lossy().replace('\\', "/");
                if let Ok(id) = BlueprintId::new(&namespace, &rel) {
                    out.push(id);
                }
            }
        }
    }
    out
}

/// Runtime-generated blueprints in the binary compressed form. This is also
/// the location repository saves write to.
pub struct DiskSource {
    root: PathBuf,
}

impl DiskSource {
    pub fn new(root: impl Into<PathBuf>) -> DiskSource {
        DiskSource { root: root.into() }
    }

    pub fn file_path(&self, id: &BlueprintId) -> PathBuf {
        id.file_path(&self.root, GENERATED_SUBDIR, BINARY_EXT)
    }
}

impl Source for DiskSource {
    fn name(&self) -> &'static str {
        "generated"
    }

    fn load(&self, id: &BlueprintId) -> Result<Option<Tag>, StoreError> {
        let path = self.file_path(id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        file_format::decode_document(&path, &bytes).map(Some)
    }

    fn list(&self) -> Vec<BlueprintId> {
        list_tree(&self.root, GENERATED_SUBDIR, BINARY_EXT)
    }
}

/// Human-readable blueprints for development, stored as the JSON form of the
/// tag document. Wired into the default ranking only in debug builds.
pub struct DevSource {
    root: PathBuf,
    subdir: &'static str,
}

impl DevSource {
    pub fn new(root: impl Into<PathBuf>) -> DevSource {
        DevSource {
            root: root.into(),
            subdir: "dev",
        }
    }
}

impl Source for DevSource {
    fn name(&self) -> &'static str {
        "dev"
    }

    fn load(&self, id: &BlueprintId) -> Result<Option<Tag>, StoreError> {
        let path = id.file_path(&self.root, self.subdir, TEXT_EXT);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&text) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => Err(StoreError::Corrupt {
                path,
                reason: format!("bad json: {e}"),
            }),
        }
    }

    fn list(&self) -> Vec<BlueprintId> {
        list_tree(&self.root, self.subdir, TEXT_EXT)
    }
}

/// Blueprints bundled with the application, handed over as pre-encoded
/// binary blobs keyed by id.
#[derive(Default)]
pub struct PackSource {
    entries: HashMap<BlueprintId, Vec<u8>>,
}

impl PackSource {
    pub fn new() -> PackSource {
        PackSource::default()
    }

    pub fn insert(&mut self, id: BlueprintId, bytes: Vec<u8>) {
        self.entries.insert(id, bytes);
    }
}

impl Source for PackSource {
    fn name(&self) -> &'static str {
        "pack"
    }

    fn load(&self, id: &BlueprintId) -> Result<Option<Tag>, StoreError> {
        let Some(bytes) = self.entries.get(id) else {
            return Ok(None);
        };
        file_format::decode_document(Path::new(&format!("pack:{id}")), bytes).map(Some)
    }

    fn list(&self) -> Vec<BlueprintId> {
        let mut ids: Vec<BlueprintId> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Loads from one source, demoting errors to "no answer" with a log line so
/// resolution can fall through to the next source.
pub fn try_load(source: &dyn Source, id: &BlueprintId) -> Option<Tag> {
    match source.load(id) {
        Ok(found) => found,
        Err(error) => {
            warn!(source = source.name(), %id, %error, "blueprint source failed; trying next");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir(name: &str) -> PathBuf {
        let dir = PathBuf::from(format!("/tmp/blueprint_source_test_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_doc() -> Tag {
        let mut doc = Tag::compound();
        doc.insert("author", Tag::from("builder"));
        doc
    }

    #[test]
    fn test_disk_source_roundtrip_and_list() {
        let dir = test_dir("disk_roundtrip");
        let source = DiskSource::new(&dir);
        let id = BlueprintId::parse("village:houses/hut").unwrap();

        assert!(source.load(&id).unwrap().is_none());

        let bytes = file_format::encode_document(&sample_doc()).unwrap();
        let path = source.file_path(&id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();

        assert_eq!(source.load(&id).unwrap(), Some(sample_doc()));
        assert_eq!(source.list(), vec![id]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_disk_source_corrupt_file_is_an_error() {
        let dir = test_dir("disk_corrupt");
        let source = DiskSource::new(&dir);
        let id = BlueprintId::parse("village:hut").unwrap();
        let path = source.file_path(&id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"garbage").unwrap();

        assert!(source.load(&id).is_err());
        // The fall-through wrapper demotes it to a miss.
        assert!(try_load(&source, &id).is_none());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_dev_source_reads_json() {
        let dir = test_dir("dev_json");
        let source = DevSource::new(&dir);
        let id = BlueprintId::parse("village:hut").unwrap();
        let path = id.file_path(&dir, "dev", "json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, serde_json::to_string(&sample_doc()).unwrap()).unwrap();

        assert_eq!(source.load(&id).unwrap(), Some(sample_doc()));
        assert_eq!(source.list(), vec![id]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_pack_source_serves_inserted_blobs() {
        let mut source = PackSource::new();
        let id = BlueprintId::parse("village:hut").unwrap();
        source.insert(
            id.clone(),
            file_format::encode_document(&sample_doc()).unwrap(),
        );

        assert_eq!(source.load(&id).unwrap(), Some(sample_doc()));
        let missing = BlueprintId::parse("village:other").unwrap();
        assert!(source.load(&missing).unwrap().is_none());
        assert_eq!(source.list(), vec![id]);
    }
}
