//! Schema upgrades: structured, validated chain of version steps.
//!
//! Each step transforms a raw tag document from version N to N+1. The
//! registry validates at construction that the chain is contiguous from the
//! legacy baseline to the current version, so a missing step is caught at
//! startup rather than on the first old file.

use blueprint::{Blueprint, Tag, LEGACY_SCHEMA_VERSION, SCHEMA_VERSION};
use tracing::debug;

use crate::error::StoreError;

/// Pluggable upgrade collaborator. The repository routes every raw document
/// through this before interpreting palette data.
pub trait SchemaUpgrader: Send + Sync {
    /// Brings `doc` from its recorded version up to [`SCHEMA_VERSION`].
    fn upgrade(&self, doc: &mut Tag) -> Result<(), StoreError>;
}

/// One upgrade step: transforms a document from `from_version` to
/// `from_version + 1`.
pub struct UpgradeStep {
    pub from_version: i32,
    pub description: &'static str,
    pub apply: fn(&mut Tag),
}

/// Ordered, validated chain of upgrade steps.
pub struct UpgradeRegistry {
    steps: Vec<UpgradeStep>,
    current_version: i32,
}

impl UpgradeRegistry {
    /// # Panics
    ///
    /// Panics if the chain has duplicate source versions or gaps between
    /// `legacy_version` and `current_version - 1`.
    pub fn new(steps: Vec<UpgradeStep>, legacy_version: i32, current_version: i32) -> Self {
        let mut seen = std::collections::HashSet::new();
        for step in &steps {
            assert!(
                seen.insert(step.from_version),
                "duplicate upgrade step for version {}",
                step.from_version
            );
        }
        for v in legacy_version..current_version {
            assert!(
                seen.contains(&v),
                "missing upgrade step from v{} to v{}; the chain must be contiguous \
                 from v{legacy_version} to v{current_version}",
                v,
                v + 1,
            );
        }

        let mut steps = steps;
        steps.sort_by_key(|s| s.from_version);
        Self {
            steps,
            current_version,
        }
    }

    #[cfg(test)]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

impl SchemaUpgrader for UpgradeRegistry {
    fn upgrade(&self, doc: &mut Tag) -> Result<(), StoreError> {
        let mut version = Blueprint::document_version(doc);
        if version > self.current_version {
            return Err(StoreError::FutureSchema {
                found: version,
                supported: self.current_version,
            });
        }
        for step in &self.steps {
            if version >= self.current_version {
                break;
            }
            if step.from_version == version {
                debug!(from = version, step.description, "upgrading blueprint document");
                (step.apply)(doc);
                version = step.from_version + 1;
            }
        }
        doc.insert("schema_version", Tag::Int(self.current_version));
        Ok(())
    }
}

/// The default chain covering every released document layout.
pub fn build_upgrade_registry() -> UpgradeRegistry {
    UpgradeRegistry::new(
        vec![
            UpgradeStep {
                from_version: 1,
                description: "rename blocks/nbt fields to cells/metadata",
                apply: rename_legacy_fields,
            },
            UpgradeStep {
                from_version: 2,
                description: "default missing author",
                apply: default_author,
            },
        ],
        LEGACY_SCHEMA_VERSION,
        SCHEMA_VERSION,
    )
}

/// v1 documents called the cell list `blocks`, per-cell metadata `nbt`, and
/// entity fields `blockPos` / `nbt`.
fn rename_legacy_fields(doc: &mut Tag) {
    let rename = |entry: &mut Tag, from: &str, to: &str| {
        if let Some(value) = entry.remove(from) {
            entry.insert(to, value);
        }
    };
    if let Some(Tag::List(mut entries)) = doc.remove("blocks") {
        for entry in &mut entries {
            rename(entry, "nbt", "metadata");
        }
        doc.insert("cells", Tag::List(entries));
    }
    if let Some(Tag::List(mut entries)) = doc.remove("entities") {
        for entry in &mut entries {
            rename(entry, "blockPos", "cell_pos");
            rename(entry, "nbt", "metadata");
        }
        doc.insert("entities", Tag::List(entries));
    }
}

/// v2 documents could omit the author field entirely.
fn default_author(doc: &mut Tag) {
    if doc.get_str("author").is_none() {
        doc.insert("author", Tag::from("?"));
    }
}
