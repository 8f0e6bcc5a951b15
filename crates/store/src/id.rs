//! Blueprint identifiers: `namespace:path` pairs with strict path hygiene.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Namespace assumed when an id string carries no `:`.
pub const DEFAULT_NAMESPACE: &str = "core";

/// Subdirectory of a namespace that holds runtime-generated blueprints.
pub const GENERATED_SUBDIR: &str = "generated";

/// Extension of the binary compressed form.
pub const BINARY_EXT: &str = "blueprint";

/// Extension of the human-readable dev form.
pub const TEXT_EXT: &str = "json";

/// A validated `namespace:path` blueprint identifier.
///
/// Validation is strict by construction: a `BlueprintId` that exists cannot
/// escape the storage root, so path building never needs to sanitize.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlueprintId {
    namespace: String,
    path: String,
}

fn namespace_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.')
}

fn path_char(c: char) -> bool {
    namespace_char(c) || c == '/'
}

fn validate(id: &str, namespace: &str, path: &str) -> Result<(), StoreError> {
    let fail = |reason| {
        Err(StoreError::InvalidId {
            id: id.to_string(),
            reason,
        })
    };
    if namespace.is_empty() {
        return fail("empty namespace");
    }
    if !namespace.chars().all(namespace_char) {
        return fail("namespace must be [a-z0-9_.-]");
    }
    if path.is_empty() {
        return fail("empty path");
    }
    if !path.chars().all(path_char) {
        return fail("path must be [a-z0-9_./-]");
    }
    if path.starts_with('/') || path.ends_with('/') {
        return fail("path must not start or end with a separator");
    }
    // Doubled separators and dot segments would change meaning on disk;
    // reject them outright instead of normalizing.
    if path.contains("//") {
        return fail("doubled path separator");
    }
    if path.split('/').any(|seg| seg == "." || seg == "..") {
        return fail("path traversal segment");
    }
    Ok(())
}

impl BlueprintId {
    pub fn new(namespace: &str, path: &str) -> Result<BlueprintId, StoreError> {
        validate(&format!("{namespace}:{path}"), namespace, path)?;
        Ok(BlueprintId {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    /// Parses `namespace:path`, or a bare `path` under [`DEFAULT_NAMESPACE`].
    pub fn parse(id: &str) -> Result<BlueprintId, StoreError> {
        match id.split_once(':') {
            Some((namespace, path)) => BlueprintId::new(namespace, path),
            None => BlueprintId::new(DEFAULT_NAMESPACE, id),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// On-disk location: `<root>/<namespace>/<subdir>/<path>.<ext>`.
    pub fn file_path(&self, root: &Path, subdir: &str, ext: &str) -> PathBuf {
        let mut out = root.join(&self.namespace).join(subdir);
        let mut segs = self.path.split('/').peekable();
        while let Some(seg) = segs.next() {
            if segs.peek().is_some() {
                out.push(seg);
            } else {
                // Appended rather than set_extension so a dotted final
                // segment keeps its dot.
                out.push(format!("{seg}.{ext}"));
            }
        }
        debug_assert!(out.starts_with(root));
        out
    }
}

impl fmt::Display for BlueprintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}
