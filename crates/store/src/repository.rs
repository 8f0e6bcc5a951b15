//! The caching, ranked-source blueprint repository.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use blueprint::{Blueprint, DirectResolver, StateResolver, Tag};
use tracing::{debug, warn};

use crate::atomic_write::atomic_write;
use crate::file_format;
use crate::id::BlueprintId;
use crate::source::{try_load, DiskSource, Source};
use crate::upgrade::{build_upgrade_registry, SchemaUpgrader};

#[cfg(debug_assertions)]
use crate::source::DevSource;

/// Cache-or-resolve store for blueprints.
///
/// Resolution tries each ranked source in order; the first answer wins and is
/// cached. Total absence is cached too (as `None`) so repeated misses never
/// re-hit storage. Entries are shared `Arc`s; a blueprint, once published
/// through the cache, is treated as immutable.
pub struct BlueprintRepository {
    sources: Vec<Box<dyn Source>>,
    save_target: DiskSource,
    upgrader: Box<dyn SchemaUpgrader>,
    resolver: Box<dyn StateResolver + Send + Sync>,
    cache: RwLock<HashMap<BlueprintId, Option<Arc<Blueprint>>>>,
}

impl BlueprintRepository {
    /// Repository over the default source ranking rooted at `root`:
    /// generated-on-disk, then (in debug builds) the dev directory. Bundled
    /// packs are appended with [`BlueprintRepository::with_source`].
    pub fn new(root: impl Into<PathBuf>) -> BlueprintRepository {
        let root = root.into();
        #[allow(unused_mut)]
        let mut sources: Vec<Box<dyn Source>> = vec![Box::new(DiskSource::new(root.clone()))];
        #[cfg(debug_assertions)]
        sources.push(Box::new(DevSource::new(root.clone())));
        BlueprintRepository {
            sources,
            save_target: DiskSource::new(root),
            upgrader: Box::new(build_upgrade_registry()),
            resolver: Box::new(DirectResolver),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Appends a lower-priority source (tried after the defaults).
    pub fn with_source(mut self, source: Box<dyn Source>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_upgrader(mut self, upgrader: Box<dyn SchemaUpgrader>) -> Self {
        self.upgrader = upgrader;
        self
    }

    pub fn with_resolver(mut self, resolver: Box<dyn StateResolver + Send + Sync>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Cache-or-resolve. `None` means no source carries the id; that answer
    /// is cached as well.
    pub fn get(&self, id: &BlueprintId) -> Option<Arc<Blueprint>> {
        if let Some(entry) = self.cache.read().unwrap().get(id) {
            return entry.clone();
        }
        // Racing callers may resolve the same id twice; the duplicate read is
        // accepted and the last writer into the cache wins.
        let resolved = self.resolve(id).map(Arc::new);
        self.cache
            .write()
            .unwrap()
            .insert(id.clone(), resolved.clone());
        resolved
    }

    /// Like [`BlueprintRepository::get`], but a total miss materializes and
    /// caches a fresh empty blueprint instead of returning `None`.
    pub fn get_or_create(&self, id: &BlueprintId) -> Arc<Blueprint> {
        if let Some(found) = self.get(id) {
            return found;
        }
        let created = Arc::new(Blueprint::new());
        self.cache
            .write()
            .unwrap()
            .insert(id.clone(), Some(created.clone()));
        created
    }

    /// Deduplicated union of every source's listing.
    pub fn list_all(&self) -> Vec<BlueprintId> {
        let mut ids = BTreeSet::new();
        for source in &self.sources {
            ids.extend(source.list());
        }
        ids.into_iter().collect()
    }

    /// Writes the cached blueprint for `id` to the generated-on-disk
    /// location. Returns false if the id is not resolved in cache or the
    /// write fails; save never throws.
    pub fn save(&self, id: &BlueprintId) -> bool {
        let Some(Some(cached)) = self.cache.read().unwrap().get(id).cloned() else {
            return false;
        };
        let doc = cached.encode();
        let bytes = match file_format::encode_document(&doc) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(%id, %error, "failed to encode blueprint");
                return false;
            }
        };
        let path = self.save_target.file_path(id);
        match atomic_write(&path, &bytes) {
            Ok(()) => {
                debug!(%id, path = %path.display(), "saved blueprint");
                true
            }
            Err(error) => {
                warn!(%id, path = %path.display(), %error, "failed to write blueprint");
                false
            }
        }
    }

    /// Drops a cache entry so the next `get` re-resolves from the sources.
    pub fn invalidate(&self, id: &BlueprintId) {
        self.cache.write().unwrap().remove(id);
    }

    fn resolve(&self, id: &BlueprintId) -> Option<Blueprint> {
        for source in &self.sources {
            let Some(doc) = try_load(source.as_ref(), id) else {
                continue;
            };
            match self.decode(doc) {
                Ok(bp) => {
                    debug!(%id, source = source.name(), "resolved blueprint");
                    return Some(bp);
                }
                Err(error) => {
                    warn!(%id, source = source.name(), %error, "undecodable blueprint; trying next source");
                }
            }
        }
        None
    }

    /// Routes the raw document through the upgrade chain, then interprets the
    /// palette data.
    fn decode(&self, mut doc: Tag) -> Result<Blueprint, crate::error::StoreError> {
        self.upgrader.upgrade(&mut doc)?;
        let mut bp = Blueprint::new();
        bp.decode(self.resolver.as_ref(), &doc)?;
        Ok(bp)
    }
}
