//! Palette-compressed tag-document form of a blueprint.
//!
//! Layout: `size`, `author`, `schema_version`, one `palette` (single variant)
//! or `palettes` (index-aligned list of palettes), a `cells` list carrying
//! position / palette-slot index / optional metadata per cell, and an
//! `entities` list. Alternate variants reuse the same cell entries; only the
//! palette a given slot resolves through differs. A slot stands for one
//! combination of states across all variants, so two cells share a slot only
//! when they agree everywhere.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::IVec3;
use thiserror::Error;

use crate::blueprint::Blueprint;
use crate::record::EntityRecord;
use crate::state::CellState;
use crate::tag::Tag;
use crate::variant::{CellLayout, VariantSet};

/// Stamped on every encoded document; drives the store's upgrade chain.
pub const SCHEMA_VERSION: i32 = 3;
/// Assumed for documents with no version marker.
pub const LEGACY_SCHEMA_VERSION: i32 = 1;

/// Maps palette entries to concrete states. Unknown names yield `None` and
/// decode to the empty state.
pub trait StateResolver {
    fn resolve(&self, name: &str, properties: &BTreeMap<String, String>) -> Option<CellState>;
}

/// Resolver that accepts every name verbatim.
#[derive(Default)]
pub struct DirectResolver;

impl StateResolver for DirectResolver {
    fn resolve(&self, name: &str, properties: &BTreeMap<String, String>) -> Option<CellState> {
        let mut state = CellState::of(name);
        for (key, value) in properties {
            state.set_property(key.clone(), value.clone());
        }
        Some(state)
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("document is not a compound")]
    NotACompound,
    #[error("missing field {0:?}")]
    MissingField(&'static str),
    #[error("malformed field {0:?}")]
    BadField(&'static str),
}

fn encode_state(state: &CellState) -> Tag {
    let mut entry = Tag::compound();
    entry.insert("name", Tag::from(state.name()));
    if !state.properties().is_empty() {
        let mut props = Tag::compound();
        for (key, value) in state.properties() {
            props.insert(key.clone(), Tag::from(value.clone()));
        }
        entry.insert("properties", props);
    }
    entry
}

fn decode_state<R: StateResolver + ?Sized>(
    resolver: &R,
    entry: &Tag,
) -> Result<CellState, DecodeError> {
    let name = entry
        .get_str("name")
        .ok_or(DecodeError::MissingField("palette entry name"))?;
    let mut properties = BTreeMap::new();
    if let Some(props) = entry.get("properties") {
        let map = props.as_compound().ok_or(DecodeError::BadField("properties"))?;
        for (key, value) in map {
            let value = value.as_str().ok_or(DecodeError::BadField("properties"))?;
            properties.insert(key.clone(), value.to_string());
        }
    }
    Ok(resolver
        .resolve(name, &properties)
        .unwrap_or_else(CellState::air))
}

impl Blueprint {
    /// Serializes to a palette-compressed tag document.
    pub fn encode(&self) -> Tag {
        let mut doc = Tag::compound();
        doc.insert("schema_version", Tag::Int(SCHEMA_VERSION));
        doc.insert("size", Tag::int3(self.size));
        doc.insert("author", Tag::from(self.author.clone()));

        let (palettes, cell_to_palette) = self.encoding_palettes();

        let mut cells = Vec::with_capacity(self.layout.len());
        for i in 0..self.layout.len() {
            let mut cell = Tag::compound();
            cell.insert("pos", Tag::int3(self.layout.positions[i]));
            cell.insert("state", Tag::Int(cell_to_palette[&i] as i32));
            if let Some(meta) = &self.layout.metadata[i] {
                cell.insert("metadata", meta.clone());
            }
            cells.push(cell);
        }
        doc.insert("cells", Tag::List(cells));

        let palette_tag =
            |states: &[CellState]| Tag::List(states.iter().map(encode_state).collect());
        if self.variants.len() <= 1 {
            doc.insert(
                "palette",
                palette_tag(palettes.first().map(Vec::as_slice).unwrap_or(&[])),
            );
        } else {
            doc.insert(
                "palettes",
                Tag::List(palettes.iter().map(|p| palette_tag(p)).collect()),
            );
        }

        let entities = self
            .entities
            .iter()
            .map(|e| {
                let mut entry = Tag::compound();
                entry.insert("pos", Tag::double3(e.float_pos));
                entry.insert("cell_pos", Tag::int3(e.cell_pos));
                entry.insert("metadata", e.metadata.clone());
                entry
            })
            .collect();
        doc.insert("entities", Tag::List(entities));
        doc
    }

    /// Replaces this blueprint's contents from a tag document. The document
    /// must already be at the current schema version; the store routes stale
    /// documents through its upgrade chain first.
    pub fn decode<R: StateResolver + ?Sized>(
        &mut self,
        resolver: &R,
        doc: &Tag,
    ) -> Result<(), DecodeError> {
        if doc.as_compound().is_none() {
            return Err(DecodeError::NotACompound);
        }
        let size = doc
            .get("size")
            .and_then(Tag::as_int3)
            .ok_or(DecodeError::MissingField("size"))?;
        let author = doc.get_str("author").unwrap_or("?").to_string();

        let palettes: Vec<Vec<CellState>> = if let Some(list) = doc.get_list("palettes") {
            list.iter()
                .map(|p| {
                    p.as_list()
                        .ok_or(DecodeError::BadField("palettes"))?
                        .iter()
                        .map(|entry| decode_state(resolver, entry))
                        .collect()
                })
                .collect::<Result<_, _>>()?
        } else {
            let palette = doc
                .get_list("palette")
                .ok_or(DecodeError::MissingField("palette"))?;
            vec![palette
                .iter()
                .map(|entry| decode_state(resolver, entry))
                .collect::<Result<_, _>>()?]
        };
        if palettes.is_empty() {
            return Err(DecodeError::BadField("palettes"));
        }

        let cell_entries = doc
            .get_list("cells")
            .ok_or(DecodeError::MissingField("cells"))?;
        let mut positions = Vec::with_capacity(cell_entries.len());
        let mut metadata = Vec::with_capacity(cell_entries.len());
        let mut indices = Vec::with_capacity(cell_entries.len());
        for entry in cell_entries {
            positions.push(
                entry
                    .get("pos")
                    .and_then(Tag::as_int3)
                    .ok_or(DecodeError::BadField("cells"))?,
            );
            indices.push(entry.get_int("state").ok_or(DecodeError::BadField("cells"))?);
            metadata.push(entry.get("metadata").cloned());
        }
        let layout = Arc::new(CellLayout { positions, metadata });

        let variants = palettes
            .iter()
            .map(|palette| {
                let states = indices
                    .iter()
                    .map(|&idx| {
                        usize::try_from(idx)
                            .ok()
                            .and_then(|idx| palette.get(idx).cloned())
                            // Out-of-range palette index: degrade to empty
                            // rather than failing the whole load.
                            .unwrap_or_else(CellState::air)
                    })
                    .collect();
                VariantSet::new(layout.clone(), states)
            })
            .collect();

        let mut entities = Vec::new();
        if let Some(list) = doc.get_list("entities") {
            for entry in list {
                entities.push(EntityRecord {
                    float_pos: entry
                        .get("pos")
                        .and_then(Tag::as_double3)
                        .ok_or(DecodeError::BadField("entities"))?,
                    cell_pos: entry
                        .get("cell_pos")
                        .and_then(Tag::as_int3)
                        .unwrap_or(IVec3::ZERO),
                    metadata: entry.get("metadata").cloned().unwrap_or_else(Tag::compound),
                });
            }
        }

        self.size = size;
        self.author = author;
        self.layout = layout;
        self.variants = variants;
        self.entities = entities;
        Ok(())
    }

    /// Schema version recorded in a document, or the legacy baseline.
    pub fn document_version(doc: &Tag) -> i32 {
        doc.get_int("schema_version").unwrap_or(LEGACY_SCHEMA_VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CellRecord;
    use glam::DVec3;

    fn sample() -> Blueprint {
        let mut meta = Tag::compound();
        meta.insert("loot", Tag::from("rare"));
        let mut bp = Blueprint::from_cells(
            IVec3::new(2, 1, 1),
            vec![
                CellRecord::new(IVec3::new(0, 0, 0), CellState::of("stone"), None),
                CellRecord::new(
                    IVec3::new(1, 0, 0),
                    CellState::of("chest").with_property("facing", "north"),
                    Some(meta),
                ),
            ],
        );
        bp.set_author("builder");
        bp.push_variant(vec![
            CellState::of("deepslate"),
            CellState::of("barrel").with_property("facing", "north"),
        ]);
        let mut entity_meta = Tag::compound();
        entity_meta.insert("id", Tag::from("lantern_keeper"));
        bp.push_entity(EntityRecord {
            float_pos: DVec3::new(0.5, 0.0, 0.5),
            cell_pos: IVec3::ZERO,
            metadata: entity_meta,
        });
        bp
    }

    #[test]
    fn test_roundtrip_preserves_everything() {
        let bp = sample();
        let doc = bp.encode();
        let mut back = Blueprint::new();
        back.decode(&DirectResolver, &doc).unwrap();

        assert_eq!(back.size(), bp.size());
        assert_eq!(back.author(), "builder");
        assert_eq!(back.variants().len(), 2);
        for (v, w) in bp.variants().iter().zip(back.variants()) {
            assert_eq!(v, w);
        }
        assert_eq!(back.entities(), bp.entities());
    }

    #[test]
    fn test_version_stamped_and_defaulted() {
        let doc = sample().encode();
        assert_eq!(Blueprint::document_version(&doc), SCHEMA_VERSION);
        assert_eq!(
            Blueprint::document_version(&Tag::compound()),
            LEGACY_SCHEMA_VERSION
        );
    }

    #[test]
    fn test_single_variant_uses_palette_key() {
        let bp = Blueprint::from_cells(
            IVec3::ONE,
            vec![CellRecord::new(IVec3::ZERO, CellState::of("stone"), None)],
        );
        let doc = bp.encode();
        assert!(doc.get("palette").is_some());
        assert!(doc.get("palettes").is_none());
    }

    #[test]
    fn test_out_of_range_index_becomes_air() {
        let bp = Blueprint::from_cells(
            IVec3::ONE,
            vec![CellRecord::new(IVec3::ZERO, CellState::of("stone"), None)],
        );
        let mut doc = bp.encode();
        // Corrupt the only cell's palette index.
        if let Some(Tag::List(cells)) = doc.remove("cells") {
            let mut cell = cells[0].clone();
            cell.insert("state", Tag::Int(99));
            doc.insert("cells", Tag::List(vec![cell]));
        }
        let mut back = Blueprint::new();
        back.decode(&DirectResolver, &doc).unwrap();
        assert!(back.variants()[0].state(0).is_air());
    }

    #[test]
    fn test_missing_size_is_an_error() {
        let mut doc = sample().encode();
        doc.remove("size");
        let mut back = Blueprint::new();
        assert!(matches!(
            back.decode(&DirectResolver, &doc),
            Err(DecodeError::MissingField("size"))
        ));
    }

    #[test]
    fn test_variants_diverging_on_shared_state_survive_roundtrip() {
        // Both cells are stone in the first variant but differ in the second;
        // the palette must keep two slots (duplicating "stone") or the second
        // variant's distinction is lost.
        let mut bp = Blueprint::from_cells(
            IVec3::new(2, 1, 1),
            vec![
                CellRecord::new(IVec3::new(0, 0, 0), CellState::of("stone"), None),
                CellRecord::new(IVec3::new(1, 0, 0), CellState::of("stone"), None),
            ],
        );
        bp.push_variant(vec![CellState::of("dirt"), CellState::of("gravel")]);

        let doc = bp.encode();
        let palettes = doc.get_list("palettes").unwrap();
        assert_eq!(palettes[0].as_list().unwrap().len(), 2);

        let mut back = Blueprint::new();
        back.decode(&DirectResolver, &doc).unwrap();
        assert!(back.variants()[1].state(0).is("dirt"));
        assert!(back.variants()[1].state(1).is("gravel"));
        assert_eq!(bp.variants(), back.variants());
    }

    #[test]
    fn test_palette_dedupes_repeated_states() {
        let bp = Blueprint::from_cells(
            IVec3::new(3, 1, 1),
            vec![
                CellRecord::new(IVec3::new(0, 0, 0), CellState::of("stone"), None),
                CellRecord::new(IVec3::new(1, 0, 0), CellState::of("stone"), None),
                CellRecord::new(IVec3::new(2, 0, 0), CellState::of("dirt"), None),
            ],
        );
        let doc = bp.encode();
        assert_eq!(doc.get_list("palette").unwrap().len(), 2);
    }
}
