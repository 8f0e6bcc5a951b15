//! The blueprint itself: capture, queries, and placement.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::IVec3;

use crate::geom::{
    origin_after_transform, size_after_rotation, transform_point, transform_point_f, BoundingBox,
    Direction, Mirror, Rotation,
};
use crate::options::PlacementOptions;
use crate::pipeline;
use crate::record::{CellRecord, ConnectorInfo, EntityRecord};
use crate::state::{CellShape, CellState, BARRIER, CONNECTOR};
use crate::tag::Tag;
use crate::variant::{CellLayout, VariantSet};
use crate::world::{update_flags, WorldAccess, WorldReader};

/// A captured, transformable, serializable voxel region template.
///
/// Created empty, populated by [`Blueprint::capture_from_world`] or decode,
/// and treated as immutable once published.
pub struct Blueprint {
    pub(crate) size: IVec3,
    pub(crate) author: String,
    pub(crate) layout: Arc<CellLayout>,
    pub(crate) variants: Vec<VariantSet>,
    pub(crate) entities: Vec<EntityRecord>,
}

impl Default for Blueprint {
    fn default() -> Self {
        Blueprint::new()
    }
}

impl Blueprint {
    pub fn new() -> Blueprint {
        Blueprint {
            size: IVec3::ZERO,
            author: "?".to_string(),
            layout: Arc::new(CellLayout::default()),
            variants: Vec::new(),
            entities: Vec::new(),
        }
    }

    pub fn size(&self) -> IVec3 {
        self.size
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn set_author(&mut self, author: impl Into<String>) {
        self.author = author.into();
    }

    pub fn variants(&self) -> &[VariantSet] {
        &self.variants
    }

    pub fn entities(&self) -> &[EntityRecord] {
        &self.entities
    }

    /// Snapshots the inclusive box `origin .. origin + size - 1` into a single
    /// fresh variant, replacing any existing cell data. Cells are bucketed as
    /// plain / irregular-shape / metadata-bearing and each bucket sorted by
    /// (Y, X, Z) so replay touches simple cells first. Entities are replaced
    /// only when `include_entities` is set.
    pub fn capture_from_world<W: WorldReader>(
        &mut self,
        world: &W,
        origin: IVec3,
        size: IVec3,
        include_entities: bool,
        ignore: Option<&str>,
    ) {
        self.size = size;
        if size.cmple(IVec3::ZERO).any() {
            self.layout = Arc::new(CellLayout::default());
            self.variants = vec![VariantSet::new(self.layout.clone(), Vec::new())];
            return;
        }
        let bounds = BoundingBox::from_corners(origin, origin + size - IVec3::ONE);

        let mut plain = Vec::new();
        let mut shaped = Vec::new();
        let mut with_meta = Vec::new();
        for pos in bounds.iter() {
            let state = world.cell(pos);
            if ignore.is_some_and(|name| state.is(name)) {
                continue;
            }
            let record = CellRecord::new(pos - origin, state, world.metadata(pos));
            if record.metadata.is_some() {
                with_meta.push(record);
            } else if record.state.shape() == CellShape::Partial {
                shaped.push(record);
            } else {
                plain.push(record);
            }
        }
        let key = |r: &CellRecord| (r.pos.y, r.pos.x, r.pos.z);
        plain.sort_by_key(key);
        shaped.sort_by_key(key);
        with_meta.sort_by_key(key);

        let mut positions = Vec::new();
        let mut metadata = Vec::new();
        let mut states = Vec::new();
        for record in plain.into_iter().chain(shaped).chain(with_meta) {
            positions.push(record.pos);
            metadata.push(record.metadata);
            states.push(record.state);
        }
        self.layout = Arc::new(CellLayout { positions, metadata });
        self.variants = vec![VariantSet::new(self.layout.clone(), states)];

        if include_entities {
            self.entities = world
                .entities_in(bounds)
                .into_iter()
                .map(|e| EntityRecord {
                    float_pos: e.float_pos - origin.as_dvec3(),
                    cell_pos: e.cell_pos - origin,
                    metadata: e.metadata,
                })
                .collect();
        }
    }

    /// Cells of the chosen variant whose state name matches, transformed by
    /// the options and offset by `anchor` unless `relative` is false.
    pub fn filter_cells(
        &self,
        anchor: IVec3,
        options: &PlacementOptions,
        state_name: &str,
        relative: bool,
    ) -> Vec<CellRecord> {
        if self.variants.is_empty() {
            return Vec::new();
        }
        let variant = options.random_pick(anchor, &self.variants);
        variant
            .cells_named(state_name)
            .into_iter()
            .map(|cell| {
                let transformed =
                    transform_point(cell.pos, options.mirror, options.rotation, options.pivot);
                let pos = if relative { transformed + anchor } else { transformed };
                cell.at(pos)
            })
            .collect()
    }

    /// Connector info for the variant selected at `anchor`, rotated and
    /// offset into world space.
    pub fn connectors(&self, anchor: IVec3, rotation: Rotation) -> Vec<ConnectorInfo> {
        if self.variants.is_empty() {
            return Vec::new();
        }
        let options = PlacementOptions::new().with_rotation(rotation);
        let variant = options.random_pick(anchor, &self.variants);
        variant
            .cells_named(CONNECTOR)
            .iter()
            .filter_map(|cell| {
                let pos =
                    transform_point(cell.pos, Mirror::None, rotation, IVec3::ZERO) + anchor;
                let rotated = CellRecord::new(pos, cell.state.rotate(rotation), cell.metadata.clone());
                ConnectorInfo::from_cell(&rotated)
            })
            .collect()
    }

    /// World-space inclusive bounds of this blueprint under the options.
    pub fn bounding_box(&self, options: &PlacementOptions, start: IVec3) -> BoundingBox {
        self.bounding_box_for(start, options.rotation, options.pivot, options.mirror)
    }

    pub fn bounding_box_for(
        &self,
        start: IVec3,
        rotation: Rotation,
        pivot: IVec3,
        mirror: Mirror,
    ) -> BoundingBox {
        let far = self.size - IVec3::ONE;
        let a = transform_point(IVec3::ZERO, mirror, rotation, pivot) + start;
        let b = transform_point(far.max(IVec3::ZERO), mirror, rotation, pivot) + start;
        BoundingBox::from_corners(a, b)
    }

    /// Extents of the region after applying a rotation.
    pub fn rotated_size(&self, rotation: Rotation) -> IVec3 {
        size_after_rotation(self.size, rotation)
    }

    /// Anchor so the transformed region stays non-negative relative to `pos`.
    pub fn transform_origin(&self, pos: IVec3, mirror: Mirror, rotation: Rotation) -> IVec3 {
        origin_after_transform(pos, mirror, rotation, self.size.x, self.size.z)
    }

    /// Materializes this blueprint into the world at `offset`.
    ///
    /// Runs the rule pipeline, writes surviving cells (adapting to existing
    /// fluids), resolves fluid leveling to a fixpoint, reconciles boundary
    /// shapes, re-stamps metadata, then spawns entities. Returns false when
    /// there is nothing to place.
    pub fn place<W: WorldAccess>(
        &self,
        world: &mut W,
        offset: IVec3,
        anchor: IVec3,
        options: &PlacementOptions,
        flags: u32,
    ) -> bool {
        if self.variants.is_empty() {
            return false;
        }
        let variant = options.random_pick(offset, &self.variants);
        if variant.is_empty() && (options.ignore_entities || self.entities.is_empty()) {
            return false;
        }

        let cells = pipeline::process_cells(world, offset, anchor, variant.records(), options);

        let mut bounds: Option<BoundingBox> = None;
        let mut deferred_metadata: Vec<(IVec3, Tag)> = Vec::new();
        let mut fluid_sources: HashSet<IVec3> = HashSet::new();
        let mut pending_fluid: HashSet<IVec3> = HashSet::new();

        for cell in &cells {
            let pos = cell.pos;
            if options.clip.is_some_and(|clip| !clip.contains(pos)) {
                continue;
            }
            let existing_fluid = if options.adapt_fluids {
                let existing = world.cell(pos);
                existing.is_fluid().then_some(existing)
            } else {
                None
            };

            let mut state = cell.state.mirror(options.mirror).rotate(options.rotation);

            if cell.metadata.is_some() {
                // A stale holder at this position must not survive into the
                // new cell, and the neutral placeholder keeps observers from
                // reading a half-written cell while metadata is pending.
                world.remove_metadata(pos);
                world.set_cell(
                    pos,
                    CellState::of(BARRIER),
                    update_flags::SYNC_CLIENTS | update_flags::KEEP_SHAPE,
                );
            }

            let mut became_source = false;
            let mut needs_source = false;
            if let Some(fluid) = &existing_fluid {
                if state.is_fluid_container() {
                    if fluid.is_fluid_source() {
                        state.set_property("waterlogged", "true");
                        became_source = true;
                    } else {
                        state.set_property("waterlogged", "false");
                        needs_source = true;
                    }
                }
            }

            if world.set_cell(pos, state, flags) {
                match &mut bounds {
                    Some(b) => b.encapsulate(pos),
                    None => bounds = Some(BoundingBox::single(pos)),
                }
                if let Some(meta) = &cell.metadata {
                    deferred_metadata.push((pos, meta.clone()));
                }
                if became_source {
                    fluid_sources.insert(pos);
                } else if needs_source {
                    pending_fluid.insert(pos);
                }
            }
        }

        self.level_fluids(world, &mut fluid_sources, &mut pending_fluid, flags);

        if !options.known_shape {
            if let Some(bounds) = bounds {
                self.reconcile_boundary(world, bounds, flags);
            }
        }

        for (pos, metadata) in deferred_metadata {
            world.set_metadata(pos, metadata);
        }

        if !options.ignore_entities {
            self.spawn_entities(world, offset, options);
        }
        true
    }

    /// Bounded fixpoint: converts fluid containers adjacent to a resolved
    /// source into sources themselves, until a full pass converts nothing.
    fn level_fluids<W: WorldAccess>(
        &self,
        world: &mut W,
        sources: &mut HashSet<IVec3>,
        pending: &mut HashSet<IVec3>,
        flags: u32,
    ) {
        const NEIGHBORS: [Direction; 5] = [
            Direction::North,
            Direction::South,
            Direction::West,
            Direction::East,
            Direction::Up,
        ];
        let mut converted_any = true;
        while converted_any && !pending.is_empty() {
            converted_any = false;
            let mut converted = Vec::new();
            for &pos in pending.iter() {
                let has_source_neighbor = NEIGHBORS.iter().any(|dir| {
                    let neighbor = pos + dir.offset();
                    if pending.contains(&neighbor) {
                        return false;
                    }
                    if sources.contains(&neighbor) {
                        return true;
                    }
                    let state = world.cell(neighbor);
                    state.is_fluid_source() || state.is_waterlogged()
                });
                if has_source_neighbor {
                    let state = world.cell(pos);
                    let mut filled = state.clone();
                    filled.set_property("waterlogged", "true");
                    if filled != state {
                        world.set_cell(pos, filled, flags);
                    }
                    converted.push(pos);
                    converted_any = true;
                }
            }
            for pos in converted {
                pending.remove(&pos);
                sources.insert(pos);
            }
        }
    }

    /// Recomputes connection shapes on the outward shell of the placed box,
    /// in both directions across each face, notifying the world either way.
    fn reconcile_boundary<W: WorldAccess>(&self, world: &mut W, bounds: BoundingBox, flags: u32) {
        for pos in bounds.shell() {
            let mut current = world.cell(pos);
            for dir in Direction::ALL {
                let neighbor_pos = pos + dir.offset();
                let neighbor = world.cell(neighbor_pos);

                let updated = current.reconcile(dir, &neighbor);
                if updated != current {
                    world.set_cell(pos, updated.clone(), flags);
                    current = updated;
                }

                let neighbor_updated = neighbor.reconcile(dir.opposite(), &current);
                if neighbor_updated != neighbor {
                    world.set_cell(neighbor_pos, neighbor_updated, flags);
                }
            }
            world.notify_update(pos);
        }
    }

    fn spawn_entities<W: WorldAccess>(
        &self,
        world: &mut W,
        offset: IVec3,
        options: &PlacementOptions,
    ) {
        for entity in &self.entities {
            let float_pos = transform_point_f(
                entity.float_pos,
                options.mirror,
                options.rotation,
                options.pivot,
            ) + offset.as_dvec3();
            let cell_pos =
                transform_point(entity.cell_pos, options.mirror, options.rotation, options.pivot)
                    + offset;
            let mut metadata = entity.metadata.clone();
            if let Some(yaw) = metadata.get("yaw").and_then(Tag::as_double) {
                let turned = options.mirror.mirror_yaw(yaw) + options.rotation.yaw_offset();
                metadata.insert("yaw", Tag::Double(turned.rem_euclid(360.0)));
            }
            world.spawn_entity(
                EntityRecord {
                    float_pos,
                    cell_pos,
                    metadata,
                },
                options.finalize_entities,
            );
        }
    }

    /// Builds a one-variant blueprint directly from records; test and tooling
    /// convenience.
    pub fn from_cells(size: IVec3, cells: Vec<CellRecord>) -> Blueprint {
        let mut bp = Blueprint::new();
        bp.size = size;
        let mut positions = Vec::new();
        let mut metadata = Vec::new();
        let mut states = Vec::new();
        for cell in cells {
            positions.push(cell.pos);
            metadata.push(cell.metadata);
            states.push(cell.state);
        }
        bp.layout = Arc::new(CellLayout { positions, metadata });
        bp.variants = vec![VariantSet::new(bp.layout.clone(), states)];
        bp
    }

    /// Adds an index-aligned alternative variant.
    ///
    /// # Panics
    ///
    /// Panics if `states` does not match the layout length.
    pub fn push_variant(&mut self, states: Vec<CellState>) {
        self.variants.push(VariantSet::new(self.layout.clone(), states));
    }

    pub fn push_entity(&mut self, entity: EntityRecord) {
        self.entities.push(entity);
    }

    /// Index-aligned per-variant palettes plus the cell -> palette-slot map,
    /// in first-appearance order. Used by the codec.
    ///
    /// Two cells share a slot only when they agree in *every* variant, so a
    /// first palette may carry duplicate entries where later variants
    /// diverge; collapsing on the first variant alone would lose those.
    pub(crate) fn encoding_palettes(&self) -> (Vec<Vec<CellState>>, HashMap<usize, usize>) {
        let mut palettes: Vec<Vec<CellState>> = vec![Vec::new(); self.variants.len()];
        let mut index_of: HashMap<Vec<CellState>, usize> = HashMap::new();
        let mut cell_to_palette = HashMap::new();
        for i in 0..self.layout.len() {
            let combo: Vec<CellState> = self
                .variants
                .iter()
                .map(|variant| variant.state(i).clone())
                .collect();
            let next = palettes.first().map_or(0, Vec::len);
            let idx = *index_of.entry(combo.clone()).or_insert_with(|| {
                for (palette, state) in palettes.iter_mut().zip(combo) {
                    palette.push(state);
                }
                next
            });
            cell_to_palette.insert(i, idx);
        }
        (palettes, cell_to_palette)
    }
}
