//! In-memory world backing for unit tests.

use std::collections::HashMap;

use glam::IVec3;

use crate::geom::BoundingBox;
use crate::record::EntityRecord;
use crate::state::CellState;
use crate::tag::Tag;
use crate::world::{HeightmapKind, WorldAccess, WorldReader};

/// Hash-map world: air everywhere, heights and cells set explicitly, every
/// mutation recorded for assertions.
#[derive(Default)]
pub struct TestWorld {
    cells: HashMap<IVec3, CellState>,
    metadata: HashMap<IVec3, Tag>,
    heights: HashMap<(i32, i32, HeightmapKind), i32>,
    world_entities: Vec<EntityRecord>,
    seed: i64,
    /// Positions where `set_cell` reports failure.
    pub reject_writes: Vec<IVec3>,
    /// Every `(pos, state)` write that succeeded, in order.
    pub writes: Vec<(IVec3, CellState)>,
    /// Entities handed to the world, with their finalize flag.
    pub spawned: Vec<(EntityRecord, bool)>,
    /// Positions passed to `notify_update`.
    pub updated: Vec<IVec3>,
    /// Positions whose metadata holder was removed.
    pub cleared_metadata: Vec<IVec3>,
}

impl TestWorld {
    pub fn new() -> TestWorld {
        TestWorld::default()
    }

    pub fn with_seed(seed: i64) -> TestWorld {
        TestWorld {
            seed,
            ..TestWorld::default()
        }
    }

    pub fn put(&mut self, pos: IVec3, state: CellState) {
        self.cells.insert(pos, state);
    }

    pub fn put_metadata(&mut self, pos: IVec3, metadata: Tag) {
        self.metadata.insert(pos, metadata);
    }

    /// Sets the column height for both post-generation heightmap kinds.
    pub fn set_height(&mut self, x: i32, z: i32, height: i32) {
        self.heights
            .insert((x, z, HeightmapKind::WorldSurface), height);
        self.heights.insert((x, z, HeightmapKind::OceanFloor), height);
    }

    pub fn add_entity(&mut self, entity: EntityRecord) {
        self.world_entities.push(entity);
    }
}

impl WorldReader for TestWorld {
    fn cell(&self, pos: IVec3) -> CellState {
        self.cells.get(&pos).cloned().unwrap_or_else(CellState::air)
    }

    fn metadata(&self, pos: IVec3) -> Option<Tag> {
        self.metadata.get(&pos).cloned()
    }

    fn height_at(&self, x: i32, z: i32, kind: HeightmapKind) -> i32 {
        self.heights.get(&(x, z, kind)).copied().unwrap_or(0)
    }

    fn entities_in(&self, bounds: BoundingBox) -> Vec<EntityRecord> {
        self.world_entities
            .iter()
            .filter(|e| bounds.contains(e.cell_pos))
            .cloned()
            .collect()
    }

    fn fully_generated(&self) -> bool {
        true
    }

    fn seed(&self) -> i64 {
        self.seed
    }
}

impl WorldAccess for TestWorld {
    fn set_cell(&mut self, pos: IVec3, state: CellState, _flags: u32) -> bool {
        if self.reject_writes.contains(&pos) {
            return false;
        }
        self.cells.insert(pos, state.clone());
        self.writes.push((pos, state));
        true
    }

    fn set_metadata(&mut self, pos: IVec3, metadata: Tag) {
        self.metadata.insert(pos, metadata);
    }

    fn remove_metadata(&mut self, pos: IVec3) {
        self.metadata.remove(&pos);
        self.cleared_metadata.push(pos);
    }

    fn notify_update(&mut self, pos: IVec3) {
        self.updated.push(pos);
    }

    fn spawn_entity(&mut self, entity: EntityRecord, finalize: bool) {
        self.spawned.push((entity, finalize));
    }
}
