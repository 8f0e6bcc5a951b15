//! Interfaces onto the live world a blueprint is captured from or placed
//! into. The engine never touches storage directly; everything goes through
//! these traits so callers can back them with chunks, tests with a hash map.

use glam::IVec3;

use crate::geom::BoundingBox;
use crate::record::EntityRecord;
use crate::state::CellState;
use crate::tag::Tag;

/// Cell-update flags passed through to `set_cell`.
pub mod update_flags {
    /// Propagate the change to neighboring cells.
    pub const NOTIFY_NEIGHBORS: u32 = 1 << 0;
    /// Sync the change to observers/clients.
    pub const SYNC_CLIENTS: u32 = 1 << 1;
    /// Suppress automatic shape reconciliation at the write site.
    pub const KEEP_SHAPE: u32 = 1 << 4;

    pub const DEFAULT: u32 = NOTIFY_NEIGHBORS | SYNC_CLIENTS;
}

/// Which surface a heightmap query measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeightmapKind {
    /// Highest non-air cell, final world.
    WorldSurface,
    /// Highest non-air cell as known mid-generation.
    WorldSurfaceDuringGen,
    /// Highest solid cell below fluids, final world.
    OceanFloor,
    /// Same, mid-generation.
    OceanFloorDuringGen,
}

impl HeightmapKind {
    /// The finished-world equivalent of a during-generation kind.
    pub fn post_generation(self) -> HeightmapKind {
        match self {
            HeightmapKind::WorldSurfaceDuringGen => HeightmapKind::WorldSurface,
            HeightmapKind::OceanFloorDuringGen => HeightmapKind::OceanFloor,
            other => other,
        }
    }
}

/// Read-only world view used during capture and rule evaluation.
pub trait WorldReader {
    fn cell(&self, pos: IVec3) -> CellState;

    /// Metadata blob attached to the cell, if any.
    fn metadata(&self, pos: IVec3) -> Option<Tag>;

    /// Height of the given surface kind at a column.
    fn height_at(&self, x: i32, z: i32, kind: HeightmapKind) -> i32;

    /// Entities whose cell position lies in the box.
    fn entities_in(&self, bounds: BoundingBox) -> Vec<EntityRecord>;

    /// True once generation has finished for the target region; gravity
    /// snapping switches to post-generation heightmaps when it has.
    fn fully_generated(&self) -> bool;

    /// The world seed, used to derive deterministic per-placement streams.
    fn seed(&self) -> i64;
}

/// Mutable world view used during placement.
pub trait WorldAccess: WorldReader {
    /// Writes a cell. Returns false if the world rejected the write.
    fn set_cell(&mut self, pos: IVec3, state: CellState, flags: u32) -> bool;

    /// Stamps metadata onto the cell's holder and marks it dirty.
    fn set_metadata(&mut self, pos: IVec3, metadata: Tag);

    /// Drops any metadata holder at the cell.
    fn remove_metadata(&mut self, pos: IVec3);

    /// Tells the world a cell changed without rewriting it.
    fn notify_update(&mut self, pos: IVec3);

    /// Hands a materialized entity to the world. `finalize` requests the
    /// post-spawn finalize hook.
    fn spawn_entity(&mut self, entity: EntityRecord, finalize: bool);
}
