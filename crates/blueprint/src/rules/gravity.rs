//! Gravity snap: re-bases each cell's Y on the target column's surface.

use std::sync::Arc;

use glam::IVec3;

use crate::options::PlacementOptions;
use crate::record::CellRecord;
use crate::tag::Tag;
use crate::world::{HeightmapKind, WorldReader};

use super::{PlacementRule, RuleConfigError, RuleRegistry};

pub const NAME: &str = "gravity";

pub struct GravityRule {
    heightmap: HeightmapKind,
    offset: i32,
}

impl GravityRule {
    pub fn new(heightmap: HeightmapKind, offset: i32) -> GravityRule {
        GravityRule { heightmap, offset }
    }
}

impl PlacementRule for GravityRule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(
        &self,
        world: &dyn WorldReader,
        _offset: IVec3,
        _anchor: IVec3,
        original: &CellRecord,
        candidate: CellRecord,
        _options: &PlacementOptions,
    ) -> Option<CellRecord> {
        let kind = if world.fully_generated() {
            self.heightmap.post_generation()
        } else {
            self.heightmap
        };
        let ground = world.height_at(candidate.pos.x, candidate.pos.z, kind);
        let y = ground + self.offset + original.pos.y;
        Some(candidate.at(IVec3::new(candidate.pos.x, y, candidate.pos.z)))
    }
}

fn heightmap_from_name(name: &str) -> Option<HeightmapKind> {
    match name {
        "world_surface" => Some(HeightmapKind::WorldSurface),
        "world_surface_wg" => Some(HeightmapKind::WorldSurfaceDuringGen),
        "ocean_floor" => Some(HeightmapKind::OceanFloor),
        "ocean_floor_wg" => Some(HeightmapKind::OceanFloorDuringGen),
        _ => None,
    }
}

pub(super) fn from_tag(
    _registry: &RuleRegistry,
    settings: &Tag,
) -> Result<Arc<dyn PlacementRule>, RuleConfigError> {
    let heightmap = settings
        .get_str("heightmap")
        .and_then(heightmap_from_name)
        .ok_or_else(|| RuleConfigError::bad(NAME, "missing or unknown heightmap"))?;
    let offset = settings.get_int("offset").unwrap_or(0);
    Ok(Arc::new(GravityRule::new(heightmap, offset)))
}
