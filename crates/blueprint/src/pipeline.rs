//! Runs every cell of a variant through the placement rules.

use glam::IVec3;

use crate::geom::transform_point;
use crate::options::PlacementOptions;
use crate::record::CellRecord;
use crate::world::WorldReader;

/// Transforms each cell into world space and feeds it through the rule
/// pipeline in order; a `None` from any rule drops the cell. Afterwards every
/// rule gets its batch `finalize` pass over the aligned survivor lists.
pub fn process_cells<W: WorldReader>(
    world: &W,
    offset: IVec3,
    anchor: IVec3,
    cells: impl Iterator<Item = CellRecord>,
    options: &PlacementOptions,
) -> Vec<CellRecord> {
    let mut originals = Vec::new();
    let mut processed = Vec::new();

    for original in cells {
        let world_pos =
            transform_point(original.pos, options.mirror, options.rotation, options.pivot) + offset;
        let mut candidate = Some(original.at(world_pos));
        for rule in &options.rules {
            let Some(current) = candidate.take() else {
                break;
            };
            candidate = rule.apply(world, offset, anchor, &original, current, options);
        }
        if let Some(done) = candidate {
            processed.push(done);
            originals.push(original);
        }
    }

    for rule in &options.rules {
        processed = rule.finalize(world, offset, anchor, &originals, processed, options);
    }
    processed
}
