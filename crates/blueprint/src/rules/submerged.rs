//! Submerged replace: cells landing in the ambient fluid that cannot seal it
//! off become the fluid itself.

use std::sync::Arc;

use glam::IVec3;

use crate::options::PlacementOptions;
use crate::record::CellRecord;
use crate::state::CellState;
use crate::tag::Tag;
use crate::world::WorldReader;

use super::{PlacementRule, RuleConfigError, RuleRegistry};

pub const NAME: &str = "submerged_replace";

pub struct SubmergedReplaceRule {
    fluid: CellState,
}

impl SubmergedReplaceRule {
    /// `fluid` must be a source fluid state (`water`, `lava`).
    pub fn new(fluid: CellState) -> SubmergedReplaceRule {
        SubmergedReplaceRule { fluid }
    }
}

impl PlacementRule for SubmergedReplaceRule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(
        &self,
        world: &dyn WorldReader,
        _offset: IVec3,
        _anchor: IVec3,
        _original: &CellRecord,
        candidate: CellRecord,
        _options: &PlacementOptions,
    ) -> Option<CellRecord> {
        let existing = world.cell(candidate.pos);
        let in_ambient_fluid = existing.fluid_source().as_ref() == Some(&self.fluid);
        if in_ambient_fluid && !candidate.state.is_full_cube() {
            return Some(CellRecord::new(
                candidate.pos,
                self.fluid.clone(),
                candidate.metadata,
            ));
        }
        Some(candidate)
    }
}

pub(super) fn from_tag(
    _registry: &RuleRegistry,
    settings: &Tag,
) -> Result<Arc<dyn PlacementRule>, RuleConfigError> {
    let fluid = CellState::of(
        settings
            .get_str("fluid")
            .ok_or_else(|| RuleConfigError::bad(NAME, "missing fluid"))?,
    );
    if !fluid.is_fluid_source() {
        return Err(RuleConfigError::bad(NAME, "fluid must be a source fluid"));
    }
    Ok(Arc::new(SubmergedReplaceRule::new(fluid)))
}
