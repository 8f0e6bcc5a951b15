//! Static substitution: table-driven block type swap that keeps shared
//! directional properties.

use std::collections::HashMap;
use std::sync::Arc;

use glam::IVec3;

use crate::options::PlacementOptions;
use crate::record::CellRecord;
use crate::state::CellState;
use crate::tag::Tag;
use crate::world::WorldReader;

use super::{PlacementRule, RuleConfigError, RuleRegistry};

pub const NAME: &str = "substitution";

/// Properties carried over when both source and replacement define them.
const SHARED_PROPERTIES: [&str; 4] = ["facing", "half", "type", "waterlogged"];

pub struct SubstitutionRule {
    table: HashMap<String, String>,
}

impl SubstitutionRule {
    pub fn new(table: HashMap<String, String>) -> SubstitutionRule {
        SubstitutionRule { table }
    }
}

impl PlacementRule for SubstitutionRule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(
        &self,
        _world: &dyn WorldReader,
        _offset: IVec3,
        _anchor: IVec3,
        _original: &CellRecord,
        candidate: CellRecord,
        _options: &PlacementOptions,
    ) -> Option<CellRecord> {
        let Some(replacement) = self.table.get(candidate.state.name()) else {
            return Some(candidate);
        };
        let mut state = CellState::of(replacement.clone());
        for key in SHARED_PROPERTIES {
            if let Some(value) = candidate.state.property(key) {
                state.set_property(key, value.to_string());
            }
        }
        Some(CellRecord::new(candidate.pos, state, candidate.metadata))
    }
}

pub(super) fn from_tag(
    _registry: &RuleRegistry,
    settings: &Tag,
) -> Result<Arc<dyn PlacementRule>, RuleConfigError> {
    let table_tag = settings
        .get("table")
        .and_then(Tag::as_compound)
        .ok_or_else(|| RuleConfigError::bad(NAME, "missing table compound"))?;
    let mut table = HashMap::new();
    for (from, to) in table_tag {
        let to = to
            .as_str()
            .ok_or_else(|| RuleConfigError::bad(NAME, "table values must be strings"))?;
        table.insert(from.clone(), to.to_string());
    }
    Ok(Arc::new(SubstitutionRule::new(table)))
}
