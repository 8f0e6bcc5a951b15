//! Connector resolution: swaps linkage-marker cells for the state recorded in
//! their metadata once structure composition has decided it.

use std::sync::Arc;

use glam::IVec3;
use tracing::warn;

use crate::options::PlacementOptions;
use crate::record::CellRecord;
use crate::state::{CellState, CONNECTOR, STRUCTURE_VOID};
use crate::tag::Tag;
use crate::world::WorldReader;

use super::{PlacementRule, RuleConfigError, RuleRegistry};

pub const NAME: &str = "connector_replace";

#[derive(Default)]
pub struct ConnectorReplaceRule;

impl PlacementRule for ConnectorReplaceRule {
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
        if !candidate.state.is(CONNECTOR) {
            return Some(candidate);
        }
        let Some(spec) = candidate
            .metadata
            .as_ref()
            .and_then(|meta| meta.get_str("final_state"))
        else {
            warn!(pos = ?candidate.pos, "connector cell has no final_state; dropping");
            return None;
        };
        let state = match CellState::parse(spec) {
            Ok(state) => state,
            Err(error) => {
                warn!(
                    pos = ?candidate.pos,
                    spec,
                    %error,
                    "connector final_state failed to parse; dropping cell"
                );
                return None;
            }
        };
        if state.is(STRUCTURE_VOID) {
            return None;
        }
        Some(CellRecord::new(candidate.pos, state, None))
    }
}

pub(super) fn from_tag(
    _registry: &RuleRegistry,
    _settings: &Tag,
) -> Result<Arc<dyn PlacementRule>, RuleConfigError> {
    Ok(Arc::new(ConnectorReplaceRule))
}
