//! Integrity decay: deletes cells with probability `1 - integrity`.

use std::collections::HashSet;
use std::sync::Arc;

use glam::IVec3;
use rand::Rng;

use crate::options::PlacementOptions;
use crate::record::CellRecord;
use crate::seeded;
use crate::tag::Tag;
use crate::world::WorldReader;

use super::{PlacementRule, RuleConfigError, RuleRegistry};

pub const NAME: &str = "decay";

pub struct DecayRule {
    integrity: f32,
    /// State names the rule applies to; `None` means all.
    allow: Option<HashSet<String>>,
}

impl DecayRule {
    pub fn new(integrity: f32) -> DecayRule {
        DecayRule {
            integrity,
            allow: None,
        }
    }

    pub fn with_allow(mut self, names: impl IntoIterator<Item = String>) -> DecayRule {
        self.allow = Some(names.into_iter().collect());
        self
    }
}

impl PlacementRule for DecayRule {
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
        if let Some(allow) = &self.allow {
            if !allow.contains(candidate.state.name()) {
                return Some(candidate);
            }
        }
        let mut rng = seeded::rng_at(world.seed(), candidate.pos);
        if rng.gen::<f32>() <= self.integrity {
            Some(candidate)
        } else {
            None
        }
    }
}

pub(super) fn from_tag(
    _registry: &RuleRegistry,
    settings: &Tag,
) -> Result<Arc<dyn PlacementRule>, RuleConfigError> {
    let integrity = settings
        .get("integrity")
        .and_then(Tag::as_double)
        .ok_or_else(|| RuleConfigError::bad(NAME, "missing integrity"))? as f32;
    let mut rule = DecayRule::new(integrity);
    if let Some(allow) = settings.get_list("allow") {
        let names: Result<Vec<String>, _> = allow
            .iter()
            .map(|t| {
                t.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| RuleConfigError::bad(NAME, "allow entries must be strings"))
            })
            .collect();
        rule = rule.with_allow(names?);
    }
    Ok(Arc::new(rule))
}
