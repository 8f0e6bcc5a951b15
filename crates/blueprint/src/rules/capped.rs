//! Capped rule: bounds how many cells a delegate rule may change.

use std::sync::Arc;

use glam::IVec3;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use crate::options::PlacementOptions;
use crate::record::CellRecord;
use crate::seeded;
use crate::tag::Tag;
use crate::world::WorldReader;

use super::{PlacementRule, RuleConfigError, RuleRegistry};

pub const NAME: &str = "capped";

/// Sampled change budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntProvider {
    Constant(i32),
    /// Inclusive range.
    Uniform { min: i32, max: i32 },
}

impl IntProvider {
    pub fn sample(self, rng: &mut ChaCha8Rng) -> i32 {
        match self {
            IntProvider::Constant(v) => v,
            IntProvider::Uniform { min, max } => {
                if min >= max {
                    min
                } else {
                    rng.gen_range(min..=max)
                }
            }
        }
    }
}

/// Wraps a delegate and applies it to at most `limit` cells per batch,
/// visited in a deterministic shuffled order.
pub struct CappedRule {
    delegate: Arc<dyn PlacementRule>,
    limit: IntProvider,
}

impl CappedRule {
    pub fn new(delegate: Arc<dyn PlacementRule>, limit: IntProvider) -> CappedRule {
        CappedRule { delegate, limit }
    }
}

impl PlacementRule for CappedRule {
    fn name(&self) -> &'static str {
        NAME
    }

    /// Per-cell pass-through; all work happens in the batch pass.
    fn apply(
        &self,
        _world: &dyn WorldReader,
        _offset: IVec3,
        _anchor: IVec3,
        _original: &CellRecord,
        candidate: CellRecord,
        _options: &PlacementOptions,
    ) -> Option<CellRecord> {
        Some(candidate)
    }

    fn finalize(
        &self,
        world: &dyn WorldReader,
        offset: IVec3,
        anchor: IVec3,
        originals: &[CellRecord],
        mut processed: Vec<CellRecord>,
        options: &PlacementOptions,
    ) -> Vec<CellRecord> {
        if originals.len() != processed.len() {
            warn!(
                originals = originals.len(),
                processed = processed.len(),
                "capped rule batch lists out of step; leaving batch unmodified"
            );
            return processed;
        }
        let mut rng = seeded::rng_at(world.seed(), offset);
        let cap = self.limit.sample(&mut rng).min(processed.len() as i32);
        if cap < 1 {
            return processed;
        }
        let mut order: Vec<usize> = (0..processed.len()).collect();
        order.shuffle(&mut rng);

        let mut changed = 0;
        for index in order {
            if changed >= cap {
                break;
            }
            let out = self.delegate.apply(
                world,
                offset,
                anchor,
                &originals[index],
                processed[index].clone(),
                options,
            );
            if let Some(out) = out {
                if out != processed[index] {
                    processed[index] = out;
                    changed += 1;
                }
            }
        }
        processed
    }
}

pub(super) fn from_tag(
    registry: &RuleRegistry,
    settings: &Tag,
) -> Result<Arc<dyn PlacementRule>, RuleConfigError> {
    let limit_tag = settings
        .get("limit")
        .ok_or_else(|| RuleConfigError::bad(NAME, "missing limit"))?;
    let limit = match limit_tag.get_str("type") {
        Some("constant") => IntProvider::Constant(
            limit_tag
                .get_int("value")
                .ok_or_else(|| RuleConfigError::bad(NAME, "constant limit missing value"))?,
        ),
        Some("uniform") => IntProvider::Uniform {
            min: limit_tag.get_int("min").unwrap_or(0),
            max: limit_tag
                .get_int("max")
                .ok_or_else(|| RuleConfigError::bad(NAME, "uniform limit missing max"))?,
        },
        _ => return Err(RuleConfigError::bad(NAME, "unknown limit type")),
    };
    let delegate_tag = settings
        .get("delegate")
        .ok_or_else(|| RuleConfigError::bad(NAME, "missing delegate"))?;
    let delegate = registry.create_from_tag(delegate_tag)?;
    Ok(Arc::new(CappedRule::new(delegate, limit)))
}
