//! Weathering: ages matched materials into cracked and mossy variants.

use std::sync::Arc;

use glam::IVec3;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::geom::Direction;
use crate::options::PlacementOptions;
use crate::record::CellRecord;
use crate::seeded;
use crate::state::CellState;
use crate::tag::Tag;
use crate::world::WorldReader;

use super::{PlacementRule, RuleConfigError, RuleRegistry};

pub const NAME: &str = "weathering";

/// Full-cube materials that weather, with their cracked variant.
const FULL_FAMILIES: [(&str, &str); 2] = [
    ("stone", "cracked_stone"),
    ("stone_bricks", "cracked_stone_bricks"),
];

/// Stairs/slab/wall bases that grow moss.
const MOSSY_BASES: [&str; 2] = ["stone", "stone_bricks"];

/// The one glassy material, weathered at a fixed 15%.
const GLASSY: &str = "crystal";
const GLASSY_WEATHERED: &str = "weathered_crystal";
const GLASSY_CHANCE: f32 = 0.15;

/// Replaces aged-looking variants in proportion to `mossiness`.
pub struct WeatheringRule {
    mossiness: f32,
}

impl WeatheringRule {
    pub fn new(mossiness: f32) -> WeatheringRule {
        WeatheringRule { mossiness }
    }

    fn age_full_block(&self, state: &CellState, rng: &mut rand_chacha::ChaCha8Rng) -> CellState {
        let Some((_, cracked)) = FULL_FAMILIES.iter().find(|(base, _)| state.is(base)) else {
            return state.clone();
        };
        if rng.gen::<f32>() >= 0.5 {
            return state.clone();
        }
        if rng.gen::<f32>() < self.mossiness {
            // Mossy stairs-shaped variant with a random facing.
            let facing = *Direction::LATERAL.choose(rng).unwrap_or(&Direction::North);
            CellState::of(format!("mossy_{}_stairs", state.name()))
                .with_property("facing", facing.name())
                .with_property("half", "bottom")
        } else {
            CellState::of(*cracked)
        }
    }

    fn age_stairs(&self, state: &CellState, rng: &mut rand_chacha::ChaCha8Rng) -> CellState {
        if rng.gen::<f32>() >= 0.5 {
            return state.clone();
        }
        let mut aged = CellState::of(format!("mossy_{}", state.name()));
        for key in ["facing", "half"] {
            if let Some(value) = state.property(key) {
                aged.set_property(key, value.to_string());
            }
        }
        aged
    }

    fn age_partial(&self, state: &CellState, rng: &mut rand_chacha::ChaCha8Rng) -> CellState {
        if rng.gen::<f32>() < self.mossiness {
            let mut aged = CellState::of(format!("mossy_{}", state.name()));
            for (key, value) in state.properties() {
                aged.set_property(key.clone(), value.clone());
            }
            aged
        } else {
            state.clone()
        }
    }

    fn weather(&self, state: &CellState, rng: &mut rand_chacha::ChaCha8Rng) -> CellState {
        let name = state.name();
        if FULL_FAMILIES.iter().any(|(base, _)| name == *base) {
            return self.age_full_block(state, rng);
        }
        if let Some(base) = name.strip_suffix("_stairs") {
            if MOSSY_BASES.contains(&base) {
                return self.age_stairs(state, rng);
            }
        }
        for suffix in ["_slab", "_wall"] {
            if let Some(base) = name.strip_suffix(suffix) {
                if MOSSY_BASES.contains(&base) {
                    return self.age_partial(state, rng);
                }
            }
        }
        if name == GLASSY {
            if rng.gen::<f32>() < GLASSY_CHANCE {
                return CellState::of(GLASSY_WEATHERED);
            }
            return state.clone();
        }
        state.clone()
    }
}

impl PlacementRule for WeatheringRule {
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
        let mut rng = seeded::rng_at(world.seed(), candidate.pos);
        let aged = self.weather(&candidate.state, &mut rng);
        Some(CellRecord::new(candidate.pos, aged, candidate.metadata))
    }
}

pub(super) fn from_tag(
    _registry: &RuleRegistry,
    settings: &Tag,
) -> Result<Arc<dyn PlacementRule>, RuleConfigError> {
    let mossiness = settings
        .get("mossiness")
        .and_then(Tag::as_double)
        .ok_or_else(|| RuleConfigError::bad(NAME, "missing mossiness"))? as f32;
    Ok(Arc::new(WeatheringRule::new(mossiness)))
}
