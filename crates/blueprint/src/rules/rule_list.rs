//! First-match rule list: the general-purpose "if state looks like X here,
//! emit Y" rewriter.

use std::sync::Arc;

use glam::IVec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::options::PlacementOptions;
use crate::record::CellRecord;
use crate::seeded;
use crate::state::CellState;
use crate::tag::Tag;
use crate::world::WorldReader;

use super::{PlacementRule, RuleConfigError, RuleRegistry};

pub const NAME: &str = "rule_list";

/// Callback producing the output metadata for a matched rule.
pub type MetadataFn = Arc<dyn Fn(&mut ChaCha8Rng, Option<&Tag>) -> Option<Tag> + Send + Sync>;

/// Predicate over a cell state.
#[derive(Clone)]
pub enum StateMatcher {
    Always,
    Never,
    /// Matches on state name only.
    Name(String),
    /// Matches the full state, properties included.
    Exact(CellState),
    /// Matches the name with the given probability per evaluation.
    RandomName { name: String, probability: f32 },
}

impl StateMatcher {
    pub fn test(&self, state: &CellState, rng: &mut ChaCha8Rng) -> bool {
        match self {
            StateMatcher::Always => true,
            StateMatcher::Never => false,
            StateMatcher::Name(name) => state.is(name),
            StateMatcher::Exact(expected) => state == expected,
            StateMatcher::RandomName { name, probability } => {
                state.is(name) && rng.gen::<f32>() < *probability
            }
        }
    }
}

/// Axis selector for the axis-aligned position test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn component(self, v: IVec3) -> i32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    fn from_name(name: &str) -> Option<Axis> {
        match name {
            "x" => Some(Axis::X),
            "y" => Some(Axis::Y),
            "z" => Some(Axis::Z),
            _ => None,
        }
    }
}

/// Predicate over a cell's position relative to the placement anchor.
#[derive(Clone)]
pub enum PosTest {
    Always,
    /// Fires with probability lerped from `min_chance` at `min_dist` to
    /// `max_chance` at `max_dist`, over Manhattan distance to the anchor.
    Linear {
        min_chance: f32,
        max_chance: f32,
        min_dist: i32,
        max_dist: i32,
    },
    /// Same, but distance is the offset along one axis only.
    AxisAlignedLinear {
        axis: Axis,
        min_chance: f32,
        max_chance: f32,
        min_dist: i32,
        max_dist: i32,
    },
}

impl PosTest {
    pub fn test(&self, _local: IVec3, world: IVec3, anchor: IVec3, rng: &mut ChaCha8Rng) -> bool {
        let chance = match self {
            PosTest::Always => return true,
            PosTest::Linear {
                min_chance,
                max_chance,
                min_dist,
                max_dist,
            } => {
                let d = world - anchor;
                let dist = d.x.abs() + d.y.abs() + d.z.abs();
                lerp_chance(dist, *min_dist, *max_dist, *min_chance, *max_chance)
            }
            PosTest::AxisAlignedLinear {
                axis,
                min_chance,
                max_chance,
                min_dist,
                max_dist,
            } => {
                let dist = axis.component(world - anchor).abs();
                lerp_chance(dist, *min_dist, *max_dist, *min_chance, *max_chance)
            }
        };
        rng.gen::<f32>() < chance
    }
}

fn lerp_chance(dist: i32, min_dist: i32, max_dist: i32, min_chance: f32, max_chance: f32) -> f32 {
    if max_dist <= min_dist {
        return max_chance;
    }
    let t = (dist - min_dist) as f32 / (max_dist - min_dist) as f32;
    min_chance + t.clamp(0.0, 1.0) * (max_chance - min_chance)
}

/// One `(input, location, position) -> output` rewrite rule.
#[derive(Clone)]
pub struct MatchRule {
    pub input_test: StateMatcher,
    pub location_test: StateMatcher,
    pub position_test: PosTest,
    pub output: CellState,
    pub output_metadata: Option<MetadataFn>,
}

impl MatchRule {
    pub fn new(input_test: StateMatcher, output: CellState) -> MatchRule {
        MatchRule {
            input_test,
            location_test: StateMatcher::Always,
            position_test: PosTest::Always,
            output,
            output_metadata: None,
        }
    }

    fn matches(
        &self,
        original_state: &CellState,
        world_state: &CellState,
        local: IVec3,
        world_pos: IVec3,
        anchor: IVec3,
        rng: &mut ChaCha8Rng,
    ) -> bool {
        self.input_test.test(original_state, rng)
            && self.location_test.test(world_state, rng)
            && self.position_test.test(local, world_pos, anchor, rng)
    }
}

/// Ordered first-match list of `MatchRule`s.
pub struct RuleListRule {
    rules: Vec<MatchRule>,
}

impl RuleListRule {
    pub fn new(rules: Vec<MatchRule>) -> RuleListRule {
        RuleListRule { rules }
    }
}

impl PlacementRule for RuleListRule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(
        &self,
        world: &dyn WorldReader,
        _offset: IVec3,
        anchor: IVec3,
        original: &CellRecord,
        candidate: CellRecord,
        _options: &PlacementOptions,
    ) -> Option<CellRecord> {
        let mut rng = seeded::rng_at(world.seed(), candidate.pos);
        let world_state = world.cell(candidate.pos);
        for rule in &self.rules {
            if rule.matches(
                &original.state,
                &world_state,
                original.pos,
                candidate.pos,
                anchor,
                &mut rng,
            ) {
                let metadata = match &rule.output_metadata {
                    Some(f) => f(&mut rng, original.metadata.as_ref()),
                    None => candidate.metadata,
                };
                return Some(CellRecord::new(candidate.pos, rule.output.clone(), metadata));
            }
        }
        Some(candidate)
    }
}

fn matcher_from_tag(tag: Option<&Tag>) -> Result<StateMatcher, RuleConfigError> {
    let Some(tag) = tag else {
        return Ok(StateMatcher::Always);
    };
    let kind = tag
        .get_str("type")
        .ok_or_else(|| RuleConfigError::bad(NAME, "matcher missing type"))?;
    match kind {
        "always" => Ok(StateMatcher::Always),
        "never" => Ok(StateMatcher::Never),
        "name" => Ok(StateMatcher::Name(
            tag.get_str("name")
                .ok_or_else(|| RuleConfigError::bad(NAME, "name matcher missing name"))?
                .to_string(),
        )),
        "exact" => {
            let spec = tag
                .get_str("state")
                .ok_or_else(|| RuleConfigError::bad(NAME, "exact matcher missing state"))?;
            CellState::parse(spec)
                .map(StateMatcher::Exact)
                .map_err(|e| RuleConfigError::bad(NAME, e.to_string()))
        }
        "random_name" => Ok(StateMatcher::RandomName {
            name: tag
                .get_str("name")
                .ok_or_else(|| RuleConfigError::bad(NAME, "random_name matcher missing name"))?
                .to_string(),
            probability: tag
                .get("probability")
                .and_then(Tag::as_double)
                .unwrap_or(1.0) as f32,
        }),
        other => Err(RuleConfigError::bad(
            NAME,
            format!("unknown matcher type {other:?}"),
        )),
    }
}

fn pos_test_from_tag(tag: Option<&Tag>) -> Result<PosTest, RuleConfigError> {
    let Some(tag) = tag else {
        return Ok(PosTest::Always);
    };
    let kind = tag
        .get_str("type")
        .ok_or_else(|| RuleConfigError::bad(NAME, "position test missing type"))?;
    let chance = |key: &str, default: f64| tag.get(key).and_then(Tag::as_double).unwrap_or(default);
    let dist = |key: &str, default: i32| tag.get_int(key).unwrap_or(default);
    match kind {
        "always" => Ok(PosTest::Always),
        "linear" => Ok(PosTest::Linear {
            min_chance: chance("min_chance", 0.0) as f32,
            max_chance: chance("max_chance", 1.0) as f32,
            min_dist: dist("min_dist", 0),
            max_dist: dist("max_dist", 0),
        }),
        "axis_linear" => Ok(PosTest::AxisAlignedLinear {
            axis: tag
                .get_str("axis")
                .and_then(Axis::from_name)
                .ok_or_else(|| RuleConfigError::bad(NAME, "axis_linear needs axis x/y/z"))?,
            min_chance: chance("min_chance", 0.0) as f32,
            max_chance: chance("max_chance", 1.0) as f32,
            min_dist: dist("min_dist", 0),
            max_dist: dist("max_dist", 0),
        }),
        other => Err(RuleConfigError::bad(
            NAME,
            format!("unknown position test type {other:?}"),
        )),
    }
}

pub(super) fn from_tag(
    _registry: &RuleRegistry,
    settings: &Tag,
) -> Result<Arc<dyn PlacementRule>, RuleConfigError> {
    let entries = settings
        .get_list("rules")
        .ok_or_else(|| RuleConfigError::bad(NAME, "missing rules list"))?;
    let mut rules = Vec::with_capacity(entries.len());
    for entry in entries {
        let output_spec = entry
            .get_str("output")
            .ok_or_else(|| RuleConfigError::bad(NAME, "rule missing output"))?;
        let output =
            CellState::parse(output_spec).map_err(|e| RuleConfigError::bad(NAME, e.to_string()))?;
        let output_metadata: Option<MetadataFn> = entry.get("output_metadata").map(|constant| {
            let constant = constant.clone();
            Arc::new(move |_: &mut ChaCha8Rng, _: Option<&Tag>| Some(constant.clone())) as MetadataFn
        });
        rules.push(MatchRule {
            input_test: matcher_from_tag(entry.get("input"))?,
            location_test: matcher_from_tag(entry.get("location"))?,
            position_test: pos_test_from_tag(entry.get("position"))?,
            output,
            output_metadata,
        });
    }
    Ok(Arc::new(RuleListRule::new(rules)))
}
