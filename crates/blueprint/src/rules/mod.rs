//! Placement-time transformation rules.
//!
//! A rule sees each cell once as it is materialized: it can pass it through,
//! replace it, or veto it (`None`). Rules run in pipeline order and the first
//! veto wins. After the per-cell pass, every rule gets one batch-level
//! `finalize` call over the parallel before/after lists.
//!
//! Rules are open-ended: serialized settings name a rule kind, and
//! `RuleRegistry` maps names to factories so new kinds never touch the core.

use std::collections::HashMap;
use std::sync::Arc;

use glam::IVec3;
use thiserror::Error;

use crate::options::PlacementOptions;
use crate::record::CellRecord;
use crate::tag::Tag;
use crate::world::WorldReader;

pub mod capped;
pub mod connector_replace;
pub mod decay;
pub mod gravity;
pub mod rule_list;
pub mod submerged;
pub mod substitution;
pub mod weathering;

pub use capped::{CappedRule, IntProvider};
pub use connector_replace::ConnectorReplaceRule;
pub use decay::DecayRule;
pub use gravity::GravityRule;
pub use rule_list::{MatchRule, PosTest, RuleListRule, StateMatcher};
pub use submerged::SubmergedReplaceRule;
pub use substitution::SubstitutionRule;
pub use weathering::WeatheringRule;

/// One placement-time transformation.
pub trait PlacementRule: Send + Sync {
    /// Registry name of this rule kind.
    fn name(&self) -> &'static str;

    /// Transforms one cell. `original` keeps blueprint-relative coordinates;
    /// `candidate` is in world space. Returning `None` deletes the cell.
    fn apply(
        &self,
        world: &dyn WorldReader,
        offset: IVec3,
        anchor: IVec3,
        original: &CellRecord,
        candidate: CellRecord,
        options: &PlacementOptions,
    ) -> Option<CellRecord>;

    /// Batch hook run once after every cell has been transformed.
    /// `originals` and `processed` are index-aligned survivors. Default no-op.
    fn finalize(
        &self,
        world: &dyn WorldReader,
        offset: IVec3,
        anchor: IVec3,
        originals: &[CellRecord],
        processed: Vec<CellRecord>,
        options: &PlacementOptions,
    ) -> Vec<CellRecord> {
        let _ = (world, offset, anchor, originals, options);
        processed
    }
}

#[derive(Debug, Error)]
pub enum RuleConfigError {
    #[error("unknown rule kind {0:?}")]
    UnknownRule(String),
    #[error("bad settings for rule {rule:?}: {message}")]
    BadSettings {
        rule: &'static str,
        message: String,
    },
}

impl RuleConfigError {
    pub(crate) fn bad(rule: &'static str, message: impl Into<String>) -> RuleConfigError {
        RuleConfigError::BadSettings {
            rule,
            message: message.into(),
        }
    }
}

pub type RuleFactory =
    fn(&RuleRegistry, &Tag) -> Result<Arc<dyn PlacementRule>, RuleConfigError>;

/// Name -> factory table for instantiating rules from serialized settings.
pub struct RuleRegistry {
    factories: HashMap<&'static str, RuleFactory>,
}

impl RuleRegistry {
    /// Empty registry; `Default` carries all built-in rule kinds.
    pub fn empty() -> RuleRegistry {
        RuleRegistry {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &'static str, factory: RuleFactory) {
        self.factories.insert(name, factory);
    }

    /// Instantiates a rule kind from its settings tag.
    pub fn create(
        &self,
        name: &str,
        settings: &Tag,
    ) -> Result<Arc<dyn PlacementRule>, RuleConfigError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RuleConfigError::UnknownRule(name.to_string()))?;
        factory(self, settings)
    }

    /// Instantiates from a `{kind, settings}` compound.
    pub fn create_from_tag(&self, tag: &Tag) -> Result<Arc<dyn PlacementRule>, RuleConfigError> {
        let kind = tag
            .get_str("kind")
            .ok_or_else(|| RuleConfigError::UnknownRule("<missing kind>".to_string()))?;
        let settings = tag.get("settings").cloned().unwrap_or_else(Tag::compound);
        self.create(kind, &settings)
    }
}

impl Default for RuleRegistry {
    fn default() -> RuleRegistry {
        let mut registry = RuleRegistry::empty();
        registry.register(rule_list::NAME, rule_list::from_tag);
        registry.register(weathering::NAME, weathering::from_tag);
        registry.register(decay::NAME, decay::from_tag);
        registry.register(gravity::NAME, gravity::from_tag);
        registry.register(submerged::NAME, submerged::from_tag);
        registry.register(substitution::NAME, substitution::from_tag);
        registry.register(connector_replace::NAME, connector_replace::from_tag);
        registry.register(capped::NAME, capped::from_tag);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_unknown_rule() {
        let registry = RuleRegistry::default();
        assert!(matches!(
            registry.create("no_such_rule", &Tag::compound()),
            Err(RuleConfigError::UnknownRule(_))
        ));
    }

    #[test]
    fn test_registry_creates_builtin() {
        let registry = RuleRegistry::default();
        let mut settings = Tag::compound();
        settings.insert("integrity", Tag::Float(0.5));
        let rule = registry.create(decay::NAME, &settings).unwrap();
        assert_eq!(rule.name(), decay::NAME);
    }

    #[test]
    fn test_create_from_tag_requires_kind() {
        let registry = RuleRegistry::default();
        assert!(registry.create_from_tag(&Tag::compound()).is_err());
    }
}
