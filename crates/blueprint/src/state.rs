//! Cell states: a block-type name plus a sorted property map.
//!
//! The engine does not carry a block registry; everything it needs to know
//! about a state (collision shape, fluid behavior, side connections, facing)
//! is derived from the name and properties. Names use the same conventions
//! as the serialized palette entries: `stone`, `stone_stairs`, `oak_fence`,
//! `water`, and so on.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geom::{Direction, Mirror, Rotation};

/// The empty state substituted for unknown palette indices.
pub const AIR: &str = "air";
/// Linkage-marker state carrying structure-composition metadata.
pub const CONNECTOR: &str = "connector";
/// Sentinel a connector may resolve to, meaning "delete this cell".
pub const STRUCTURE_VOID: &str = "structure_void";
/// Neutral placeholder pre-stamped under metadata-bearing cells.
pub const BARRIER: &str = "barrier";

/// Collision shape classes derived from the state name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellShape {
    /// Occupies the whole cell.
    Full,
    /// Solid but not a full cube (stairs, slabs, walls, fences, panes).
    Partial,
    /// No collision (air, fluids, markers).
    Empty,
}

#[derive(Debug, Error)]
pub enum StateParseError {
    #[error("empty state spec")]
    Empty,
    #[error("unterminated property list in {0:?}")]
    Unterminated(String),
    #[error("malformed property {property:?} in {spec:?}")]
    BadProperty { spec: String, property: String },
}

/// One voxel's type and properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellState {
    name: String,
    properties: BTreeMap<String, String>,
}

impl CellState {
    pub fn of(name: impl Into<String>) -> CellState {
        CellState {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn air() -> CellState {
        CellState::of(AIR)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn is_air(&self) -> bool {
        self.name == AIR
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> CellState {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    // -- fluid model --------------------------------------------------------

    /// True for source fluids (`water`, `lava`).
    pub fn is_fluid_source(&self) -> bool {
        matches!(self.name.as_str(), "water" | "lava")
    }

    pub fn is_fluid(&self) -> bool {
        self.is_fluid_source() || matches!(self.name.as_str(), "flowing_water" | "flowing_lava")
    }

    /// The source state of this fluid (`flowing_water` -> `water`).
    pub fn fluid_source(&self) -> Option<CellState> {
        match self.name.as_str() {
            "water" | "flowing_water" => Some(CellState::of("water")),
            "lava" | "flowing_lava" => Some(CellState::of("lava")),
            _ => None,
        }
    }

    /// States with a `waterlogged` property can hold a fluid in-place.
    pub fn is_fluid_container(&self) -> bool {
        self.has_property("waterlogged")
    }

    pub fn is_waterlogged(&self) -> bool {
        self.property("waterlogged") == Some("true")
    }

    // -- shape model --------------------------------------------------------

    pub fn shape(&self) -> CellShape {
        if self.is_air() || self.is_fluid() || matches!(self.name.as_str(), CONNECTOR | STRUCTURE_VOID)
        {
            return CellShape::Empty;
        }
        const PARTIAL_SUFFIXES: [&str; 5] = ["_stairs", "_slab", "_wall", "_fence", "_pane"];
        if PARTIAL_SUFFIXES.iter().any(|s| self.name.ends_with(s)) {
            CellShape::Partial
        } else {
            CellShape::Full
        }
    }

    pub fn is_full_cube(&self) -> bool {
        self.shape() == CellShape::Full
    }

    /// Walls, fences and panes grow/shrink side arms against neighbors.
    pub fn is_connecting(&self) -> bool {
        ["_wall", "_fence", "_pane"]
            .iter()
            .any(|s| self.name.ends_with(s))
    }

    // -- transforms ---------------------------------------------------------

    /// Rotates directional properties (`facing`, lateral `axis`, and the four
    /// side-connection booleans) in place on a copy.
    pub fn rotate(&self, rotation: Rotation) -> CellState {
        self.map_directions(|d| rotation.rotate_direction(d), rotation)
    }

    /// Mirrors directional properties on a copy.
    pub fn mirror(&self, mirror: Mirror) -> CellState {
        self.map_directions(|d| mirror.mirror_direction(d), Rotation::None)
    }

    fn map_directions(
        &self,
        remap: impl Fn(Direction) -> Direction,
        rotation: Rotation,
    ) -> CellState {
        let mut out = self.clone();
        if let Some(dir) = self.property("facing").and_then(Direction::from_name) {
            out.set_property("facing", remap(dir).name());
        }
        if matches!(rotation, Rotation::Cw90 | Rotation::Ccw90) {
            match self.property("axis") {
                Some("x") => out.set_property("axis", "z"),
                Some("z") => out.set_property("axis", "x"),
                _ => {}
            }
        }
        // Side-connection booleans move as a set so a rotation cannot read
        // its own partially-updated output.
        if Direction::LATERAL.iter().any(|d| self.has_property(d.name())) {
            for dir in Direction::LATERAL {
                out.properties.remove(dir.name());
            }
            for dir in Direction::LATERAL {
                if let Some(value) = self.property(dir.name()) {
                    out.set_property(remap(dir).name(), value.to_string());
                }
            }
        }
        out
    }

    /// Recomputes this state's connection toward `dir` given the neighbor
    /// there. Non-connecting shapes are returned unchanged.
    pub fn reconcile(&self, dir: Direction, neighbor: &CellState) -> CellState {
        if !self.is_connecting() || dir.is_vertical() {
            return self.clone();
        }
        let connects = neighbor.is_full_cube() || neighbor.name == self.name;
        self.clone()
            .with_property(dir.name(), if connects { "true" } else { "false" })
    }

    // -- spec string form ---------------------------------------------------

    /// Parses `name[key=value,key=value]` (the `final_state` syntax).
    pub fn parse(spec: &str) -> Result<CellState, StateParseError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(StateParseError::Empty);
        }
        let Some(open) = spec.find('[') else {
            return Ok(CellState::of(spec));
        };
        if !spec.ends_with(']') {
            return Err(StateParseError::Unterminated(spec.to_string()));
        }
        let mut state = CellState::of(&spec[..open]);
        let body = &spec[open + 1..spec.len() - 1];
        if body.is_empty() {
            return Ok(state);
        }
        for part in body.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                return Err(StateParseError::BadProperty {
                    spec: spec.to_string(),
                    property: part.to_string(),
                });
            };
            state.set_property(key.trim(), value.trim());
        }
        Ok(state)
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.properties.is_empty() {
            let props: Vec<String> = self
                .properties
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            write!(f, "[{}]", props.join(","))?;
        }
        Ok(())
    }
}
