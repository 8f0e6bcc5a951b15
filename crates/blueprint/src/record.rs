//! Value records stored by a blueprint.

use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};

use crate::state::CellState;
use crate::tag::Tag;

/// One voxel of a blueprint: position relative to the blueprint origin, the
/// state to place there, and an optional metadata blob. Records are immutable
/// values; the rule pipeline replaces them rather than mutating them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub pos: IVec3,
    pub state: CellState,
    pub metadata: Option<Tag>,
}

impl CellRecord {
    pub fn new(pos: IVec3, state: CellState, metadata: Option<Tag>) -> CellRecord {
        CellRecord {
            pos,
            state,
            metadata,
        }
    }

    /// Copy with a different position.
    pub fn at(&self, pos: IVec3) -> CellRecord {
        CellRecord {
            pos,
            state: self.state.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// A captured entity: exact float position, the cell it occupied, and its
/// serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub float_pos: DVec3,
    pub cell_pos: IVec3,
    pub metadata: Tag,
}

/// How a connector joint behaves when two structure pieces meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum JointType {
    #[default]
    Rollable,
    Aligned,
}

impl JointType {
    pub fn name(self) -> &'static str {
        match self {
            JointType::Rollable => "rollable",
            JointType::Aligned => "aligned",
        }
    }

    pub fn from_name(name: &str) -> Option<JointType> {
        match name {
            "rollable" => Some(JointType::Rollable),
            "aligned" => Some(JointType::Aligned),
            _ => None,
        }
    }
}

/// Structure-composition info derived from a connector cell's metadata.
/// Never stored; recomputed from the cell on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorInfo {
    pub cell: CellRecord,
    pub joint: JointType,
    pub name: String,
    pub pool: String,
    pub target: String,
    pub placement_priority: i32,
    pub selection_priority: i32,
}

impl ConnectorInfo {
    /// Builds connector info from a linkage-marker cell. Missing fields fall
    /// back to defaults; cells without metadata yield `None`.
    pub fn from_cell(cell: &CellRecord) -> Option<ConnectorInfo> {
        let meta = cell.metadata.as_ref()?;
        Some(ConnectorInfo {
            joint: meta
                .get_str("joint")
                .and_then(JointType::from_name)
                .unwrap_or_default(),
            name: meta.get_str("name").unwrap_or("empty").to_string(),
            pool: meta.get_str("pool").unwrap_or("empty").to_string(),
            target: meta.get_str("target").unwrap_or("empty").to_string(),
            placement_priority: meta.get_int("placement_priority").unwrap_or(0),
            selection_priority: meta.get_int("selection_priority").unwrap_or(0),
            cell: cell.clone(),
        })
    }
}
