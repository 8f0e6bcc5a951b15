//! Voxel blueprint engine: capture a region of cells into a palette-compressed
//! document, transform it (mirror, rotation, pivot), run it through a
//! configurable placement-rule pipeline, and stamp it back into a world with
//! fluid leveling and boundary shape reconciliation.
//!
//! The world itself stays behind the [`world::WorldReader`] /
//! [`world::WorldAccess`] traits; this crate never owns cell storage.

mod blueprint;
mod codec;
pub mod geom;
mod options;
pub mod pipeline;
mod record;
pub mod rules;
pub mod seeded;
mod state;
pub mod tag;
mod variant;
pub mod world;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
pub mod test_world;

pub use blueprint::Blueprint;
pub use codec::{
    DecodeError, DirectResolver, StateResolver, LEGACY_SCHEMA_VERSION, SCHEMA_VERSION,
};
pub use geom::{BoundingBox, Direction, Mirror, Rotation};
pub use options::PlacementOptions;
pub use record::{CellRecord, ConnectorInfo, EntityRecord, JointType};
pub use state::{
    CellShape, CellState, StateParseError, AIR, BARRIER, CONNECTOR, STRUCTURE_VOID,
};
pub use tag::Tag;
pub use variant::{CellLayout, VariantSet};
