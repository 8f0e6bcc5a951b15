//! Variant sets: alternative layouts over one shared cell arena.
//!
//! A blueprint stores positions and metadata once (`CellLayout`); each
//! `VariantSet` carries only a parallel state array of the same length. Entry
//! `i` of every variant refers to the same relative position, so "same
//! length, same position per index" holds by construction.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use glam::IVec3;

use crate::record::{CellRecord, ConnectorInfo};
use crate::state::{CellState, CONNECTOR};
use crate::tag::Tag;

/// Positions and metadata shared by all variants of one blueprint.
#[derive(Debug, Default, PartialEq)]
pub struct CellLayout {
    pub positions: Vec<IVec3>,
    pub metadata: Vec<Option<Tag>>,
}

impl CellLayout {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// One alternative layout of cells, index-aligned with its siblings.
#[derive(Debug, Clone)]
pub struct VariantSet {
    layout: Arc<CellLayout>,
    states: Vec<CellState>,
    by_name: OnceLock<HashMap<String, Vec<usize>>>,
    connectors: OnceLock<Vec<ConnectorInfo>>,
}

impl PartialEq for VariantSet {
    fn eq(&self, other: &Self) -> bool {
        *self.layout == *other.layout && self.states == other.states
    }
}

impl VariantSet {
    /// # Panics
    ///
    /// Panics if `states` is not index-aligned with `layout`.
    pub fn new(layout: Arc<CellLayout>, states: Vec<CellState>) -> VariantSet {
        assert_eq!(
            layout.len(),
            states.len(),
            "variant state array must be index-aligned with the cell layout"
        );
        VariantSet {
            layout,
            states,
            by_name: OnceLock::new(),
            connectors: OnceLock::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, index: usize) -> &CellState {
        &self.states[index]
    }

    /// Materializes the record at `index`.
    pub fn record(&self, index: usize) -> CellRecord {
        CellRecord::new(
            self.layout.positions[index],
            self.states[index].clone(),
            self.layout.metadata[index].clone(),
        )
    }

    pub fn records(&self) -> impl Iterator<Item = CellRecord> + '_ {
        (0..self.len()).map(|i| self.record(i))
    }

    /// Cells whose state name matches, in layout order. Grouping is computed
    /// once; redundant computation under a race is harmless.
    pub fn cells_named(&self, name: &str) -> Vec<CellRecord> {
        let groups = self.by_name.get_or_init(|| {
            let mut map: HashMap<String, Vec<usize>> = HashMap::new();
            for (i, state) in self.states.iter().enumerate() {
                map.entry(state.name().to_string()).or_default().push(i);
            }
            map
        });
        groups
            .get(name)
            .map(|indices| indices.iter().map(|&i| self.record(i)).collect())
            .unwrap_or_default()
    }

    /// Connector info for every linkage-marker cell carrying metadata.
    pub fn connectors(&self) -> &[ConnectorInfo] {
        self.connectors.get_or_init(|| {
            self.cells_named(CONNECTOR)
                .iter()
                .filter_map(ConnectorInfo::from_cell)
                .collect()
        })
    }
}
