//! District reference data and the in-memory catalog built from it.
//!
//! Districts are maintained out-of-band; both flows only ever read them.

use serde::{Deserialize, Serialize};

use crate::types::EntityId;

/// A row from the `districts` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    pub id: EntityId,
    pub state: String,
    pub district_name: String,
}

impl District {
    /// `"Bengaluru Urban, Karnataka"`.
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.district_name, self.state)
    }
}

/// Indexed view over the full district list.
///
/// Districts are kept ordered by state, then district name; the state list
/// is the distinct states in that same order.
#[derive(Debug, Clone, Default)]
pub struct DistrictCatalog {
    districts: Vec<District>,
    states: Vec<String>,
}

impl DistrictCatalog {
    pub fn new(mut districts: Vec<District>) -> Self {
        districts.sort_by(|a, b| {
            a.state
                .cmp(&b.state)
                .then_with(|| a.district_name.cmp(&b.district_name))
        });

        let mut states: Vec<String> = Vec::new();
        for district in &districts {
            if states.last() != Some(&district.state) {
                states.push(district.state.clone());
            }
        }

        Self { districts, states }
    }

    /// A catalog with nothing selectable.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }

    pub fn all_districts(&self) -> &[District] {
        &self.districts
    }

    pub fn states_in_order(&self) -> &[String] {
        &self.states
    }

    pub fn has_state(&self, state: &str) -> bool {
        self.states.iter().any(|s| s == state)
    }

    /// Districts belonging to `state`, or nothing when no state is chosen.
    pub fn districts_for_state(&self, state: Option<&str>) -> Vec<&District> {
        match state {
            Some(state) => self.districts.iter().filter(|d| d.state == state).collect(),
            None => Vec::new(),
        }
    }

    pub fn find(&self, id: EntityId) -> Option<&District> {
        self.districts.iter().find(|d| d.id == id)
    }
}
