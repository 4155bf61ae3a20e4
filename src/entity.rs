//! Entity snapshot items consumed by the resolver

use serde::Serialize;

use crate::api::EntityState;

/// One entity from a state snapshot, with the attributes the resolver reads
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub entity_id: String,
    pub state: String,
    pub friendly_name: Option<String>,
    pub area_id: Option<String>,
}

impl Entity {
    /// Text before the first `.` of the entity_id
    pub fn domain(&self) -> &str {
        self.entity_id
            .split('.')
            .next()
            .unwrap_or(&self.entity_id)
    }

    /// Friendly name, or the entity_id when none is set
    pub fn display_name(&self) -> &str {
        self.friendly_name.as_deref().unwrap_or(&self.entity_id)
    }

    pub fn is_unavailable(&self) -> bool {
        self.state == "unavailable"
    }
}

#[cfg(test)]
impl Entity {
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            friendly_name: None,
            area_id: None,
        }
    }

    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    pub fn with_area(mut self, area_id: impl Into<String>) -> Self {
        self.area_id = Some(area_id.into());
        self
    }
}

impl From<&EntityState> for Entity {
    fn from(state: &EntityState) -> Self {
        let friendly_name = state
            .attributes
            .get("friendly_name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let area_id = state
            .attributes
            .get("area_id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        Self {
            entity_id: state.entity_id.clone(),
            state: state.state.clone(),
            friendly_name,
            area_id,
        }
    }
}
