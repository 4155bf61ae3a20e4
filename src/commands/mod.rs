//! Command implementations

pub mod completions;
pub mod config;
pub mod debug;
pub mod do_cmd;
pub mod resolve;
pub mod status;
pub mod trigger;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tabled::Tabled;

use crate::api::{EntityState, HassClient};
use crate::config::RuntimeContext;
use crate::entity::Entity;
use crate::output::read_json_input;
use crate::resolver::EntityMatch;

/// Raw states from `--snapshot` or the server
pub async fn load_states(ctx: &RuntimeContext) -> Result<Vec<EntityState>> {
    let states = match ctx.global.snapshot.as_deref() {
        Some(path) => {
            log::debug!("Reading snapshot from {}", path.display());
            let json = read_json_input(path)?;
            parse_states(json)?
        }
        None => {
            let client = HassClient::new(ctx)?;
            client.get_states().await.context("fetching entity states")?
        }
    };

    log::debug!("Loaded {} entities", states.len());
    Ok(states)
}

/// Load the entity snapshot from `--snapshot` or the server
pub async fn load_entities(ctx: &RuntimeContext) -> Result<Vec<Entity>> {
    let states = load_states(ctx).await?;
    Ok(states.iter().map(Entity::from).collect())
}

/// Entity count per domain, sorted by domain
pub fn domain_counts<'a, I>(entities: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a Entity>,
{
    let mut counts = BTreeMap::new();
    for entity in entities {
        *counts.entry(entity.domain().to_string()).or_insert(0) += 1;
    }
    counts
}

fn parse_states(json: serde_json::Value) -> Result<Vec<EntityState>> {
    serde_json::from_value(json).context("snapshot must be a JSON array of entity states")
}

/// Table row for a scored candidate
#[derive(Debug, Tabled, Serialize)]
pub struct MatchRow {
    #[tabled(rename = "SCORE")]
    score: String,
    #[tabled(rename = "ENTITY ID")]
    entity_id: String,
    #[tabled(rename = "NAME")]
    friendly_name: String,
    #[tabled(rename = "DOMAIN")]
    domain: String,
    #[tabled(rename = "AREA")]
    area: String,
}

impl From<&EntityMatch> for MatchRow {
    fn from(m: &EntityMatch) -> Self {
        Self {
            score: format!("{:.3}", m.score),
            entity_id: m.entity_id.clone(),
            friendly_name: m.friendly_name.clone(),
            domain: m.domain.clone(),
            area: if m.area.is_empty() {
                "-".to_string()
            } else {
                m.area.clone()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_states() {
        let json = serde_json::json!([
            {"entity_id": "light.kitchen", "state": "on", "attributes": {"friendly_name": "Kitchen"}},
            {"entity_id": "fan.attic", "state": "unavailable"}
        ]);

        let states = parse_states(json).unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[1].state, "unavailable");
    }

    #[test]
    fn test_parse_states_rejects_object() {
        let err = parse_states(serde_json::json!({"entity_id": "light.kitchen"})).unwrap_err();
        assert!(err.to_string().contains("JSON array"));
    }

    #[test]
    fn test_domain_counts() {
        let entities = vec![
            Entity::new("light.kitchen", "on"),
            Entity::new("light.hall", "off"),
            Entity::new("automation.morning", "on"),
        ];

        let counts = domain_counts(&entities);
        assert_eq!(counts.get("light"), Some(&2));
        assert_eq!(counts.get("automation"), Some(&1));
        assert_eq!(counts.keys().next().map(String::as_str), Some("automation"));
    }

    #[test]
    fn test_match_row() {
        let m = EntityMatch {
            entity_id: "light.kitchen".to_string(),
            friendly_name: "Kitchen Light".to_string(),
            domain: "light".to_string(),
            area: String::new(),
            score: 0.7,
        };

        let row = MatchRow::from(&m);
        assert_eq!(row.score, "0.700");
        assert_eq!(row.area, "-");
    }
}
