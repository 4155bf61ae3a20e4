//! Automation and scene commands
//!
//! Both list their entities when called without a name, and otherwise look
//! one up by name and call its service.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tabled::Tabled;

use crate::api::HassClient;
use crate::commands::load_entities;
use crate::config::RuntimeContext;
use crate::entity::Entity;
use crate::output::{output_for_format, print_table};
use crate::resolver::{EntityMatch, Resolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Automation,
    Scene,
}

impl TriggerKind {
    fn domain(self) -> &'static str {
        match self {
            TriggerKind::Automation => "automation",
            TriggerKind::Scene => "scene",
        }
    }

    fn service(self) -> &'static str {
        match self {
            TriggerKind::Automation => "trigger",
            TriggerKind::Scene => "turn_on",
        }
    }
}

#[derive(Debug, Tabled, Serialize)]
struct TriggerRow {
    #[tabled(rename = "NAME")]
    friendly_name: String,
    #[tabled(rename = "ENTITY ID")]
    entity_id: String,
    #[tabled(rename = "STATE")]
    state: String,
}

pub async fn run(
    ctx: &RuntimeContext,
    kind: TriggerKind,
    name: &[String],
    dry_run: bool,
) -> Result<()> {
    let entities = load_entities(ctx).await?;

    if name.is_empty() {
        return list(ctx, kind, &entities);
    }

    let name = name.join(" ");
    let target = find_target(&ctx.resolver(), kind, &entities, &name)?;
    let data = json!({ "entity_id": target.entity_id });

    if dry_run {
        println!(
            "Would call {}.{} with {}",
            kind.domain(),
            kind.service(),
            data
        );
        return Ok(());
    }

    let client = HassClient::new(ctx)?;
    client
        .call_service(kind.domain(), kind.service(), &data)
        .await
        .with_context(|| format!("calling {}.{}", kind.domain(), kind.service()))?;

    log::info!("Called {}.{} on {}", kind.domain(), kind.service(), target.entity_id);
    if !ctx.global.quiet {
        println!(
            "Triggered {} ({})",
            target.friendly_name, target.entity_id
        );
    }
    Ok(())
}

fn of_kind(kind: TriggerKind, entities: &[Entity]) -> Vec<Entity> {
    entities
        .iter()
        .filter(|e| e.domain() == kind.domain())
        .cloned()
        .collect()
}

fn find_target(
    resolver: &Resolver,
    kind: TriggerKind,
    entities: &[Entity],
    name: &str,
) -> Result<EntityMatch> {
    let candidates = of_kind(kind, entities);
    resolver
        .resolve_by_name(&candidates, name)
        .with_context(|| format!("{} '{}' not found", kind.domain(), name))
}

fn list(ctx: &RuntimeContext, kind: TriggerKind, entities: &[Entity]) -> Result<()> {
    let rows: Vec<TriggerRow> = of_kind(kind, entities)
        .into_iter()
        .map(|e| TriggerRow {
            friendly_name: e.display_name().to_string(),
            entity_id: e.entity_id,
            state: e.state,
        })
        .collect();

    output_for_format(ctx, &rows, || {
        if rows.is_empty() {
            println!("No {} entities found", kind.domain());
            return Ok(());
        }
        print_table(ctx, &rows)
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn snapshot() -> Vec<Entity> {
        vec![
            Entity::new("light.morning_lamp", "off").with_friendly_name("Morning Lamp"),
            Entity::new("automation.morning", "on").with_friendly_name("Morning Routine"),
            Entity::new("scene.movie", "scening").with_friendly_name("Movie Time"),
        ]
    }

    #[test]
    fn test_kind_services() {
        assert_eq!(TriggerKind::Automation.service(), "trigger");
        assert_eq!(TriggerKind::Scene.domain(), "scene");
        assert_eq!(TriggerKind::Scene.service(), "turn_on");
    }

    #[test]
    fn test_find_target_stays_in_domain() {
        let resolver = Resolver::new(&HashMap::new(), 0.5);
        let entities = snapshot();

        let m = find_target(&resolver, TriggerKind::Automation, &entities, "morning").unwrap();
        assert_eq!(m.entity_id, "automation.morning");

        let m = find_target(&resolver, TriggerKind::Scene, &entities, "movie").unwrap();
        assert_eq!(m.entity_id, "scene.movie");
    }

    #[test]
    fn test_find_target_missing() {
        let resolver = Resolver::new(&HashMap::new(), 0.5);
        let err = find_target(&resolver, TriggerKind::Scene, &snapshot(), "morning").unwrap_err();
        assert!(err.to_string().contains("scene 'morning' not found"));
    }

    #[test]
    fn test_of_kind() {
        let automations = of_kind(TriggerKind::Automation, &snapshot());
        assert_eq!(automations.len(), 1);
        assert_eq!(automations[0].entity_id, "automation.morning");
    }
}
