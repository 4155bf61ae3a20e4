//! Entity status command

use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::api::EntityState;
use crate::commands::{domain_counts, load_entities, load_states};
use crate::config::RuntimeContext;
use crate::entity::Entity;
use crate::output::output_for_format;
use crate::resolver::{EntityMatch, Resolver};

#[derive(Debug, Serialize)]
struct StatusSummary {
    total: usize,
    domains: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize)]
struct EntityStatus<'a> {
    #[serde(flatten)]
    matched: EntityMatch,
    state: &'a str,
    last_changed: &'a str,
    last_updated: &'a str,
    attributes: &'a Value,
}

pub async fn run(ctx: &RuntimeContext, name: &[String]) -> Result<()> {
    if name.is_empty() {
        return summary(ctx).await;
    }

    let name = name.join(" ");
    let states = load_states(ctx).await?;
    let status = entity_status(&states, &ctx.resolver(), &name)?;

    output_for_format(ctx, &status, || {
        let m = &status.matched;
        println!("Entity:       {} ({})", m.friendly_name, m.entity_id);
        println!("State:        {}", status.state);
        println!("Domain:       {}", m.domain);
        if !m.area.is_empty() {
            println!("Area:         {}", m.area);
        }
        println!("Last Changed: {}", status.last_changed);
        println!("Last Updated: {}", status.last_updated);

        if ctx.global.verbose > 0 {
            if let Some(attributes) = status.attributes.as_object() {
                println!("\nAttributes:");
                for (key, value) in attributes {
                    println!("  {key}: {value}");
                }
            }
        }
        Ok(())
    })
}

async fn summary(ctx: &RuntimeContext) -> Result<()> {
    let entities = load_entities(ctx).await?;
    let summary = summarize(&entities);

    output_for_format(ctx, &summary, || {
        println!("Total entities: {}\n", summary.total);
        println!("Entities by domain:");
        for (domain, count) in &summary.domains {
            println!("  {domain}: {count}");
        }
        Ok(())
    })
}

fn summarize(entities: &[Entity]) -> StatusSummary {
    StatusSummary {
        total: entities.len(),
        domains: domain_counts(entities),
    }
}

fn entity_status<'a>(
    states: &'a [EntityState],
    resolver: &Resolver,
    name: &str,
) -> Result<EntityStatus<'a>> {
    let entities: Vec<Entity> = states.iter().map(Entity::from).collect();
    let matched = resolver
        .resolve_by_name(&entities, name)
        .context("failed to resolve entity")?;

    let state = states
        .iter()
        .find(|s| s.entity_id == matched.entity_id)
        .ok_or_else(|| anyhow!("no state for {}", matched.entity_id))?;

    Ok(EntityStatus {
        matched,
        state: &state.state,
        last_changed: &state.last_changed,
        last_updated: &state.last_updated,
        attributes: &state.attributes,
    })
}
