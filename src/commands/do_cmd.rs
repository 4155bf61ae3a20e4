//! Resolve-then-act command execution
//!
//! Turns `[AREA] TYPE ACTION [VALUE...]` into an entity query, resolves it,
//! and calls the matching Home Assistant service.

use std::ops::RangeInclusive;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::api::HassClient;
use crate::cli::DoCommand;
use crate::commands::load_entities;
use crate::config::RuntimeContext;
use crate::output::output_for_format;
use crate::resolver::{EntityMatch, Query};

/// A parsed `do` invocation
#[derive(Debug, PartialEq)]
struct EntityAction {
    query: Query,
    action: String,
    value: Option<String>,
}

/// A Home Assistant service call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    /// Request body, including `entity_id`
    pub data: Value,
}

impl ServiceCall {
    fn new(domain: &str, service: &str, entity_id: &str, extra: Map<String, Value>) -> Self {
        let mut data = Map::new();
        data.insert("entity_id".to_string(), Value::String(entity_id.to_string()));
        data.extend(extra);

        Self {
            domain: domain.to_string(),
            service: service.to_string(),
            data: Value::Object(data),
        }
    }
}

pub async fn run(ctx: &RuntimeContext, cmd: DoCommand) -> Result<()> {
    let parsed = parse_words(&cmd.words)?;

    let entities = load_entities(ctx).await?;
    let target = ctx
        .resolver()
        .resolve_entity(&entities, &parsed.query)
        .context("failed to resolve entity")?;

    if !ctx.global.quiet {
        eprintln!("Matched: {} ({})", target.friendly_name, target.entity_id);
    }

    let call = build_service_call(&target, &parsed.action, parsed.value.as_deref())?;

    if cmd.dry_run {
        return output_for_format(ctx, &call, || {
            println!("Would call {}.{} with {}", call.domain, call.service, call.data);
            println!("(dry run - no action taken)");
            Ok(())
        });
    }

    let client = HassClient::new(ctx)?;
    client
        .call_service(&call.domain, &call.service, &call.data)
        .await
        .with_context(|| format!("calling {}.{}", call.domain, call.service))?;

    log::info!("Called {}.{} on {}", call.domain, call.service, target.entity_id);
    if !ctx.global.quiet {
        println!(
            "Executed {} on {} ({})",
            parsed.action, target.friendly_name, target.entity_id
        );
    }

    Ok(())
}

/// 2 words: TYPE ACTION; 3: AREA TYPE ACTION; 4+: AREA TYPE ACTION VALUE...
fn parse_words(words: &[String]) -> Result<EntityAction> {
    match words {
        [entity_type, action] => Ok(EntityAction {
            query: Query::new("", entity_type.as_str(), ""),
            action: action.clone(),
            value: None,
        }),
        [area, entity_type, action] => Ok(EntityAction {
            query: Query::new(area.as_str(), entity_type.as_str(), ""),
            action: action.clone(),
            value: None,
        }),
        [area, entity_type, action, value @ ..] => Ok(EntityAction {
            query: Query::new(area.as_str(), entity_type.as_str(), ""),
            action: action.clone(),
            value: Some(value.join(" ")),
        }),
        _ => bail!("insufficient arguments: expected [AREA] TYPE ACTION [VALUE]"),
    }
}

/// Map action synonyms to a generic service name
fn normalize_action(action: &str) -> String {
    let lower = action.to_lowercase();
    match lower.as_str() {
        "on" | "turn_on" | "enable" | "open" => "turn_on".to_string(),
        "off" | "turn_off" | "disable" | "close" => "turn_off".to_string(),
        "toggle" | "switch" => "toggle".to_string(),
        _ => lower,
    }
}

fn build_service_call(
    target: &EntityMatch,
    action: &str,
    value: Option<&str>,
) -> Result<ServiceCall> {
    let domain = target.domain.as_str();
    let entity_id = target.entity_id.as_str();

    let service = match (normalize_action(action).as_str(), domain) {
        ("turn_on", "cover") => "open_cover",
        ("turn_off", "cover") => "close_cover",
        ("turn_on", _) => "turn_on",
        ("turn_off", _) => "turn_off",
        ("toggle", _) => "toggle",
        _ => {
            let value = value.ok_or_else(|| anyhow!("unsupported action: {action}"))?;
            return value_service_call(domain, entity_id, action, value);
        }
    };

    Ok(ServiceCall::new(domain, service, entity_id, Map::new()))
}

fn value_service_call(
    domain: &str,
    entity_id: &str,
    action: &str,
    value: &str,
) -> Result<ServiceCall> {
    let mut data = Map::new();
    let action = action.to_lowercase();

    let service = match (domain, action.as_str()) {
        ("light", "brightness" | "bright" | "dim") => {
            let brightness = parse_number(value, "brightness", Some(0.0..=255.0))?;
            data.insert("brightness".to_string(), json!(brightness as i64));
            "turn_on"
        }
        ("light", "color") => {
            data.insert("color_name".to_string(), json!(value));
            "turn_on"
        }
        ("fan", "speed" | "percentage") => {
            let speed = parse_number(value, "speed", Some(0.0..=100.0))?;
            data.insert("percentage".to_string(), json!(speed as i64));
            "set_percentage"
        }
        ("climate", "temp" | "temperature") => {
            let temperature = parse_number(value, "temperature", None)?;
            data.insert("temperature".to_string(), json!(temperature));
            "set_temperature"
        }
        ("climate", "mode") => {
            data.insert("hvac_mode".to_string(), json!(value));
            "set_hvac_mode"
        }
        ("cover", "position" | "pos") => {
            let position = parse_number(value, "position", Some(0.0..=100.0))?;
            data.insert("position".to_string(), json!(position as i64));
            "set_cover_position"
        }
        ("light" | "fan" | "climate" | "cover", _) => {
            bail!("unsupported {domain} action: {action}")
        }
        _ => bail!("value-based actions not supported for domain: {domain}"),
    };

    Ok(ServiceCall::new(domain, service, entity_id, data))
}

fn parse_number(value: &str, what: &str, range: Option<RangeInclusive<f64>>) -> Result<f64> {
    let number: f64 = value
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid {what} value: {value}"))?;

    if let Some(range) = range {
        if !range.contains(&number) {
            bail!(
                "{what} must be between {} and {}",
                range.start(),
                range.end()
            );
        }
    }

    Ok(number)
}
