//! Config command implementations

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::api::HassClient;
use crate::cli::ConfigCommand;
use crate::commands::domain_counts;
use crate::config::{self as app_config, RuntimeContext};
use crate::entity::Entity;
use crate::output::{output_for_format, print_output};

pub async fn run(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Path => path(ctx),
        ConfigCommand::Get { key } => get(ctx, key.as_deref()),
        ConfigCommand::Reset => reset(ctx),
        ConfigCommand::Test => connection_test(ctx).await,
    }
}

fn show(ctx: &RuntimeContext) -> Result<()> {
    print_output(ctx, &ctx.config)
}

fn path(ctx: &RuntimeContext) -> Result<()> {
    println!("{}", ctx.config_path().display());
    Ok(())
}

fn get(ctx: &RuntimeContext, key: Option<&str>) -> Result<()> {
    match key {
        Some(key) => {
            println!("{}", get_config_value(&ctx.config, key)?);
            Ok(())
        }
        None => show(ctx),
    }
}

fn reset(ctx: &RuntimeContext) -> Result<()> {
    app_config::write_default_config(ctx.config_path())?;
    println!(
        "Configuration reset to defaults at: {}",
        ctx.config_path().display()
    );
    Ok(())
}

#[derive(Debug, Serialize)]
struct ConnectionReport {
    server: String,
    version: String,
    location_name: String,
    entities: usize,
    domains: BTreeMap<String, usize>,
}

async fn check_connection(client: &HassClient, server: &str) -> Result<ConnectionReport> {
    let info = client.get_info().await.context("connection failed")?;
    let states = client.get_states().await.context("fetching entities failed")?;
    let entities: Vec<Entity> = states.iter().map(Entity::from).collect();

    Ok(ConnectionReport {
        server: server.to_string(),
        version: info.version,
        location_name: info.location_name,
        entities: entities.len(),
        domains: domain_counts(&entities),
    })
}

async fn connection_test(ctx: &RuntimeContext) -> Result<()> {
    let server = ctx.server_url()?;
    let client = HassClient::new(ctx)?;
    let report = check_connection(&client, server).await?;

    output_for_format(ctx, &report, || {
        println!("Server:   {}", report.server);
        println!("Version:  {}", report.version);
        println!("Location: {}", report.location_name);
        println!("Entities: {}", report.entities);
        println!("\nEntity breakdown:");
        for (domain, count) in &report.domains {
            println!("  {domain}: {count}");
        }
        println!("\nConnection OK");
        Ok(())
    })
}

/// Look up a dotted key such as `resolver.threshold`
fn get_config_value(config: &app_config::AppConfig, key: &str) -> Result<String> {
    let json = serde_json::to_value(config)?;

    let mut current = &json;
    for part in key.split('.') {
        current = current
            .get(part)
            .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {key}"))?;
    }

    Ok(match current {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "null".to_string(),
        other => serde_json::to_string(other)?,
    })
}
