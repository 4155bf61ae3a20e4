//! Output formatting utilities
//!
//! Handles JSON, YAML, and table output formats.

use std::io::{IsTerminal, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::OutputFormat;
use crate::config::RuntimeContext;

/// Format and print data according to the configured output format
pub fn print_output<T: Serialize>(ctx: &RuntimeContext, data: &T) -> Result<()> {
    let output = format_output(ctx, data)?;
    println!("{output}");
    Ok(())
}

/// Format data according to the configured output format
pub fn format_output<T: Serialize>(ctx: &RuntimeContext, data: &T) -> Result<String> {
    render(ctx.output_format(), std::io::stdout().is_terminal(), data)
}

fn render<T: Serialize>(format: OutputFormat, is_tty: bool, data: &T) -> Result<String> {
    match format {
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
        // Pretty for humans, compact when piped
        _ if is_tty => Ok(serde_json::to_string_pretty(data)?),
        _ => Ok(serde_json::to_string(data)?),
    }
}

/// Serialize `data` for machine formats, or run `human` for table/auto on a TTY
pub fn output_for_format<T, F>(ctx: &RuntimeContext, data: &T, human: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce() -> Result<()>,
{
    let format = ctx.output_format();
    let is_tty = std::io::stdout().is_terminal();

    match format {
        OutputFormat::Json | OutputFormat::Yaml => print_output(ctx, data),
        OutputFormat::Auto if !is_tty => print_output(ctx, data),
        _ => human(),
    }
}

/// Print a table from items that implement Tabled
pub fn print_table<T: Tabled>(ctx: &RuntimeContext, items: &[T]) -> Result<()> {
    let table = build_table(items, ctx.global.no_headers || ctx.config.output.no_headers);
    println!("{table}");
    Ok(())
}

fn build_table<T: Tabled>(items: &[T], no_headers: bool) -> Table {
    let mut table = Table::new(items);
    table.with(Style::sharp());

    if no_headers {
        table.with(tabled::settings::Remove::row(
            tabled::settings::object::Rows::first(),
        ));
    }

    table
}

/// Read JSON from a file, or from stdin when the path is `-`
pub fn read_json_input(path: &Path) -> Result<serde_json::Value> {
    let content = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };

    serde_json::from_str(&content).with_context(|| format!("parsing JSON from {}", path.display()))
}
