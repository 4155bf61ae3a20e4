//! hmatch - fuzzy entity resolution for Home Assistant
//!
//! Resolves loose area/type/name descriptions to concrete Home Assistant
//! entities and optionally acts on the result.

mod api;
mod cli;
mod commands;
mod config;
mod domain;
mod entity;
mod output;
mod resolver;
mod similarity;

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Command};
use crate::commands::trigger::TriggerKind;
use crate::config::RuntimeContext;

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = writeln!(io::stderr(), "Error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = RuntimeContext::new(&cli.global)?;
    ctx.init_logging()?;

    log::debug!("Config loaded from: {:?}", ctx.config_path());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_command(&ctx, cli.command))
}

async fn run_command(ctx: &RuntimeContext, command: Command) -> Result<()> {
    match command {
        Command::Resolve(args) => commands::resolve::resolve(ctx, args.into()).await,
        Command::Match { query, all } => {
            commands::resolve::list_matches(ctx, query.into(), all).await
        }
        Command::Do(cmd) => commands::do_cmd::run(ctx, cmd).await,
        Command::Status { name } => commands::status::run(ctx, &name).await,
        Command::Automation(args) => {
            commands::trigger::run(ctx, TriggerKind::Automation, &args.name, args.dry_run).await
        }
        Command::Scene(args) => {
            commands::trigger::run(ctx, TriggerKind::Scene, &args.name, args.dry_run).await
        }
        Command::Debug { command } => commands::debug::run(ctx, command).await,
        Command::Config { command } => commands::config::run(ctx, command).await,
        Command::Completions { shell } => commands::completions::run(shell),
    }
}
