//! Resolve and match command implementations

use anyhow::Result;

use crate::commands::{load_entities, MatchRow};
use crate::config::RuntimeContext;
use crate::output::{output_for_format, print_table};
use crate::resolver::{rank, Query};

/// Resolve a query to one entity
pub async fn resolve(ctx: &RuntimeContext, query: Query) -> Result<()> {
    if query.is_empty() {
        log::warn!("empty query: only the name-length bonus contributes to scores");
    }

    let entities = load_entities(ctx).await?;
    let resolver = ctx.resolver();

    let found = resolver.resolve_entity(&entities, &query)?;
    log::info!("Resolved {} to {}", query, found.entity_id);

    output_for_format(ctx, &found, || {
        println!("Matched: {} ({})", found.friendly_name, found.entity_id);
        println!("Domain:  {}", found.domain);
        if !found.area.is_empty() {
            println!("Area:    {}", found.area);
        }
        println!("Score:   {:.3}", found.score);
        Ok(())
    })
}

/// Rank candidates for a query, or every entity with `all`
pub async fn list_matches(ctx: &RuntimeContext, query: Query, all: bool) -> Result<()> {
    let entities = load_entities(ctx).await?;
    let resolver = ctx.resolver();

    let mut matches = if all {
        resolver.debug_find_matches(&entities, &query)
    } else {
        resolver.find_matches(&entities, &query)
    };
    rank(&mut matches);

    output_for_format(ctx, &matches, || {
        if matches.is_empty() {
            println!(
                "No entities scored above {:.2} for {}",
                resolver.threshold(),
                query
            );
            return Ok(());
        }

        println!("Matching {query}\n");
        let rows: Vec<MatchRow> = matches.iter().map(MatchRow::from).collect();
        print_table(ctx, &rows)
    })
}
