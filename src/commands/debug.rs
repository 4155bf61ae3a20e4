//! Debug command implementations

use anyhow::Result;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::DebugCommand;
use crate::commands::{domain_counts, load_entities};
use crate::config::RuntimeContext;
use crate::domain::DomainCategory;
use crate::entity::Entity;
use crate::output::{output_for_format, print_table};

pub async fn run(ctx: &RuntimeContext, command: DebugCommand) -> Result<()> {
    match command {
        DebugCommand::Domain { phrase } => domain(ctx, &phrase),
        DebugCommand::Entities { filter, domain } => {
            entities(ctx, filter.as_deref(), domain.as_deref()).await
        }
    }
}

#[derive(Debug, Serialize)]
struct DomainReport<'a> {
    phrase: &'a str,
    category: Option<DomainCategory>,
    matched_keywords: Vec<&'static str>,
    /// Later categories whose keywords also match but lose on scan order
    shadowed: Vec<DomainCategory>,
}

fn domain_report(phrase: &str) -> DomainReport<'_> {
    let lower = phrase.to_lowercase();
    let category = DomainCategory::detect(phrase);

    let matching = |c: &DomainCategory| -> Vec<&'static str> {
        c.keywords()
            .iter()
            .copied()
            .filter(|keyword| lower.contains(keyword))
            .collect()
    };

    let matched_keywords = category.as_ref().map(matching).unwrap_or_default();
    let shadowed = DomainCategory::ALL
        .into_iter()
        .filter(|c| Some(*c) != category && !matching(c).is_empty())
        .collect();

    DomainReport {
        phrase,
        category,
        matched_keywords,
        shadowed,
    }
}

fn domain(ctx: &RuntimeContext, phrase: &str) -> Result<()> {
    let report = domain_report(phrase);

    output_for_format(ctx, &report, || {
        match report.category {
            Some(category) => {
                println!("'{}' resolves to domain: {}", phrase, category);
                println!("Matched keywords: {}", report.matched_keywords.join(", "));
            }
            None => println!("'{}' does not match any domain keyword", phrase),
        }
        if !report.shadowed.is_empty() {
            let names: Vec<&str> = report.shadowed.iter().map(|c| c.domain()).collect();
            println!("Also matches (lower priority): {}", names.join(", "));
        }
        Ok(())
    })
}

#[derive(Debug, Tabled, Serialize)]
struct EntityRow {
    #[tabled(rename = "ENTITY ID")]
    entity_id: String,
    #[tabled(rename = "STATE")]
    state: String,
    #[tabled(rename = "NAME")]
    friendly_name: String,
    #[tabled(rename = "AREA")]
    area: String,
}

impl From<&Entity> for EntityRow {
    fn from(entity: &Entity) -> Self {
        Self {
            entity_id: entity.entity_id.clone(),
            state: entity.state.clone(),
            friendly_name: entity.friendly_name.clone().unwrap_or_default(),
            area: entity.area_id.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

fn filter_entities<'a>(
    entities: &'a [Entity],
    filter: Option<&str>,
    domain: Option<&str>,
) -> Vec<&'a Entity> {
    let matcher = SkimMatcherV2::default();

    entities
        .iter()
        .filter(|e| domain.map_or(true, |d| e.domain().eq_ignore_ascii_case(d)))
        .filter(|e| {
            filter.map_or(true, |f| {
                matcher.fuzzy_match(&e.entity_id, f).is_some()
                    || matcher.fuzzy_match(e.display_name(), f).is_some()
            })
        })
        .collect()
}

async fn entities(ctx: &RuntimeContext, filter: Option<&str>, domain: Option<&str>) -> Result<()> {
    let all = load_entities(ctx).await?;
    let filtered = filter_entities(&all, filter, domain);

    output_for_format(ctx, &filtered, || {
        if filtered.is_empty() {
            println!("No entities found");
            return Ok(());
        }

        let rows: Vec<EntityRow> = filtered.iter().map(|e| EntityRow::from(*e)).collect();
        print_table(ctx, &rows)?;

        println!("\nTotal entities: {}", filtered.len());
        for (domain, count) in domain_counts(filtered.iter().copied()) {
            println!("  {domain}: {count}");
        }
        Ok(())
    })
}
