//! Entity resolution
//!
//! Scores every entity of a snapshot against an area/type/name query and
//! picks the best candidate. Scoring is a weighted sum of three gated
//! sub-scores:
//! - Domain (type phrase), weight 0.4, a hard gate when given
//! - Area (alias-expanded, `area_id` first, then the friendly name), weight 0.3
//! - Name (friendly name), weight 0.3
//!
//! followed by a small penalty for unavailable entities and a bonus for more
//! descriptive friendly names. The resolver performs no I/O and holds only
//! its immutable configuration, so one instance can be shared freely.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::classify_domain;
use crate::entity::Entity;
use crate::similarity::similarity;

const TYPE_WEIGHT: f64 = 0.4;
const AREA_WEIGHT: f64 = 0.3;
const NAME_WEIGHT: f64 = 0.3;

/// Multiplier applied to entities whose state is `unavailable`
const UNAVAILABLE_PENALTY: f64 = 0.95;

/// Bonus per friendly-name word beyond the second
const SPECIFICITY_BONUS: f64 = 0.01;

/// An `area_id` similarity must exceed this to skip the friendly name
const AREA_ID_MIN_SCORE: f64 = 0.8;

/// Friendly-name similarity fallback for areas must exceed this
const AREA_FALLBACK_MIN_SCORE: f64 = 0.6;

/// Lead the top candidate needs over the runner-up to count as a clear winner
const CLEAR_WINNER_MARGIN: f64 = 0.05;

/// A free-form lookup. Empty fields are ignored when scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub area: String,
    pub entity_type: String,
    pub name: String,
}

impl Query {
    pub fn new(
        area: impl Into<String>,
        entity_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            area: area.into(),
            entity_type: entity_type.into(),
            name: name.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.area.is_empty() && self.entity_type.is_empty() && self.name.is_empty()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "area='{}', type='{}', name='{}'",
            self.area, self.entity_type, self.name
        )
    }
}

/// A scored candidate entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityMatch {
    pub entity_id: String,
    /// Friendly name, or the entity_id when the entity has none
    pub friendly_name: String,
    pub domain: String,
    /// `area_id` attribute verbatim, empty when unset
    pub area: String,
    /// Composite score. Not bounded by 1.0: the specificity bonus is additive.
    pub score: f64,
}

impl EntityMatch {
    fn unscored(entity: &Entity) -> Self {
        Self {
            entity_id: entity.entity_id.clone(),
            friendly_name: entity.display_name().to_string(),
            domain: entity.domain().to_string(),
            area: entity.area_id.clone().unwrap_or_default(),
            score: 0.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no entities found matching {query}")]
    NoMatch { query: Query },
}

/// Scores snapshots against queries using a fixed alias table and threshold
#[derive(Debug, Clone)]
pub struct Resolver {
    aliases: HashMap<String, String>,
    threshold: f64,
}

impl Resolver {
    /// Alias keys are lowercased so lookups match lowercased area phrases.
    pub fn new(aliases: &HashMap<String, String>, threshold: f64) -> Self {
        let aliases = aliases
            .iter()
            .map(|(alias, target)| (alias.to_lowercase(), target.clone()))
            .collect();

        Self { aliases, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Pick the single best entity for a query
    pub fn resolve_entity(
        &self,
        entities: &[Entity],
        query: &Query,
    ) -> Result<EntityMatch, ResolveError> {
        let mut matches = self.find_matches(entities, query);

        match matches.len() {
            0 => Err(ResolveError::NoMatch {
                query: query.clone(),
            }),
            1 => Ok(matches.remove(0)),
            _ => {
                rank(&mut matches);

                if matches[0].score > matches[1].score + CLEAR_WINNER_MARGIN {
                    log::debug!(
                        "clear winner {} ({:.3}) over {} ({:.3})",
                        matches[0].entity_id,
                        matches[0].score,
                        matches[1].entity_id,
                        matches[1].score
                    );
                } else {
                    // Close scores keep snapshot order; the first one wins.
                    log::debug!(
                        "ambiguous match, {} ({:.3}) is within {CLEAR_WINNER_MARGIN} of {} ({:.3})",
                        matches[0].entity_id,
                        matches[0].score,
                        matches[1].entity_id,
                        matches[1].score
                    );
                }

                Ok(matches.swap_remove(0))
            }
        }
    }

    /// Pick an entity by name alone.
    ///
    /// Scores only the friendly name (or an exact entity_id), so the
    /// threshold applies to a `[0, 1]` name score rather than to a composite
    /// where the name carries 0.3.
    pub fn resolve_by_name(
        &self,
        entities: &[Entity],
        name: &str,
    ) -> Result<EntityMatch, ResolveError> {
        let mut matches: Vec<EntityMatch> = entities
            .iter()
            .map(|entity| {
                let mut candidate = EntityMatch::unscored(entity);
                candidate.score = if entity.entity_id.eq_ignore_ascii_case(name) {
                    1.0
                } else {
                    score_name(&candidate.friendly_name, name)
                };
                candidate
            })
            .filter(|m| m.score > self.threshold)
            .collect();

        rank(&mut matches);
        if matches.is_empty() {
            return Err(ResolveError::NoMatch {
                query: Query::new("", "", name),
            });
        }
        log::debug!("name '{}' resolved to {}", name, matches[0].entity_id);
        Ok(matches.swap_remove(0))
    }

    /// Candidates scoring strictly above the threshold, in snapshot order
    pub fn find_matches(&self, entities: &[Entity], query: &Query) -> Vec<EntityMatch> {
        let matches: Vec<EntityMatch> = entities
            .iter()
            .map(|entity| self.score_entity(entity, query))
            .filter(|m| m.score > self.threshold)
            .collect();

        log::debug!(
            "{} of {} entities above threshold {} for {}",
            matches.len(),
            entities.len(),
            self.threshold,
            query
        );

        matches
    }

    /// Every entity with its score, ignoring the threshold
    pub fn debug_find_matches(&self, entities: &[Entity], query: &Query) -> Vec<EntityMatch> {
        entities
            .iter()
            .map(|entity| self.score_entity(entity, query))
            .collect()
    }

    /// Composite score of one entity
    pub fn score_entity(&self, entity: &Entity, query: &Query) -> EntityMatch {
        let mut candidate = EntityMatch::unscored(entity);
        let mut score = 0.0;

        if !query.entity_type.is_empty() {
            let domain_score = classify_domain(&candidate.domain, &query.entity_type);
            if domain_score == 0.0 {
                log::trace!("{}: domain mismatch", candidate.entity_id);
                return candidate;
            }
            score += domain_score * TYPE_WEIGHT;
        }

        if !query.area.is_empty() {
            score += self.score_area(&candidate, &query.area) * AREA_WEIGHT;
        }

        if !query.name.is_empty() {
            score += score_name(&candidate.friendly_name, &query.name) * NAME_WEIGHT;
        }

        if entity.is_unavailable() {
            score *= UNAVAILABLE_PENALTY;
        }

        let word_count = candidate.friendly_name.split_whitespace().count();
        if word_count > 2 {
            score += SPECIFICITY_BONUS * (word_count - 2) as f64;
        }

        log::trace!("{}: score {:.4}", candidate.entity_id, score);
        candidate.score = score;
        candidate
    }

    /// How well an entity's area or friendly name matches an area phrase
    fn score_area(&self, candidate: &EntityMatch, area: &str) -> f64 {
        let mut phrase = area.to_lowercase();
        if let Some(target) = self.aliases.get(&phrase) {
            log::trace!("area alias '{phrase}' -> '{target}'");
            phrase = target.to_lowercase();
        }

        if !candidate.area.is_empty() {
            let score = similarity(&candidate.area.to_lowercase(), &phrase);
            if score > AREA_ID_MIN_SCORE {
                return score;
            }
        }

        let name = candidate.friendly_name.to_lowercase();
        let words: Vec<&str> = name.split_whitespace().collect();

        if words.iter().any(|word| *word == phrase) {
            return 1.0;
        }
        if words.iter().any(|word| word.contains(phrase.as_str())) {
            return 0.95;
        }
        if words.iter().any(|word| phrase.contains(word)) {
            return 0.90;
        }

        if name.contains(&format!(" {phrase} ")) {
            return 0.98;
        }
        if name.contains(&format!("{phrase} ")) || name.contains(&format!(" {phrase}")) {
            return 0.95;
        }

        let score = similarity(&name, &phrase);
        if score > AREA_FALLBACK_MIN_SCORE {
            score
        } else {
            0.0
        }
    }
}

/// How well a friendly name matches a name phrase.
///
/// Unlike area scoring there is no floor, weak similarities pass through.
pub fn score_name(friendly_name: &str, name: &str) -> f64 {
    let friendly = friendly_name.to_lowercase();
    let name = name.to_lowercase();

    if friendly == name {
        return 1.0;
    }

    if friendly.contains(&name) {
        return 0.9;
    }

    similarity(&friendly, &name)
}

/// Sort candidates by descending score. Equal scores keep their order.
pub fn rank(matches: &mut [EntityMatch]) {
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> Resolver {
        Resolver::new(&HashMap::new(), 0.5)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn living_room_lamp() -> Entity {
        Entity::new("light.living_room_lamp", "on")
            .with_friendly_name("Living Room Lamp")
            .with_area("living_room")
    }

    fn candidate(friendly_name: &str, area: &str) -> EntityMatch {
        EntityMatch {
            entity_id: "light.test".to_string(),
            friendly_name: friendly_name.to_string(),
            domain: "light".to_string(),
            area: area.to_string(),
            score: 0.0,
        }
    }

    #[test]
    fn test_score_entity() {
        let m = resolver().score_entity(&living_room_lamp(), &Query::new("living", "light", "lamp"));

        assert_eq!(m.entity_id, "light.living_room_lamp");
        assert_eq!(m.friendly_name, "Living Room Lamp");
        assert_eq!(m.domain, "light");
        assert_eq!(m.area, "living_room");
        // 0.4 + 0.9 * 0.3 + 0.9 * 0.3 + one extra word
        assert_close(m.score, 0.95);
    }

    #[test]
    fn test_resolve_single_entity() {
        let entities = vec![living_room_lamp()];
        let m = resolver()
            .resolve_entity(&entities, &Query::new("living", "light", "lamp"))
            .unwrap();

        assert_eq!(m.entity_id, "light.living_room_lamp");
        assert!(m.score > 0.6);
    }

    #[test]
    fn test_resolve_empty_snapshot() {
        let err = resolver()
            .resolve_entity(&[], &Query::new("kitchen", "light", ""))
            .unwrap_err();

        assert!(matches!(err, ResolveError::NoMatch { .. }));
        assert!(err.to_string().contains("area='kitchen'"));
    }

    #[test]
    fn test_resolve_picks_highest_score() {
        let entities = vec![
            Entity::new("light.kitchen", "on").with_friendly_name("Kitchen Light"),
            Entity::new("light.bedroom", "on").with_friendly_name("Bedroom Light"),
        ];

        let m = resolver()
            .resolve_entity(&entities, &Query::new("bedroom", "light", ""))
            .unwrap();
        assert_eq!(m.entity_id, "light.bedroom");
    }

    #[test]
    fn test_resolve_tie_keeps_snapshot_order() {
        // Ties are not broken by availability or anything else
        let first = Entity::new("light.hall_a", "on").with_friendly_name("Hall Light");
        let second = Entity::new("light.hall_b", "on").with_friendly_name("Hall Light");
        let query = Query::new("hall", "light", "");

        let m = resolver()
            .resolve_entity(&[first.clone(), second.clone()], &query)
            .unwrap();
        assert_eq!(m.entity_id, "light.hall_a");

        let m = resolver().resolve_entity(&[second, first], &query).unwrap();
        assert_eq!(m.entity_id, "light.hall_b");
    }

    #[test]
    fn test_resolve_close_scores_return_top() {
        let entities = vec![
            Entity::new("light.desk", "on").with_friendly_name("Desk Light"),
            Entity::new("light.desk_strip", "on").with_friendly_name("Desk Light Strip"),
        ];

        // 0.41 vs 0.40 is within the clear-winner margin; the top still wins
        let m = Resolver::new(&HashMap::new(), 0.3)
            .resolve_entity(&entities, &Query::new("", "light", ""))
            .unwrap();
        assert_eq!(m.entity_id, "light.desk_strip");
    }

    #[test]
    fn test_domain_gate_disqualifies() {
        let entity = Entity::new("switch.living_room_lamp_plug", "on")
            .with_friendly_name("Living Room Lamp Plug")
            .with_area("living_room");

        let m = resolver().score_entity(&entity, &Query::new("living", "light", "lamp"));
        // No penalty or specificity bonus after the gate
        assert_eq!(m.score, 0.0);
    }

    #[test]
    fn test_unavailable_penalty() {
        let query = Query::new("kitchen", "light", "");
        let available = Entity::new("light.kitchen", "on").with_friendly_name("Kitchen Light");
        let unavailable =
            Entity::new("light.kitchen", "unavailable").with_friendly_name("Kitchen Light");

        let a = resolver().score_entity(&available, &query).score;
        let u = resolver().score_entity(&unavailable, &query).score;

        assert_close(a, 0.7);
        assert_close(u, a * 0.95);
    }

    #[test]
    fn test_specificity_bonus() {
        let query = Query::new("", "light", "");
        let short = Entity::new("light.desk", "on").with_friendly_name("Desk Lamp");
        let long = Entity::new("light.desk", "on").with_friendly_name("Big Old Desk Lamp");

        let s = resolver().score_entity(&short, &query).score;
        let l = resolver().score_entity(&long, &query).score;

        assert_close(s, 0.4);
        assert_close(l - s, 0.02);
    }

    #[test]
    fn test_empty_query_scores_only_bonus() {
        let query = Query::default();
        assert!(query.is_empty());

        let plain = Entity::new("fan.attic", "off").with_friendly_name("Attic Fan");
        let wordy = Entity::new("fan.attic", "off").with_friendly_name("Attic Exhaust Fan Two");

        assert_eq!(resolver().score_entity(&plain, &query).score, 0.0);
        assert_close(resolver().score_entity(&wordy, &query).score, 0.02);
    }

    #[test]
    fn test_threshold_is_strict() {
        let entities = vec![Entity::new("light.desk", "on").with_friendly_name("Desk Lamp")];
        let query = Query::new("", "light", "");

        let at = Resolver::new(&HashMap::new(), 0.4);
        assert!(at.find_matches(&entities, &query).is_empty());

        let below = Resolver::new(&HashMap::new(), 0.39);
        assert_eq!(below.find_matches(&entities, &query).len(), 1);
    }

    #[test]
    fn test_debug_find_matches_ignores_threshold() {
        let entities = vec![
            living_room_lamp(),
            Entity::new("switch.coffee", "off").with_friendly_name("Coffee Maker"),
        ];
        let query = Query::new("living", "light", "lamp");

        let filtered = resolver().find_matches(&entities, &query);
        assert_eq!(filtered.len(), 1);

        let all = resolver().debug_find_matches(&entities, &query);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].entity_id, "light.living_room_lamp");
        assert_eq!(all[1].entity_id, "switch.coffee");
        assert_eq!(all[1].score, 0.0);
    }

    #[test]
    fn test_friendly_name_falls_back_to_entity_id() {
        let entity = Entity::new("sensor.outdoor_temp", "21.5");
        let m = resolver().score_entity(&entity, &Query::new("", "", "outdoor"));

        assert_eq!(m.friendly_name, "sensor.outdoor_temp");
        assert_eq!(m.area, "");
        assert_close(m.score, 0.9 * 0.3);
    }

    #[test]
    fn test_score_area_prefers_area_id() {
        let r = resolver();
        assert_close(r.score_area(&candidate("Lamp", "living_room"), "living"), 0.9);
        assert_close(r.score_area(&candidate("Lamp", "Kitchen"), "kitchen"), 1.0);
    }

    #[test]
    fn test_score_area_weak_area_id_falls_through() {
        let r = resolver();
        assert_close(
            r.score_area(&candidate("Living Room Lamp", "kitchen"), "living"),
            1.0,
        );
    }

    #[test]
    fn test_score_area_friendly_name_tiers() {
        let r = resolver();
        assert_close(r.score_area(&candidate("Kitchen Light", ""), "Kitchen"), 1.0);
        assert_close(r.score_area(&candidate("Bedroom Fan", ""), "bed"), 0.95);
        assert_close(r.score_area(&candidate("Office Lamp", ""), "home office"), 0.90);
    }

    #[test]
    fn test_score_area_similarity_fallback() {
        let r = resolver();
        assert_close(
            r.score_area(&candidate("Gaarage", ""), "garage"),
            1.0 - 1.0 / 7.0,
        );
        assert_eq!(r.score_area(&candidate("abcd", ""), "abxy"), 0.0);
    }

    #[test]
    fn test_score_area_alias() {
        let mut aliases = HashMap::new();
        aliases.insert("LR".to_string(), "Living Room".to_string());
        let r = Resolver::new(&aliases, 0.5);

        let lamp = candidate("Living Room Lamp", "");
        assert_close(r.score_area(&lamp, "lr"), 0.90);
        assert_close(r.score_area(&lamp, "Lr"), 0.90);
        assert_eq!(resolver().score_area(&lamp, "lr"), 0.0);
    }

    #[test]
    fn test_score_name() {
        assert_eq!(score_name("Living Room Lamp", "living room lamp"), 1.0);
        assert_eq!(score_name("Living Room Lamp", "lamp"), 0.9);
        assert_eq!(score_name("Kitchen Light", "kitchen fan"), 0.8);
    }

    #[test]
    fn test_score_name_has_no_floor() {
        // The same pair scores 0.0 as an area, which floors at 0.6
        assert_close(score_name("abcd", "abxy"), 0.5);
    }

    #[test]
    fn test_rank_is_stable() {
        let mut matches = vec![
            EntityMatch { score: 0.5, ..candidate("a", "") },
            EntityMatch { entity_id: "light.first".to_string(), score: 0.9, ..candidate("b", "") },
            EntityMatch { entity_id: "light.second".to_string(), score: 0.9, ..candidate("c", "") },
        ];

        rank(&mut matches);
        assert_eq!(matches[0].entity_id, "light.first");
        assert_eq!(matches[1].entity_id, "light.second");
        assert_eq!(matches[2].score, 0.5);
    }

    #[test]
    fn test_resolve_by_name() {
        let entities = vec![
            Entity::new("automation.morning", "on").with_friendly_name("Morning Routine"),
            Entity::new("automation.night", "on").with_friendly_name("Night Lights"),
        ];
        let r = resolver();

        let m = r.resolve_by_name(&entities, "morning").unwrap();
        assert_eq!(m.entity_id, "automation.morning");
        assert_eq!(m.score, 0.9);

        let m = r.resolve_by_name(&entities, "automation.night").unwrap();
        assert_eq!(m.entity_id, "automation.night");
        assert_eq!(m.score, 1.0);

        let err = r.resolve_by_name(&entities, "vacuum").unwrap_err();
        assert!(err.to_string().contains("name='vacuum'"));
    }

    #[test]
    fn test_resolve_by_name_prefers_exact() {
        let entities = vec![
            Entity::new("scene.movie_night", "scening").with_friendly_name("Movie Night Dim"),
            Entity::new("scene.movie", "scening").with_friendly_name("Movie"),
        ];

        let m = resolver().resolve_by_name(&entities, "movie").unwrap();
        assert_eq!(m.entity_id, "scene.movie");
    }

    #[test]
    fn test_resolver_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Resolver>();
    }
}
