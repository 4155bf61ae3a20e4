//! Entity type phrases to Home Assistant domains
//!
//! Keyword sets overlap ("temperature" is both a climate and a sensor word),
//! so categories are always scanned in declaration order and the first
//! category with a matching keyword wins.

use std::fmt;

use serde::Serialize;

/// Domain categories the resolver understands, in scan order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainCategory {
    Light,
    Switch,
    Fan,
    Climate,
    Cover,
    Sensor,
}

impl DomainCategory {
    /// All categories in the order they are scanned
    pub const ALL: [DomainCategory; 6] = [
        DomainCategory::Light,
        DomainCategory::Switch,
        DomainCategory::Fan,
        DomainCategory::Climate,
        DomainCategory::Cover,
        DomainCategory::Sensor,
    ];

    /// Home Assistant domain name (the entity_id prefix)
    pub fn domain(self) -> &'static str {
        match self {
            DomainCategory::Light => "light",
            DomainCategory::Switch => "switch",
            DomainCategory::Fan => "fan",
            DomainCategory::Climate => "climate",
            DomainCategory::Cover => "cover",
            DomainCategory::Sensor => "sensor",
        }
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            DomainCategory::Light => &["light", "lights", "lamp", "lamps", "bulb", "bulbs"],
            DomainCategory::Switch => &["switch", "switches", "outlet", "outlets", "plug", "plugs"],
            DomainCategory::Fan => &["fan", "fans", "ceiling", "exhaust"],
            DomainCategory::Climate => &[
                "climate",
                "thermostat",
                "ac",
                "heat",
                "temp",
                "temperature",
                "hvac",
            ],
            DomainCategory::Cover => &[
                "cover", "covers", "blind", "blinds", "curtain", "curtains", "shade", "shades",
                "garage", "door", "doors",
            ],
            DomainCategory::Sensor => &[
                "sensor",
                "sensors",
                "temperature",
                "humidity",
                "motion",
                "occupancy",
            ],
        }
    }

    /// Category a free-text type phrase refers to.
    ///
    /// A keyword matches when it appears anywhere in the lowercased phrase,
    /// so "ac" also matches inside longer words.
    pub fn detect(phrase: &str) -> Option<DomainCategory> {
        let phrase = phrase.to_lowercase();
        Self::ALL.into_iter().find(|category| {
            category
                .keywords()
                .iter()
                .any(|keyword| phrase.contains(keyword))
        })
    }
}

impl fmt::Display for DomainCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.domain())
    }
}

/// 1.0 when the type phrase resolves to `entity_domain`, 0.0 otherwise
pub fn classify_domain(entity_domain: &str, type_phrase: &str) -> f64 {
    match DomainCategory::detect(type_phrase) {
        Some(category) if category.domain() == entity_domain => 1.0,
        _ => 0.0,
    }
}
