//! Event categorization — the controlled vocabulary.
//!
//! Category assignment is an ordered rule table evaluated top to bottom,
//! not a chain of conditionals: the first pattern that matches the
//! (normalized) description wins. Descriptions that match nothing keep
//! their source wording and fall into `Uncategorized`, which is excluded
//! from near-duplicate matching.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Controlled vocabulary for operational events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Cargo work counting toward laytime ("Full Work", "Laytime Commenced").
    Productive,
    WeatherDelay,
    Breakdown,
    WeekendHoliday,
    Survey,
    Inspection,
    Waiting,
    /// Source wording kept verbatim; not part of the controlled vocabulary.
    Uncategorized,
}

impl EventCategory {
    /// Whether the category participates in near-duplicate matching.
    pub fn is_controlled(self) -> bool {
        self != Self::Uncategorized
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Productive => "productive",
            Self::WeatherDelay => "weather_delay",
            Self::Breakdown => "breakdown",
            Self::WeekendHoliday => "weekend_holiday",
            Self::Survey => "survey",
            Self::Inspection => "inspection",
            Self::Waiting => "waiting",
            Self::Uncategorized => "uncategorized",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct CategoryRule {
    regex: Regex,
    category: EventCategory,
}

/// Ordered description → category rules. More specific activity words come
/// before the broad productive-work patterns so "Cargo survey" classifies
/// as a survey, not cargo work.
static CATEGORY_RULES: LazyLock<Vec<CategoryRule>> = LazyLock::new(|| {
    vec![
        CategoryRule {
            regex: Regex::new(r"(?i)break\s?down|mechanical|machine|conveyor|engine").unwrap(),
            category: EventCategory::Breakdown,
        },
        CategoryRule {
            regex: Regex::new(r"(?i)rain|weather|storm|wind|swell").unwrap(),
            category: EventCategory::WeatherDelay,
        },
        CategoryRule {
            regex: Regex::new(r"(?i)weekend|holiday|saturday|sunday").unwrap(),
            category: EventCategory::WeekendHoliday,
        },
        CategoryRule {
            regex: Regex::new(r"(?i)survey|sounding").unwrap(),
            category: EventCategory::Survey,
        },
        CategoryRule {
            regex: Regex::new(r"(?i)inspection|formalit|customs|immigration|quarantine|pratique")
                .unwrap(),
            category: EventCategory::Inspection,
        },
        CategoryRule {
            regex: Regex::new(r"(?i)waiting|await|stand\s?-?by|idle").unwrap(),
            category: EventCategory::Waiting,
        },
        CategoryRule {
            regex: Regex::new(r"(?i)full\s+work|laytime|loading|discharg|unload|cargo|work")
                .unwrap(),
            category: EventCategory::Productive,
        },
    ]
});

/// Classify a description against the rule table.
pub fn categorize(description: &str) -> EventCategory {
    for rule in CATEGORY_RULES.iter() {
        if rule.regex.is_match(description) {
            return rule.category;
        }
    }
    EventCategory::Uncategorized
}

/// Case- and whitespace-insensitive form of a description, used as the
/// comparison key for duplicate detection.
pub fn normalize_description(description: &str) -> String {
    description
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
