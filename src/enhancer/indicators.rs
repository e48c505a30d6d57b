//! Curated phrase sets for pain-point, solution, commercial-intent, timing and
//! competition framing. All phrases are stored pre-normalized (see [`normalize`]).

use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorKind {
    PainPoint,
    Solution,
}

pub struct PhraseCategory {
    pub name: &'static str,
    pub kind: IndicatorKind,
    /// Contribution of one hit to match strength.
    pub weight: f64,
    pub phrases: &'static [&'static str],
}

pub const CATEGORIES: &[PhraseCategory] = &[
    PhraseCategory {
        name: "urgency",
        kind: IndicatorKind::PainPoint,
        weight: 1.2,
        phrases: &["urgent", "asap", "desperately", "critical", "immediately", "right now", "deadline"],
    },
    PhraseCategory {
        name: "cost_complaint",
        kind: IndicatorKind::PainPoint,
        weight: 1.0,
        phrases: &[
            "too expensive",
            "overpriced",
            "costs too much",
            "can't afford",
            "price hike",
            "pricing is insane",
            "waste of money",
        ],
    },
    PhraseCategory {
        name: "capability_gap",
        kind: IndicatorKind::PainPoint,
        weight: 1.1,
        phrases: &[
            "no way to",
            "doesn't support",
            "does not support",
            "wish there was",
            "missing feature",
            "can't find",
            "lacks",
            "frustrating",
            "struggling with",
            "broken",
            "hate",
        ],
    },
    PhraseCategory {
        name: "manual_work",
        kind: IndicatorKind::PainPoint,
        weight: 0.9,
        phrases: &["manually", "spreadsheet", "tedious", "time-consuming", "copy paste", "by hand", "hours every"],
    },
    PhraseCategory {
        name: "solution_seeking",
        kind: IndicatorKind::Solution,
        weight: 1.0,
        phrases: &[
            "looking for",
            "recommend",
            "alternative to",
            "is there a tool",
            "need a tool",
            "any app",
            "solution for",
            "how do you handle",
        ],
    },
    PhraseCategory {
        name: "product_mention",
        kind: IndicatorKind::Solution,
        weight: 0.8,
        phrases: &["built a", "launched", "we made", "open source", "integration", "automate", "automation"],
    },
];

pub const COMMERCIAL_INTENT: &[&str] = &[
    "pay for",
    "would pay",
    "willing to pay",
    "pricing",
    "subscription",
    "budget",
    "per month",
    "need a tool",
    "license",
    "invoice",
    "$",
];

pub const EARLY_MARKERS: &[&str] = &["just launched", "beta", "early access", "waitlist", "prototype", "new tool", "first version"];

pub const HOT_MARKERS: &[&str] = &[
    "everyone is doing",
    "everyone uses",
    "competitors",
    "so many tools",
    "crowded",
    "trending",
    "blowing up",
];

pub const DECLINING_MARKERS: &[&str] = &["shutting down", "abandoned", "no longer maintained", "sunset", "dead project", "deprecated"];

/// Novelty / alternative framing → low competition.
pub const NOVELTY_FRAMING: &[&str] = &[
    "alternative to",
    "no one has",
    "nobody offers",
    "doesn't exist",
    "wish there was",
    "can't find",
    "untapped",
];

/// Saturated-space framing → high competition.
pub const SATURATION_FRAMING: &[&str] = &[
    "everyone offers",
    "hard to differentiate",
    "so many tools",
    "saturated",
    "crowded",
    "too many options",
];

#[derive(Debug, Default, Clone, PartialEq)]
pub struct IndicatorMatch {
    pub pain_points: BTreeSet<String>,
    pub solutions: BTreeSet<String>,
    /// Distinct categories with at least one hit.
    pub categories_hit: usize,
    /// Sum of category weights over every matched phrase.
    pub weighted_hits: f64,
    pub commercial_hits: usize,
}

/// Lowercases, turns punctuation other than `$ ' -` into spaces, collapses
/// whitespace, and pads with a leading/trailing space so phrases match on word boundaries.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    let mut last_space = true;
    for ch in text.chars().flat_map(char::to_lowercase) {
        let keep = ch.is_alphanumeric() || matches!(ch, '$' | '\'' | '-');
        if keep {
            out.push(ch);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if !last_space {
        out.push(' ');
    }
    out
}

/// `normalized` must come from [`normalize`].
pub fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    if phrase == "$" {
        return normalized.contains('$');
    }
    let needle = format!(" {phrase} ");
    normalized.contains(&needle)
}

pub fn count_phrases(normalized: &str, phrases: &[&str]) -> usize {
    phrases.iter().filter(|p| contains_phrase(normalized, p)).count()
}

pub fn match_indicators(normalized: &str) -> IndicatorMatch {
    let mut m = IndicatorMatch::default();
    for category in CATEGORIES {
        let mut hit = false;
        for phrase in category.phrases {
            if contains_phrase(normalized, phrase) {
                hit = true;
                m.weighted_hits += category.weight;
                let bucket = match category.kind {
                    IndicatorKind::PainPoint => &mut m.pain_points,
                    IndicatorKind::Solution => &mut m.solutions,
                };
                bucket.insert((*phrase).to_string());
            }
        }
        if hit {
            m.categories_hit += 1;
        }
    }
    m.commercial_hits = count_phrases(normalized, COMMERCIAL_INTENT);
    m
}
