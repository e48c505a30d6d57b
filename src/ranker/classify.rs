//! Keyword-derived labels attached to each opportunity.

use crate::types::TechnicalComplexity;

const LOW_COMPLEXITY: &[&str] = &["api", "tool", "plugin", "extension", "script", "template", "widget", "bot"];
const HIGH_COMPLEXITY: &[&str] = &[
    "platform",
    "infrastructure",
    "marketplace",
    "engine",
    "network",
    "blockchain",
    "compiler",
    "database",
];

/// Total-engagement thresholds between market size tiers.
const SIZE_TIERS: &[(f64, &str)] = &[(100.0, "niche"), (1_000.0, "small"), (10_000.0, "medium")];
const LARGEST_TIER: &str = "large";
/// Reach across this many independent sources bumps the estimate one tier.
const BROAD_REACH_SOURCES: usize = 3;

/// Lowercase, `_`/space/`.`/`/` separators folded to `-`, each segment
/// naively singularized. `"Invoice_Tools"` and `"invoice-tool"` collide.
pub fn normalize_keyword(keyword: &str) -> String {
    keyword
        .to_lowercase()
        .split(|c: char| matches!(c, '-' | '_' | ' ' | '.' | '/'))
        .filter(|seg| !seg.is_empty())
        .map(singularize)
        .collect::<Vec<_>>()
        .join("-")
}

fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if stem.len() >= 2 {
            return format!("{stem}y");
        }
    }
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// "inventory-automation" → "Inventory Automation".
pub fn title_for(keyword: &str) -> String {
    keyword
        .split('-')
        .filter(|seg| !seg.is_empty())
        .map(|seg| {
            let mut chars = seg.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn technical_complexity(keyword: &str) -> TechnicalComplexity {
    let normalized = normalize_keyword(keyword);
    let segments: Vec<&str> = normalized.split('-').collect();
    if segments.iter().any(|s| HIGH_COMPLEXITY.contains(s)) {
        TechnicalComplexity::High
    } else if segments.iter().any(|s| LOW_COMPLEXITY.contains(s)) {
        TechnicalComplexity::Low
    } else {
        TechnicalComplexity::Medium
    }
}

pub fn estimated_market_size(total_engagement: f64, distinct_sources: usize) -> String {
    let mut tier = SIZE_TIERS
        .iter()
        .position(|(limit, _)| total_engagement < *limit)
        .unwrap_or(SIZE_TIERS.len());
    if distinct_sources >= BROAD_REACH_SOURCES {
        tier = (tier + 1).min(SIZE_TIERS.len());
    }
    SIZE_TIERS.get(tier).map_or(LARGEST_TIER, |(_, label)| label).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_normalization() {
        assert_eq!(normalize_keyword("Invoice_Tools"), "invoice-tool");
        assert_eq!(normalize_keyword("inventory automation"), "inventory-automation");
        assert_eq!(normalize_keyword("companies"), "company");
        assert_eq!(normalize_keyword("business"), "business");
        assert_eq!(normalize_keyword("status"), "status");
    }

    #[test]
    fn titles_are_title_cased() {
        assert_eq!(title_for("inventory-automation"), "Inventory Automation");
        assert_eq!(title_for("crm"), "Crm");
    }

    #[test]
    fn complexity_from_keyword_category() {
        assert_eq!(technical_complexity("billing-api"), TechnicalComplexity::Low);
        assert_eq!(technical_complexity("invoice-tools"), TechnicalComplexity::Low);
        assert_eq!(technical_complexity("data-platform"), TechnicalComplexity::High);
        assert_eq!(technical_complexity("inventory-automation"), TechnicalComplexity::Medium);
    }

    #[test]
    fn market_size_tiers() {
        assert_eq!(estimated_market_size(50.0, 1), "niche");
        assert_eq!(estimated_market_size(450.0, 1), "small");
        assert_eq!(estimated_market_size(450.0, 3), "medium");
        assert_eq!(estimated_market_size(50_000.0, 1), "large");
        assert_eq!(estimated_market_size(50_000.0, 5), "large");
    }
}
