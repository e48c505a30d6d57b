use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::config::EnhancerConfig;
use crate::enhancer::indicators::{self, DECLINING_MARKERS, EARLY_MARKERS, HOT_MARKERS};
use crate::enhancer::keywords::{extract_keywords, tokenize};
use crate::state::{KeywordActivity, VolumeTrend};
use crate::stats::{clamp_unit, saturate, weighted_unit};
use crate::types::{EnhancedSignal, MarketTiming, RawSignal};

/// Word count at which length-driven factors reach ~63% of their maximum.
const DENSITY_LENGTH_SCALE: f64 = 15.0;
const CONFIDENCE_LENGTH_SCALE: f64 = 25.0;
const MATCH_STRENGTH_SCALE: f64 = 2.0;
const COMMERCIAL_SCALE: f64 = 1.5;

#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("{0} is not a finite number")]
    NonFinite(&'static str),

    #[error("content has no word tokens")]
    NoTokens,
}

/// Turns raw collector output into scored, keyword-tagged signals.
///
/// Stateless apart from a read-only view of keyword activity, so one instance
/// can be shared across tasks behind an `Arc`.
pub struct SignalEnhancer {
    cfg: EnhancerConfig,
    activity: Arc<KeywordActivity>,
}

impl SignalEnhancer {
    pub fn new(cfg: EnhancerConfig, activity: Arc<KeywordActivity>) -> Self {
        Self { cfg, activity }
    }

    pub fn activity(&self) -> &Arc<KeywordActivity> {
        &self.activity
    }

    /// Never fails: a signal that cannot be scored comes back neutral with
    /// `MarketTiming::Unknown` instead of being dropped.
    pub fn enhance(&self, raw: RawSignal) -> EnhancedSignal {
        match self.try_enhance(&raw) {
            Ok(signal) => signal,
            Err(e) => {
                warn!(source = %raw.source, error = %e, "enhancement failed, using neutral scores");
                EnhancedSignal::neutral(raw)
            }
        }
    }

    pub fn try_enhance(&self, raw: &RawSignal) -> Result<EnhancedSignal, EnhanceError> {
        if !raw.engagement_score.is_finite() {
            return Err(EnhanceError::NonFinite("engagement_score"));
        }
        if !raw.credibility_weight.is_finite() {
            return Err(EnhanceError::NonFinite("credibility_weight"));
        }

        let tokens = tokenize(&raw.content);
        if tokens.is_empty() {
            return Err(EnhanceError::NoTokens);
        }
        let normalized = indicators::normalize(&raw.content);
        let matched = indicators::match_indicators(&normalized);

        let total_words = tokens.len() as f64;
        let unique_words = tokens.iter().collect::<HashSet<_>>().len() as f64;
        let density = (unique_words / total_words) * saturate(total_words, DENSITY_LENGTH_SCALE);

        let diversity = matched.categories_hit as f64 / indicators::CATEGORIES.len() as f64;
        let strength = saturate(matched.weighted_hits, MATCH_STRENGTH_SCALE);
        let indicator_factor = 0.5 * diversity + 0.5 * strength;
        let credibility = self.source_credibility(raw);

        let q = self.cfg.quality;
        let quality_score = weighted_unit(&[
            (q.density, density),
            (q.indicators, indicator_factor),
            (q.credibility, credibility),
        ]);

        let commercial = saturate(matched.commercial_hits as f64, COMMERCIAL_SCALE);
        let pairing = if !matched.pain_points.is_empty() && !matched.solutions.is_empty() {
            1.0
        } else {
            0.0
        };
        let b = self.cfg.business;
        let business_potential = weighted_unit(&[
            (b.diversity, diversity),
            (b.commercial, commercial),
            (b.pairing, pairing),
        ]);

        let c = self.cfg.confidence;
        let confidence_level = weighted_unit(&[
            (c.length, saturate(total_words, CONFIDENCE_LENGTH_SCALE)),
            (c.match_strength, strength),
            (c.credibility, credibility),
        ]);

        let semantic_keywords = extract_keywords(&tokens, self.cfg.max_keywords);
        let market_timing = self.classify_timing(&normalized, &semantic_keywords, raw);

        Ok(EnhancedSignal {
            id: raw.fingerprint(),
            raw: raw.clone(),
            quality_score,
            business_potential,
            confidence_level,
            pain_point_indicators: matched.pain_points,
            solution_indicators: matched.solutions,
            semantic_keywords,
            market_timing,
            credibility_weight: credibility,
        })
    }

    fn source_credibility(&self, raw: &RawSignal) -> f64 {
        let multiplier = self
            .cfg
            .source_credibility
            .get(&raw.source.to_lowercase())
            .copied()
            .unwrap_or(1.0);
        clamp_unit(raw.credibility_weight * multiplier)
    }

    fn classify_timing(&self, normalized: &str, keywords: &[String], raw: &RawSignal) -> MarketTiming {
        let early = indicators::count_phrases(normalized, EARLY_MARKERS);
        let hot = indicators::count_phrases(normalized, HOT_MARKERS);
        if early > 0 && early >= hot {
            return MarketTiming::Early;
        }
        if hot > 0 {
            return MarketTiming::Hot;
        }
        if indicators::count_phrases(normalized, DECLINING_MARKERS) > 0 {
            return MarketTiming::Declining;
        }
        let trend = keywords
            .first()
            .map(|k| self.activity.trend(k, raw.timestamp))
            .unwrap_or(VolumeTrend::Unknown);
        match trend {
            VolumeTrend::Falling => MarketTiming::Declining,
            VolumeTrend::Rising | VolumeTrend::Flat | VolumeTrend::Unknown => MarketTiming::Growing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn enhancer() -> SignalEnhancer {
        SignalEnhancer::new(
            EnhancerConfig::default(),
            Arc::new(KeywordActivity::new(chrono::Duration::hours(1))),
        )
    }

    fn raw(content: &str, source: &str, credibility: f64) -> RawSignal {
        RawSignal {
            content: content.to_string(),
            source: source.to_string(),
            timestamp: Utc::now(),
            engagement_score: 25.0,
            credibility_weight: credibility,
        }
    }

    fn assert_unit(x: f64) {
        assert!((0.0..=1.0).contains(&x), "score out of range: {x}");
    }

    #[test]
    fn commercial_pain_signal_scores_high() {
        let e = enhancer();
        let s = e.enhance(raw(
            "Urgent: we track inventory manually in a spreadsheet and it's tedious. Looking for an \
             inventory-automation tool, would pay $100 per month for something that works.",
            "reddit",
            0.8,
        ));
        assert_unit(s.quality_score);
        assert_unit(s.business_potential);
        assert_unit(s.confidence_level);
        assert!(s.business_potential > 0.5, "business={}", s.business_potential);
        assert!(s.pain_point_indicators.contains("manually"));
        assert!(s.solution_indicators.contains("looking for"));
        assert_eq!(s.semantic_keywords[0], "inventory-automation");
    }

    #[test]
    fn non_commercial_text_low_business_potential() {
        let e = enhancer();
        let s = e.enhance(raw(
            "The autumn light over the harbour was beautiful this evening, gulls circling the old lighthouse.",
            "reddit",
            0.9,
        ));
        assert!(s.business_potential < 0.1, "business={}", s.business_potential);
        // well-written text is not penalized on quality
        assert!(s.quality_score > 0.3, "quality={}", s.quality_score);
    }

    #[test]
    fn source_multiplier_adjusts_credibility() {
        let e = enhancer();
        let hn = e.enhance(raw("looking for a billing tool", "HackerNews", 0.8));
        let tw = e.enhance(raw("looking for a billing tool", "twitter", 0.8));
        assert!((hn.credibility_weight - 0.88).abs() < 1e-9);
        assert!(hn.confidence_level > tw.confidence_level);
        let capped = e.enhance(raw("looking for a billing tool", "hackernews", 1.0));
        assert_eq!(capped.credibility_weight, 1.0);
    }

    #[test]
    fn timing_markers() {
        let e = enhancer();
        assert_eq!(e.enhance(raw("We just launched our beta", "reddit", 0.5)).market_timing, MarketTiming::Early);
        assert_eq!(
            e.enhance(raw("Everyone is doing this, competitors everywhere", "reddit", 0.5)).market_timing,
            MarketTiming::Hot
        );
        assert_eq!(
            e.enhance(raw("The project was abandoned last year", "reddit", 0.5)).market_timing,
            MarketTiming::Declining
        );
        assert_eq!(e.enhance(raw("Need a CRM for plumbers", "reddit", 0.5)).market_timing, MarketTiming::Growing);
    }

    #[test]
    fn non_finite_engagement_degrades_to_neutral() {
        let e = enhancer();
        let mut r = raw("looking for a tool", "reddit", 0.5);
        r.engagement_score = f64::NAN;
        assert!(matches!(e.try_enhance(&r), Err(EnhanceError::NonFinite(_))));
        let s = e.enhance(r);
        assert_eq!(s.market_timing, MarketTiming::Unknown);
        assert_eq!(s.quality_score, 0.0);
        assert!(s.semantic_keywords.is_empty());
    }

    #[test]
    fn punctuation_only_content_degrades() {
        let e = enhancer();
        let s = e.enhance(raw("?!... ---", "reddit", 0.5));
        assert_eq!(s.market_timing, MarketTiming::Unknown);
    }

    #[test]
    fn enhancement_is_deterministic() {
        let e = enhancer();
        let r = raw("Looking for an alternative to Shopify inventory sync", "reddit", 0.7);
        let a = e.enhance(r.clone());
        let b = e.enhance(r);
        assert_eq!(a.semantic_keywords, b.semantic_keywords);
        assert_eq!(a.quality_score, b.quality_score);
        assert_eq!(a.id, b.id);
    }
}
