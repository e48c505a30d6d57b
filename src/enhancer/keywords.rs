//! Semantic keyword extraction: content words, hyphenated compounds and
//! adjacent-pair bigrams ranked by salience.

use std::collections::HashMap;

const MIN_TOKEN_LEN: usize = 3;

/// Hyphenated tokens like `inventory-automation` name a topic more precisely than either half.
const COMPOUND_BOOST: f64 = 1.5;
const BIGRAM_BOOST: f64 = 1.25;

const STOP_WORDS: &[&str] = &[
    "about", "after", "again", "all", "also", "and", "any", "anyone", "are", "because", "been", "being", "best",
    "both", "but", "can", "can't", "could", "did", "does", "doesn't", "doing", "don't", "done", "each", "etc",
    "even", "ever", "every", "everyone", "few", "for", "from", "get", "gets", "getting", "got", "had", "has",
    "have", "having", "here", "how", "i'm", "i've", "into", "isn't", "it's", "its", "just", "know", "let",
    "like", "looking", "lot", "lots", "make", "many", "more", "most", "much", "need", "needs", "not", "now",
    "one", "only", "other", "our", "out", "over", "own", "per", "really", "same", "should", "some",
    "something", "still", "such", "than", "that", "the", "their", "them", "then", "there", "there's",
    "these", "they", "thing", "things", "this", "those", "too", "under", "use", "used", "using", "very",
    "via", "want", "was", "way", "we're", "were", "what", "when", "where", "which", "while", "who", "why",
    "will", "with", "without", "would", "yet", "you", "your",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

/// Every word token, lowercased, stop words included. Used for length/density measures.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '\''))
        .map(|t| t.trim_matches(|c| c == '-' || c == '\''))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn is_content_token(token: &str) -> bool {
    token.chars().count() >= MIN_TOKEN_LEN
        && !token.chars().all(|c| c.is_ascii_digit())
        && !is_stop_word(token)
}

/// Ranked keywords, most salient first. Ties break lexicographically so the
/// order is stable for identical input.
pub fn extract_keywords(tokens: &[String], max_keywords: usize) -> Vec<String> {
    let mut scores: HashMap<String, f64> = HashMap::new();

    for token in tokens.iter().filter(|t| is_content_token(t)) {
        let boost = if token.contains('-') { COMPOUND_BOOST } else { 1.0 };
        *scores.entry(token.clone()).or_default() += boost;
    }

    for pair in tokens.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if is_content_token(a) && is_content_token(b) && !a.contains('-') && !b.contains('-') && a != b {
            *scores.entry(format!("{a}-{b}")).or_default() += BIGRAM_BOOST;
        }
    }

    let mut ranked: Vec<(String, f64)> = scores.into_iter().collect();
    ranked.sort_by(|(ka, sa), (kb, sb)| sb.total_cmp(sa).then_with(|| ka.cmp(kb)));
    ranked.into_iter().take(max_keywords).map(|(k, _)| k).collect()
}
