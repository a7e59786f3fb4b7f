//! # Tokenizer
//! Extracts normalized tokens from free text for the similarity kernel and
//! the registry's token histograms.
//!
//! A token is a maximal run of `[a-z0-9][a-z0-9_-]{2,}` against the
//! lowercased input (minimum length 3). Stopwords are dropped; order and
//! duplicates are preserved since downstream "most frequent, ties by first
//! occurrence" logic depends on it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z0-9][a-z0-9_-]{2,}").expect("tokenizer regex"));

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "and", "the", "with", "for", "from", "that", "this", "their", "about", "into", "your",
        "you", "are", "was", "were", "will", "would", "should", "could", "have", "has", "had",
        "our", "they", "them", "who", "what", "when", "where", "why", "how", "also", "more",
        "than", "then", "there", "here", "over", "under", "out", "per", "via", "new", "old",
        "plan", "policy", "proposal", "draft", "vote", "votes", "voting",
    ]
    .into_iter()
    .collect()
});

/// Tokenize `text`: lowercase, extract token runs, drop stopwords.
/// Preserves order and duplicates.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .filter(|tok| !STOPWORDS.contains(tok.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_stopwords_and_short_tokens() {
        let toks = tokenize("The new climate plan is here");
        assert_eq!(toks, vec!["climate".to_string()]);
    }

    #[test]
    fn preserves_order_and_duplicates() {
        let toks = tokenize("budget budget economy");
        assert_eq!(toks, vec!["budget", "budget", "economy"]);
    }

    #[test]
    fn lowercases_input() {
        let toks = tokenize("CLIMATE Change");
        assert_eq!(toks, vec!["climate", "change"]);
    }

    #[test]
    fn hyphen_and_underscore_runs_are_single_tokens() {
        let toks = tokenize("carbon-tax rate_cut");
        assert_eq!(toks, vec!["carbon-tax", "rate_cut"]);
    }

    #[test]
    fn empty_text_yields_no_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("to a i").is_empty());
    }
}
