//! # Topic record & operation log entries
//! The registry's sole first-class entity (`TopicRecord`) plus the tagged
//! variant emitted by each refactor pass (`Operation`).
//!
//! Token histograms use `IndexMap` rather than `HashMap` so "most frequent
//! token, ties broken by first occurrence" is answerable directly: a
//! stable sort by count over an insertion-ordered map keeps equal-count
//! entries in the order they were first seen, with no secondary key
//! needed.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single topic tracked by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRecord {
    pub key: String,
    pub label: String,
    pub anchor: bool,
    pub pinned: bool,
    pub count: u64,
    pub tokens: IndexMap<String, u64>,
    pub aliases: Vec<String>,
    /// Unix seconds of the last classification attributed to this record;
    /// zero if never classified.
    pub last_seen: u64,
}

impl TopicRecord {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            anchor: false,
            pinned: false,
            count: 0,
            tokens: IndexMap::new(),
            aliases: Vec::new(),
            last_seen: 0,
        }
    }

    /// Add `label` to `aliases` if it differs from the stored label and
    /// isn't already present.
    pub fn alias(&mut self, label: &str) {
        if !label.is_empty() && label != self.label && !self.aliases.iter().any(|a| a == label) {
            self.aliases.push(label.to_string());
        }
    }

    /// Merge a token multiset (as produced by the tokenizer) into the
    /// histogram, incrementing existing counts.
    pub fn ingest_tokens<'a, I: IntoIterator<Item = &'a str>>(&mut self, tokens: I) {
        merge_counts(&mut self.tokens, tokens);
    }

    /// Most frequent token, ties broken by first occurrence. `None` if the
    /// histogram is empty.
    pub fn top_token(&self) -> Option<&str> {
        rank_by_count(&self.tokens).into_iter().next().map(|(k, _)| k)
    }

    /// Up to `n` most frequent tokens, ties broken by first occurrence.
    pub fn top_tokens(&self, n: usize) -> Vec<String> {
        rank_by_count(&self.tokens)
            .into_iter()
            .take(n)
            .map(|(k, _)| k.to_string())
            .collect()
    }

    pub fn token_total(&self) -> u64 {
        self.tokens.values().sum()
    }
}

/// Accumulate `tokens` into `map`, incrementing existing entries in place
/// (preserving each key's original insertion position).
pub fn merge_counts<'a, I: IntoIterator<Item = &'a str>>(map: &mut IndexMap<String, u64>, tokens: I) {
    for tok in tokens {
        *map.entry(tok.to_string()).or_insert(0) += 1;
    }
}

/// Count a fresh token sequence into an insertion-ordered histogram.
pub fn count_ordered(tokens: &[String]) -> IndexMap<String, u64> {
    let mut map = IndexMap::new();
    merge_counts(&mut map, tokens.iter().map(|s| s.as_str()));
    map
}

/// Rank entries by count descending; a stable sort means equal counts keep
/// the map's insertion order, i.e. ties broken by first occurrence.
pub fn rank_by_count(map: &IndexMap<String, u64>) -> Vec<(&str, u64)> {
    let mut ranked: Vec<(&str, u64)> = map.iter().map(|(k, &v)| (k.as_str(), v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// A condensed view of a `TopicRecord` returned by `snapshot()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSummary {
    pub key: String,
    pub label: String,
    pub count: u64,
    pub anchor: bool,
    pub pinned: bool,
    pub aliases: Vec<String>,
    #[serde(rename = "lastSeen")]
    pub last_seen: u64,
    #[serde(rename = "topTokens")]
    pub top_tokens: Vec<String>,
}

/// An entry in the bounded operation log produced by a refactor pass.
///
/// Uses an internally-tagged enum so JSON consumers can match on `"type"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    #[serde(rename = "merge")]
    Merge {
        from: String,
        to: String,
        at: f64,
        reason: String,
    },
    #[serde(rename = "rename")]
    Rename {
        from: String,
        to: String,
        at: f64,
        reason: String,
    },
    #[serde(rename = "split")]
    Split {
        from: String,
        suggested: Vec<String>,
        at: f64,
        reason: String,
    },
    #[serde(rename = "anchor")]
    Anchor {
        action: AnchorAction,
        from: String,
        label: String,
        count: u64,
        #[serde(rename = "lastSeen", skip_serializing_if = "Option::is_none")]
        last_seen: Option<u64>,
        at: f64,
        reason: String,
    },
    #[serde(rename = "prune")]
    Prune { from: String, at: f64, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorAction {
    Promote,
    Archive,
}

impl Operation {
    /// The topic key this operation concerns (`from` in every variant).
    pub fn from_key(&self) -> &str {
        match self {
            Operation::Merge { from, .. }
            | Operation::Rename { from, .. }
            | Operation::Split { from, .. }
            | Operation::Anchor { from, .. }
            | Operation::Prune { from, .. } => from,
        }
    }

    /// `true` if this is an `anchor` operation with the given action.
    pub fn is_anchor_action(&self, action: AnchorAction) -> bool {
        matches!(self, Operation::Anchor { action: a, .. } if *a == action)
    }
}
