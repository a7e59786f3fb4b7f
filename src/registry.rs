//! # Topic registry & refactor engine
//! The online classification path and the six-pass scheduled refactor,
//! both behind a single coarse `parking_lot::Mutex` — no finer-grained
//! locking, no lock-free paths.
//!
//! Topics are kept in an `IndexMap` (not a `HashMap`) so that iteration
//! order in the merge/rename/prune passes is deterministic (creation
//! order), which snapshotting keys before mutating depends on.

use crate::config::{Config, DEFAULT_ANCHORS, MAX_OPERATIONS};
use crate::similarity::cosine;
use crate::slug::slugify;
use crate::tokenizer::tokenize;
use crate::topic::{count_ordered, rank_by_count, AnchorAction, Operation, TopicRecord, TopicSummary};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// The result of a single `classify` call: the record it landed on, plus
/// the effective (post-default) anchor/pinned lists the caller should see
/// echoed back.
#[derive(Debug, Clone)]
pub struct ClassifyOutcome {
    pub topic: TopicRecord,
    pub anchors: Vec<String>,
    pub pinned: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    #[serde(rename = "topicCount")]
    pub topic_count: usize,
    pub topics: Vec<TopicSummary>,
    pub operations: usize,
    #[serde(rename = "lastRefactorAt")]
    pub last_refactor_at: Option<f64>,
}

struct Inner {
    topics: IndexMap<String, TopicRecord>,
    operations: VecDeque<Operation>,
    last_refactor_at: Option<f64>,
}

pub struct Registry {
    inner: Mutex<Inner>,
    similarity_threshold: f64,
    merge_threshold: f64,
    min_rename_count: u64,
    min_split_count: u64,
    min_anchor_promote_count: u64,
    min_anchor_archive_count: u64,
    stale_seconds: u64,
}

impl Registry {
    pub fn new(cfg: &Config) -> Self {
        Self {
            inner: Mutex::new(Inner {
                topics: IndexMap::new(),
                operations: VecDeque::new(),
                last_refactor_at: None,
            }),
            similarity_threshold: cfg.similarity_threshold,
            merge_threshold: cfg.merge_threshold,
            min_rename_count: cfg.min_rename_count,
            min_split_count: cfg.min_split_count,
            min_anchor_promote_count: cfg.min_anchor_promote_count,
            min_anchor_archive_count: cfg.min_anchor_archive_count,
            stale_seconds: cfg.stale_seconds,
        }
    }

    /// Classify `text` against `anchors`/`pinned` (empty ⇒ defaults),
    /// rebinding every record's anchor/pinned flags to this call's sets and
    /// attributing exactly one classification.
    pub fn classify(&self, text: &str, anchors: Vec<String>, pinned: Vec<String>) -> ClassifyOutcome {
        let anchors = if anchors.is_empty() {
            DEFAULT_ANCHORS.iter().map(|s| s.to_string()).collect()
        } else {
            anchors
        };

        let tokens = tokenize(text);
        let now = now_unix();

        let mut inner = self.inner.lock();

        let anchor_keys: HashSet<String> = anchors.iter().map(|a| slugify(a)).collect();
        let pinned_keys: HashSet<String> = pinned.iter().map(|p| slugify(p)).collect();
        for topic in inner.topics.values_mut() {
            topic.anchor = anchor_keys.contains(&topic.key);
            topic.pinned = pinned_keys.contains(&topic.key);
        }

        for label in &anchors {
            Self::ensure_topic(&mut inner.topics, label, true, false);
        }
        for label in &pinned {
            Self::ensure_topic(&mut inner.topics, label, false, true);
        }

        let chosen_label =
            Self::choose_label(&inner.topics, text, &tokens, &anchors, &pinned, self.similarity_threshold);

        let topic = Self::ensure_topic(&mut inner.topics, &chosen_label, false, false);
        topic.count += 1;
        topic.last_seen = now;
        if !tokens.is_empty() {
            topic.ingest_tokens(tokens.iter().map(|s| s.as_str()));
        }
        let result = topic.clone();

        debug!(target: "registry", key = %result.key, count = result.count, "classified");

        ClassifyOutcome {
            topic: result,
            anchors,
            pinned,
        }
    }

    /// Get-or-create the record for `label`, applying anchor/pinned
    /// promotion and alias bookkeeping for an existing record.
    fn ensure_topic<'a>(
        topics: &'a mut IndexMap<String, TopicRecord>,
        label: &str,
        anchor: bool,
        pinned: bool,
    ) -> &'a mut TopicRecord {
        let key = slugify(label);
        if !topics.contains_key(&key) {
            let stored_label = if label.is_empty() { key.clone() } else { label.to_string() };
            let mut rec = TopicRecord::new(key.clone(), stored_label);
            rec.anchor = anchor;
            rec.pinned = pinned;
            topics.insert(key.clone(), rec);
        } else {
            let topic = topics.get_mut(&key).unwrap();
            if anchor {
                topic.anchor = true;
            }
            if pinned {
                topic.pinned = true;
            }
            topic.alias(label);
        }
        topics.get_mut(&key).unwrap()
    }

    /// "Choose label" sub-algorithm.
    fn choose_label(
        topics: &IndexMap<String, TopicRecord>,
        text: &str,
        tokens: &[String],
        anchors: &[String],
        pinned: &[String],
        similarity_threshold: f64,
    ) -> String {
        let text_lower = text.to_lowercase();

        let mut ordered: Vec<&String> = Vec::new();
        for label in pinned.iter().chain(anchors.iter()) {
            if !ordered.iter().any(|o| **o == *label) {
                ordered.push(label);
            }
        }
        for label in &ordered {
            let key = slugify(label);
            if tokens.iter().any(|t| *t == key) || text_lower.contains(key.as_str()) {
                return (*label).clone();
            }
        }

        if !tokens.is_empty() && !topics.is_empty() {
            let text_vec = count_ordered(tokens);
            let mut best: Option<(&TopicRecord, f64)> = None;
            for topic in topics.values() {
                if topic.count < 2 {
                    continue;
                }
                let score = cosine(&text_vec, &topic.tokens);
                if score > best.map(|(_, s)| s).unwrap_or(0.0) {
                    best = Some((topic, score));
                }
            }
            if let Some((topic, score)) = best {
                if score >= similarity_threshold {
                    return topic.label.clone();
                }
            }
        }

        if !tokens.is_empty() {
            let counted = count_ordered(tokens);
            if let Some((tok, _)) = rank_by_count(&counted).into_iter().next() {
                return tok.to_string();
            }
        }

        anchors.first().cloned().unwrap_or_else(|| "general".to_string())
    }

    /// Run the six passes in order, appending to the bounded
    /// operation log under a single critical section.
    pub fn refactor(&self) -> Vec<Operation> {
        let now_unix_val = now_unix();
        let now = now_unix_val as f64;
        let mut inner = self.inner.lock();

        let mut ops = Vec::new();
        ops.extend(self.merge_pass(&mut inner.topics, now));
        ops.extend(self.rename_pass(&mut inner.topics, now));
        ops.extend(self.split_pass(&inner.topics, now));
        ops.extend(self.anchor_promote_pass(&inner.topics, &inner.operations, now, now_unix_val));
        ops.extend(self.anchor_archive_pass(&inner.topics, &inner.operations, now, now_unix_val));
        ops.extend(self.prune_pass(&mut inner.topics, now, now_unix_val));

        if !ops.is_empty() {
            inner.operations.extend(ops.iter().cloned());
            while inner.operations.len() > MAX_OPERATIONS {
                inner.operations.pop_front();
            }
        }
        inner.last_refactor_at = Some(now);

        info!(target: "refactor", ops = ops.len(), topics = inner.topics.len(), "refactor completed");
        ops
    }

    /// Fold near-duplicate topics together. Iterates a snapshot
    /// taken at pass entry (records are moved out of the map and back in)
    /// so in-place mutation of a survivor doesn't invalidate the scan.
    ///
    /// Once a topic at index `i` is itself folded away as a `drop`, the
    /// inner scan for that `i` stops immediately rather than continuing to
    /// compare a now-discarded record against the rest. See `DESIGN.md`.
    fn merge_pass(&self, topics: &mut IndexMap<String, TopicRecord>, now: f64) -> Vec<Operation> {
        let mut ops = Vec::new();
        let mut records: Vec<TopicRecord> = topics.drain(..).map(|(_, v)| v).collect();
        let mut used: HashSet<String> = HashSet::new();
        let n = records.len();

        for i in 0..n {
            if used.contains(&records[i].key) || (records[i].anchor && records[i].pinned) {
                continue;
            }
            let mut j = i + 1;
            while j < n {
                if used.contains(&records[j].key) {
                    j += 1;
                    continue;
                }
                let (left_part, right_part) = records.split_at_mut(j);
                let left = &mut left_part[i];
                let right = &mut right_part[0];

                if left.anchor && right.anchor {
                    j += 1;
                    continue;
                }
                let score = cosine(&left.tokens, &right.tokens);
                if score < self.merge_threshold {
                    j += 1;
                    continue;
                }

                let swap = right.anchor || right.count > left.count;
                let (keep, drop) = if swap { (right, left) } else { (left, right) };

                for (tok, cnt) in drop.tokens.iter() {
                    *keep.tokens.entry(tok.clone()).or_insert(0) += *cnt;
                }
                keep.count += drop.count;
                keep.last_seen = keep.last_seen.max(drop.last_seen);
                keep.alias(&drop.label);
                let drop_key = drop.key.clone();
                let keep_key = keep.key.clone();
                used.insert(drop_key.clone());

                ops.push(Operation::Merge {
                    from: drop_key,
                    to: keep_key,
                    at: now,
                    reason: format!("similarity {:.2}", score),
                });

                if swap {
                    // `left` (records[i]) was the one dropped; stop scanning for this `i`.
                    break;
                }
                j += 1;
            }
        }

        for record in records {
            if !used.contains(&record.key) {
                topics.insert(record.key.clone(), record);
            }
        }
        ops
    }

    /// Rename pass: adopt the most frequent token as the topic label.
    fn rename_pass(&self, topics: &mut IndexMap<String, TopicRecord>, now: f64) -> Vec<Operation> {
        let mut ops = Vec::new();
        let keys: Vec<String> = topics.keys().cloned().collect();

        for old_key in keys {
            let Some(candidate) = topics.get(&old_key) else { continue };
            if candidate.anchor || candidate.pinned {
                continue;
            }
            if candidate.count < self.min_rename_count {
                continue;
            }
            if candidate.tokens.is_empty() {
                continue;
            }
            let top_token = match candidate.top_token() {
                Some(t) => t.to_string(),
                None => continue,
            };
            if candidate.label.to_lowercase().contains(&top_token) {
                continue;
            }
            let new_key = slugify(&top_token);
            if new_key == old_key || topics.contains_key(&new_key) {
                continue;
            }

            let mut topic = topics.shift_remove(&old_key).expect("key present from snapshot");
            let old_label = topic.label.clone();
            topic.key = new_key.clone();
            topic.label = top_token.clone();
            topic.aliases.push(old_label);
            topics.insert(new_key.clone(), topic);

            ops.push(Operation::Rename {
                from: old_key,
                to: new_key,
                at: now,
                reason: format!("top keyword {}", top_token),
            });
        }
        ops
    }

    /// Split suggestion — advisory, never mutates.
    fn split_pass(&self, topics: &IndexMap<String, TopicRecord>, now: f64) -> Vec<Operation> {
        let mut ops = Vec::new();
        for topic in topics.values() {
            if topic.anchor || topic.pinned {
                continue;
            }
            if topic.count < self.min_split_count {
                continue;
            }
            let total = topic.token_total();
            if total < 4 {
                continue;
            }
            let ranked = rank_by_count(&topic.tokens);
            if ranked.len() < 2 {
                continue;
            }
            let primary_share = ranked[0].1 as f64 / total as f64;
            if primary_share > 0.45 {
                continue;
            }
            ops.push(Operation::Split {
                from: topic.key.clone(),
                suggested: vec![ranked[0].0.to_string(), ranked[1].0.to_string()],
                at: now,
                reason: "diverse keyword mix".to_string(),
            });
        }
        ops
    }

    /// Anchor-promotion suggestion — advisory, never mutates.
    fn anchor_promote_pass(
        &self,
        topics: &IndexMap<String, TopicRecord>,
        log: &VecDeque<Operation>,
        now: f64,
        now_unix_val: u64,
    ) -> Vec<Operation> {
        let mut ops = Vec::new();
        for topic in topics.values() {
            if topic.anchor || topic.pinned {
                continue;
            }
            if topic.count < self.min_anchor_promote_count {
                continue;
            }
            if topic.last_seen == 0 || now_unix_val.saturating_sub(topic.last_seen) > self.stale_seconds {
                continue;
            }
            if log
                .iter()
                .any(|op| op.is_anchor_action(AnchorAction::Promote) && op.from_key() == topic.key)
            {
                continue;
            }
            ops.push(Operation::Anchor {
                action: AnchorAction::Promote,
                from: topic.key.clone(),
                label: topic.label.clone(),
                count: topic.count,
                last_seen: None,
                at: now,
                reason: format!("count {}", topic.count),
            });
        }
        ops
    }

    /// Advisory only — never mutates, never deletes the record it names.
    fn anchor_archive_pass(
        &self,
        topics: &IndexMap<String, TopicRecord>,
        log: &VecDeque<Operation>,
        now: f64,
        now_unix_val: u64,
    ) -> Vec<Operation> {
        let mut ops = Vec::new();
        for topic in topics.values() {
            if !topic.anchor || topic.pinned || topic.key == "general" {
                continue;
            }
            if topic.count > self.min_anchor_archive_count {
                continue;
            }
            if topic.last_seen == 0 || now_unix_val.saturating_sub(topic.last_seen) < self.stale_seconds {
                continue;
            }
            if log
                .iter()
                .any(|op| op.is_anchor_action(AnchorAction::Archive) && op.from_key() == topic.key)
            {
                continue;
            }
            ops.push(Operation::Anchor {
                action: AnchorAction::Archive,
                from: topic.key.clone(),
                label: topic.label.clone(),
                count: topic.count,
                last_seen: Some(topic.last_seen),
                at: now,
                reason: "stale anchor".to_string(),
            });
        }
        ops
    }

    /// Prune stale, low-count, non-anchor/non-pinned records.
    fn prune_pass(
        &self,
        topics: &mut IndexMap<String, TopicRecord>,
        now: f64,
        now_unix_val: u64,
    ) -> Vec<Operation> {
        let mut ops = Vec::new();
        let keys: Vec<String> = topics.keys().cloned().collect();
        for key in keys {
            let Some(topic) = topics.get(&key) else { continue };
            if topic.anchor || topic.pinned {
                continue;
            }
            if topic.last_seen == 0 || now_unix_val.saturating_sub(topic.last_seen) <= self.stale_seconds {
                continue;
            }
            if topic.count > 2 {
                continue;
            }
            topics.shift_remove(&key);
            ops.push(Operation::Prune {
                from: key,
                at: now,
                reason: "stale topic".to_string(),
            });
        }
        ops
    }

    /// Build a point-in-time snapshot for the status endpoint.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let inner = self.inner.lock();
        let mut topics: Vec<TopicSummary> = inner
            .topics
            .values()
            .map(|t| {
                let alias_start = t.aliases.len().saturating_sub(3);
                TopicSummary {
                    key: t.key.clone(),
                    label: t.label.clone(),
                    count: t.count,
                    anchor: t.anchor,
                    pinned: t.pinned,
                    aliases: t.aliases[alias_start..].to_vec(),
                    last_seen: t.last_seen,
                    top_tokens: t.top_tokens(5),
                }
            })
            .collect();
        topics.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));

        RegistrySnapshot {
            topic_count: inner.topics.len(),
            topics,
            operations: inner.operations.len(),
            last_refactor_at: inner.last_refactor_at,
        }
    }

    pub fn get_operations(&self) -> Vec<Operation> {
        let inner = self.inner.lock();
        inner.operations.iter().cloned().collect()
    }

    /// Number of tracked topics. Exposed for tests and diagnostics.
    pub fn topic_count(&self) -> usize {
        self.inner.lock().topics.len()
    }

    /// Look up a single record by key. Exposed for tests and diagnostics.
    pub fn get_topic(&self, key: &str) -> Option<TopicRecord> {
        self.inner.lock().topics.get(key).cloned()
    }

    /// Insert or replace a record directly, bypassing `classify`. Intended
    /// for seeding fixtures in tests.
    pub fn seed_topic(&self, topic: TopicRecord) {
        let mut inner = self.inner.lock();
        inner.topics.insert(topic.key.clone(), topic);
    }
}

pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new(&Config::default())
    }

    #[test]
    fn fresh_classify_assigns_topic_and_count_one() {
        let reg = registry();
        let outcome = reg.classify("new climate plan", vec![], vec![]);
        assert_eq!(outcome.topic.label, "climate");
        assert_eq!(outcome.topic.key, "climate");
        assert_eq!(outcome.topic.count, 1);
    }

    #[test]
    fn anchor_alignment_creates_non_empty_topic() {
        let reg = registry();
        let outcome = reg.classify(
            "budget update for Q3",
            vec!["general".to_string(), "economy".to_string()],
            vec![],
        );
        assert!(!outcome.topic.key.is_empty());
        assert_eq!(outcome.topic.count, 1);
    }

    #[test]
    fn repeated_classify_increments_count_by_two() {
        let reg = registry();
        reg.classify("fed raises rates again", vec![], vec![]);
        let outcome = reg.classify("fed raises rates again", vec![], vec![]);
        assert_eq!(outcome.topic.count, 2);
    }

    #[test]
    fn anchor_flags_rebind_to_latest_call() {
        let reg = registry();
        let outcome = reg.classify("the that this", vec!["general".to_string()], vec![]);
        assert_eq!(outcome.topic.key, "general");
        assert!(reg.get_topic("general").unwrap().anchor);

        reg.classify("the that this", vec!["society".to_string()], vec![]);
        assert!(!reg.get_topic("general").unwrap().anchor);
        assert!(reg.get_topic("society").unwrap().anchor);
    }

    #[test]
    fn merge_pass_folds_overlapping_topics() {
        let reg = registry();
        let mut a = TopicRecord::new("election", "election");
        a.count = 5;
        a.ingest_tokens(["vote", "vote", "vote", "vote", "vote", "ballot", "ballot", "ballot", "ballot"]);
        let mut b = TopicRecord::new("elections", "elections");
        b.count = 3;
        b.ingest_tokens(["vote", "vote", "vote", "vote", "vote", "ballot", "ballot", "ballot", "ballot"]);
        reg.seed_topic(a);
        reg.seed_topic(b);

        let ops = reg.refactor();
        let merges: Vec<_> = ops.iter().filter(|op| matches!(op, Operation::Merge { .. })).collect();
        assert_eq!(merges.len(), 1);
        assert_eq!(reg.topic_count(), 1);
    }

    #[test]
    fn rename_pass_adopts_top_token_and_keeps_alias() {
        let reg = registry();
        let mut misc = TopicRecord::new("misc", "misc");
        misc.count = 6;
        misc.ingest_tokens([
            "climate", "climate", "climate", "climate", "climate", "climate", "climate", "climate",
            "climate", "climate", "budget",
        ]);
        reg.seed_topic(misc);

        let ops = reg.refactor();
        let renames: Vec<_> = ops
            .iter()
            .filter_map(|op| match op {
                Operation::Rename { to, .. } => Some(to.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(renames, vec!["climate".to_string()]);
        let renamed = reg.get_topic("climate").unwrap();
        assert!(renamed.aliases.contains(&"misc".to_string()));
    }

    #[test]
    fn prune_removes_stale_low_count_topic() {
        let cfg = Config {
            stale_seconds: 10,
            ..Config::default()
        };
        let reg = Registry::new(&cfg);
        let mut stale = TopicRecord::new("dead-topic", "dead topic");
        stale.count = 1;
        stale.last_seen = now_unix().saturating_sub(100);
        reg.seed_topic(stale);

        let ops = reg.refactor();
        assert!(matches!(ops.as_slice(), [Operation::Prune { .. }]));
        assert!(reg.get_topic("dead-topic").is_none());
    }

    #[test]
    fn anchor_archive_never_removes_general() {
        let cfg = Config {
            stale_seconds: 10,
            min_anchor_archive_count: 5,
            ..Config::default()
        };
        let reg = Registry::new(&cfg);
        let mut general = TopicRecord::new("general", "general");
        general.anchor = true;
        general.count = 1;
        general.last_seen = now_unix().saturating_sub(100);
        reg.seed_topic(general);

        let ops = reg.refactor();
        assert!(ops.iter().all(|op| !matches!(op, Operation::Anchor { action: AnchorAction::Archive, .. })));
        assert!(reg.get_topic("general").is_some());
    }

    #[test]
    fn idle_refactor_emits_no_mutating_ops() {
        let reg = registry();
        reg.classify("steady state topic text", vec![], vec![]);
        reg.refactor();
        let second = reg.refactor();
        assert!(second
            .iter()
            .all(|op| !matches!(op, Operation::Merge { .. } | Operation::Rename { .. } | Operation::Prune { .. })));
    }

    #[test]
    fn operation_log_is_capped() {
        let cfg = Config {
            stale_seconds: 0,
            ..Config::default()
        };
        let reg = Registry::new(&cfg);
        for i in 0..(MAX_OPERATIONS + 10) {
            let mut t = TopicRecord::new(format!("topic-{i}"), format!("topic {i}"));
            t.count = 1;
            t.last_seen = now_unix().saturating_sub(1);
            reg.seed_topic(t);
        }
        reg.refactor();
        assert!(reg.get_operations().len() <= MAX_OPERATIONS);
    }
}
