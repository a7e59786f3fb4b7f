//! # Similarity kernel
//! Cosine similarity over sparse token-count vectors, used both to choose a
//! topic for a fresh classification and to decide which topics the merge
//! pass should fold together.

use indexmap::IndexMap;

/// Cosine similarity between two token-count maps. Returns `0.0` if either
/// map is empty or either norm is zero. Symmetric; range `[0, 1]`.
pub fn cosine(a: &IndexMap<String, u64>, b: &IndexMap<String, u64>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (smaller, larger) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = smaller
        .iter()
        .filter_map(|(tok, &count)| larger.get(tok).map(|&other| (count as f64) * (other as f64)))
        .sum();

    let norm_a = norm(a);
    let norm_b = norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

fn norm(v: &IndexMap<String, u64>) -> f64 {
    v.values().map(|&c| (c as f64) * (c as f64)).sum::<f64>().sqrt()
}
