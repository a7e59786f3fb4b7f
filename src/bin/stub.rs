//! # Topic Gardener stub
//! Stateless reconciliation: a small keyword table and a prefix match
//! against the caller's pinned/anchor labels, no registry, no counts, no
//! refactor loop. Exposes only `POST /classify` on its own host/port.

use axum::{routing::post, Json, Router};
use clap::Parser;
use serde::{Deserialize, Serialize};
use topic_gardener::config::StubConfig;
use topic_gardener::error::ApiError;
use topic_gardener::slug::slugify;

const DEFAULT_ANCHORS: &[&str] = topic_gardener::config::DEFAULT_ANCHORS;

const KEYWORDS: &[(&str, &str)] = &[
    ("climate", "climate"),
    ("energy", "energy"),
    ("health", "health"),
    ("education", "education"),
    ("school", "education"),
    ("vote", "governance"),
    ("election", "governance"),
    ("delegate", "governance"),
    ("tax", "economy"),
    ("budget", "economy"),
];

fn detect_topic(text: &str) -> Option<&'static str> {
    let normalized = text.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(keyword, _)| normalized.contains(keyword))
        .map(|(_, label)| *label)
}

/// Prefix-match `label` against `pinned ++ anchors` (deduplicated,
/// first-occurrence order); fall back to the slugified label itself.
fn reconcile(label: &str, anchors: &[String], pinned: &[String]) -> String {
    let target = slugify(label);
    let mut ordered: Vec<&String> = Vec::new();
    for candidate in pinned.iter().chain(anchors.iter()) {
        if !ordered.iter().any(|o| **o == *candidate) {
            ordered.push(candidate);
        }
    }
    for candidate in ordered {
        let candidate_slug = slugify(candidate);
        if target.starts_with(&candidate_slug) || candidate_slug.starts_with(&target) {
            return candidate_slug;
        }
    }
    target
}

/// The `detect_topic(text) or (anchors[0] if anchors else "general")`
/// fallback, made explicit: a keyword hit wins outright; only on a miss do
/// we fall back to the first anchor, else `"general"`.
fn choose_topic(text: &str, anchors: &[String], pinned: &[String]) -> String {
    let label = match detect_topic(text) {
        Some(hit) => hit.to_string(),
        None => anchors.first().cloned().unwrap_or_else(|| "general".to_string()),
    };
    reconcile(&label, anchors, pinned)
}

#[derive(Debug, Default, Deserialize)]
struct ClassifyRequest {
    #[serde(default)]
    text: String,
    #[serde(default)]
    anchors: Vec<String>,
    #[serde(default)]
    pinned: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ClassifyResponse {
    topic: String,
    provider: &'static str,
    anchors: Vec<String>,
    pinned: Vec<String>,
}

async fn classify(
    body: Result<Json<ClassifyRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let Json(req) = body.map_err(|_| ApiError::InvalidBody)?;
    let anchors = if req.anchors.is_empty() {
        DEFAULT_ANCHORS.iter().map(|s| s.to_string()).collect()
    } else {
        req.anchors
    };
    let pinned = req.pinned;

    let topic = choose_topic(&req.text, &anchors, &pinned);

    Ok(Json(ClassifyResponse {
        topic,
        provider: "topic-gardener",
        anchors,
        pinned,
    }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

fn router() -> Router {
    Router::new().route("/classify", post(classify)).fallback(not_found)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cfg = StubConfig::parse();
    let addr: std::net::SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;

    tracing::info!(target: "stub", %addr, "topic-gardener stub listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_hit_wins_outright() {
        let anchors = vec!["general".to_string()];
        let topic = choose_topic("new climate plan", &anchors, &[]);
        assert_eq!(topic, "climate");
    }

    #[test]
    fn miss_falls_back_to_first_anchor() {
        let anchors = vec!["economy".to_string(), "society".to_string()];
        let topic = choose_topic("a quiet afternoon", &anchors, &[]);
        assert_eq!(topic, "economy");
    }

    #[test]
    fn miss_with_no_anchors_falls_back_to_general() {
        let topic = choose_topic("a quiet afternoon", &[], &[]);
        assert_eq!(topic, "general");
    }

    #[test]
    fn reconcile_prefers_pinned_prefix_match() {
        let anchors = vec!["society".to_string()];
        let pinned = vec!["governance-reform".to_string()];
        let topic = choose_topic("election results in", &anchors, &pinned);
        assert_eq!(topic, "governance-reform");
    }
}
