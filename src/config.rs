//! # Configuration
//! Command-line flags with environment-variable fallback. Every flag in
//! the full service also works as an env var of the same name
//! (upper-cased, hyphens to underscores) via `clap`'s `env` feature.

use clap::Parser;

pub const DEFAULT_ANCHORS: &[&str] = &["general", "governance", "economy", "society", "technology"];
pub const MAX_OPERATIONS: usize = 200;

#[derive(Debug, Clone, Parser)]
#[command(name = "topic-gardener", about = "Online topic registry with a scheduled refactor engine")]
pub struct Config {
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8070)]
    pub port: u16,

    #[arg(long = "refactor-seconds", env = "REFACTOR_SECONDS", default_value_t = 90)]
    pub refactor_seconds: u64,

    #[arg(long = "similarity-threshold", env = "SIMILARITY_THRESHOLD", default_value_t = 0.35)]
    pub similarity_threshold: f64,

    #[arg(long = "merge-threshold", env = "MERGE_THRESHOLD", default_value_t = 0.85)]
    pub merge_threshold: f64,

    #[arg(long = "min-rename-count", env = "MIN_RENAME_COUNT", default_value_t = 6)]
    pub min_rename_count: u64,

    #[arg(long = "min-split-count", env = "MIN_SPLIT_COUNT", default_value_t = 14)]
    pub min_split_count: u64,

    #[arg(long = "min-anchor-promote-count", env = "MIN_ANCHOR_PROMOTE_COUNT", default_value_t = 12)]
    pub min_anchor_promote_count: u64,

    #[arg(long = "min-anchor-archive-count", env = "MIN_ANCHOR_ARCHIVE_COUNT", default_value_t = 2)]
    pub min_anchor_archive_count: u64,

    #[arg(long = "stale-seconds", env = "STALE_SECONDS", default_value_t = 604_800)]
    pub stale_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8070,
            refactor_seconds: 90,
            similarity_threshold: 0.35,
            merge_threshold: 0.85,
            min_rename_count: 6,
            min_split_count: 14,
            min_anchor_promote_count: 12,
            min_anchor_archive_count: 2,
            stale_seconds: 604_800,
        }
    }
}

/// Config for the stub binary: only the listen address applies.
#[derive(Debug, Clone, Parser)]
#[command(name = "topic-gardener-stub", about = "Stateless topic reconciliation stub")]
pub struct StubConfig {
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8070)]
    pub port: u16,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8070,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = Config::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 8070);
        assert_eq!(cfg.refactor_seconds, 90);
        assert!((cfg.similarity_threshold - 0.35).abs() < 1e-9);
        assert!((cfg.merge_threshold - 0.85).abs() < 1e-9);
        assert_eq!(cfg.min_rename_count, 6);
        assert_eq!(cfg.min_split_count, 14);
        assert_eq!(cfg.min_anchor_promote_count, 12);
        assert_eq!(cfg.min_anchor_archive_count, 2);
        assert_eq!(cfg.stale_seconds, 604_800);
    }

    #[test]
    fn parses_from_cli_args() {
        let cfg = Config::parse_from([
            "topic-gardener",
            "--port",
            "9000",
            "--merge-threshold",
            "0.5",
        ]);
        assert_eq!(cfg.port, 9000);
        assert!((cfg.merge_threshold - 0.5).abs() < 1e-9);
        assert_eq!(cfg.host, "127.0.0.1");
    }
}
