//! # Slugifier
//! Deterministic label → key canonicalization shared by the registry and
//! the stub binary.

use once_cell::sync::Lazy;
use regex::Regex;

static HYPHEN_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("hyphen-run regex"));

/// Canonicalize `label` into a lowercase, alphanumeric-plus-hyphen key.
/// Empty results fall back to `"general"`.
pub fn slugify(label: &str) -> String {
    let lower = label.trim().to_lowercase();
    let hyphenated: String = lower
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let collapsed = HYPHEN_RUNS.replace_all(&hyphenated, "-");
    let trimmed = collapsed.trim_matches('-');
    if trimmed.is_empty() {
        "general".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_lowercases() {
        assert_eq!(slugify("  Climate Policy  "), "climate-policy");
    }

    #[test]
    fn collapses_consecutive_separators() {
        assert_eq!(slugify("foo---bar__baz"), "foo-bar-baz");
    }

    #[test]
    fn empty_input_falls_back_to_general() {
        assert_eq!(slugify(""), "general");
        assert_eq!(slugify("   "), "general");
        assert_eq!(slugify("***"), "general");
    }

    #[test]
    fn idempotent() {
        for input in ["Climate Policy", "  ---Foo Bar---  ", "already-a-slug"] {
            let once = slugify(input);
            let twice = slugify(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn alphanumeric_passthrough() {
        assert_eq!(slugify("dow30"), "dow30");
    }
}
