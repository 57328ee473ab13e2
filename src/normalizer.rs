// 🧹 Text Normalizer - Matching form of review text
// Lowercase, strip markup/links/noise, collapse whitespace.
//
// The normalized form is only used for keyword matching. Quotes in the report
// always come from the original review text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// NOISE PATTERNS (applied after lowercasing)
// ============================================================================

/// Tag syntax only: a bare "<" or ">" in prose is not markup
static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[a-z][a-z0-9]*(?:\s[^<>]*)?/?>").unwrap());

static HTML_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(?:#[0-9]+|#x[0-9a-f]+|[a-z][a-z0-9]*);").unwrap());

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:https?://|www\.)\S+").unwrap());

static MENTION_OR_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[@#]\w+").unwrap());

// ============================================================================
// NORMALIZED TEXT
// ============================================================================

/// Lowercase alphanumeric tokens separated by single spaces.
///
/// Construct with [`normalize`]. An empty value means the review is
/// unclassifiable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when nothing survived normalization
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ').filter(|t| !t.is_empty())
    }

    /// Word-boundary phrase match: `phrase` must occur as a whole run of tokens.
    ///
    /// `phrase` is expected to be normalized already.
    pub fn contains_phrase(&self, phrase: &NormalizedText) -> bool {
        if self.is_empty() || phrase.is_empty() {
            return false;
        }
        // Padding both sides turns a substring search into a token-boundary search
        let haystack = format!(" {} ", self.0);
        let needle = format!(" {} ", phrase.0);
        haystack.contains(&needle)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Normalize raw review text for matching.
///
/// Steps, in order:
/// 1. Lowercase
/// 2. Remove HTML tags and entities
/// 3. Remove URLs, @mentions and #hashtags
/// 4. Replace every non-alphanumeric, non-whitespace char with a space
/// 5. Collapse whitespace and trim
///
/// Idempotent: `normalize(normalize(x).as_str()) == normalize(x)`.
pub fn normalize(raw: &str) -> NormalizedText {
    let lowered = raw.to_lowercase();

    let stripped = HTML_TAG.replace_all(&lowered, " ");
    let stripped = HTML_ENTITY.replace_all(&stripped, " ");
    let stripped = URL.replace_all(&stripped, " ");
    let stripped = MENTION_OR_TAG.replace_all(&stripped, " ");

    let cleaned: String = stripped
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    NormalizedText(cleaned.split_whitespace().collect::<Vec<_>>().join(" "))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_collapses_whitespace() {
        let text = normalize("  Great   APP,\n\tfast Service!  ");
        assert_eq!(text.as_str(), "great app fast service");
    }

    #[test]
    fn test_strips_html_and_entities() {
        let text = normalize("<p>Transfer&nbsp;failed</p> &amp; <b>again</b>");
        assert_eq!(text.as_str(), "transfer failed again");
    }

    #[test]
    fn test_comparison_signs_are_not_markup() {
        let text = normalize("rating < 2 because login fails > 3 times");
        assert_eq!(text.as_str(), "rating 2 because login fails 3 times");

        let text = normalize("<a href=\"x\">OTP</a> took >5 min, <3");
        assert_eq!(text.as_str(), "otp took 5 min 3");
    }

    #[test]
    fn test_strips_urls_mentions_and_hashtags() {
        let text = normalize("See https://cbe.com.et/help or www.boa.et @support #fail now");
        assert_eq!(text.as_str(), "see or now");
    }

    #[test]
    fn test_removes_emoji_and_punctuation() {
        let text = normalize("Sign-in broken 😡😡!!! Fix it...");
        assert_eq!(text.as_str(), "sign in broken fix it");
    }

    #[test]
    fn test_keeps_non_latin_letters() {
        let text = normalize("ጥሩ መተግበሪያ! Good");
        assert_eq!(text.as_str(), "ጥሩ መተግበሪያ good");
    }

    #[test]
    fn test_empty_and_noise_only_are_unclassifiable() {
        assert!(normalize("").is_empty());
        assert!(normalize("   \n\t ").is_empty());
        assert!(normalize("👍👍 !!! <br/>").is_empty());
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "Crash on LOGIN!!! <i>every</i> time https://x.y/z",
            "İstanbul Ünïcode &quot;quoted&quot; text",
            "  a  b  c ",
            "",
            "already normalized text",
            "@cbe #slow   Transfer_ID: 123-456",
        ];

        for raw in samples {
            let once = normalize(raw);
            let twice = normalize(once.as_str());
            assert_eq!(once, twice, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_phrase_match_respects_word_boundaries() {
        let text = normalize("Please add a login option, the pin screen is slow");

        assert!(text.contains_phrase(&normalize("login")));
        assert!(text.contains_phrase(&normalize("PIN")));
        assert!(text.contains_phrase(&normalize("please add")));
        assert!(!text.contains_phrase(&normalize("log")));
        assert!(!text.contains_phrase(&normalize("add login")));
        assert!(!text.contains_phrase(&normalize("")));
    }

    #[test]
    fn test_phrase_match_finds_overlapping_candidates() {
        let text = normalize("ba a a");
        assert!(text.contains_phrase(&normalize("a a")));
    }

    #[test]
    fn test_tokens() {
        let text = normalize("Slow transfer, again");
        let tokens: Vec<&str> = text.tokens().collect();
        assert_eq!(tokens, vec!["slow", "transfer", "again"]);
        assert_eq!(normalize("").tokens().count(), 0);
    }
}
