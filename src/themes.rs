// 🏷️ Theme Classifier - Keyword rules as data
// Multi-label: every rule is evaluated independently against normalized text.
//
// Matching policy: word boundaries. A keyword is normalized with the same
// normalizer as the review, then must appear as a whole run of tokens
// ("pin" matches "forgot pin" but not "spinning").

use crate::error::InsightError;
use crate::normalizer::{normalize, NormalizedText};
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub const ACCOUNT_ACCESS: &str = "Account Access";
pub const TRANSACTION_PERFORMANCE: &str = "Transaction Performance";
pub const USER_INTERFACE: &str = "User Interface/UX";
pub const CUSTOMER_SUPPORT: &str = "Customer Support";
pub const FEATURE_REQUESTS: &str = "Feature Requests";

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeRule {
    /// Theme name as shown in reports
    pub theme: String,

    /// Keyword phrases; any one is enough to match
    pub keywords: Vec<String>,

    /// Recommended actions when this theme is a pain point
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
}

impl ThemeRule {
    pub fn new(theme: &str, keywords: &[&str]) -> Self {
        ThemeRule {
            theme: theme.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            actions: Vec::new(),
        }
    }

    pub fn with_actions(mut self, actions: &[&str]) -> Self {
        self.actions = actions.iter().map(|a| a.to_string()).collect();
        self
    }
}

/// Keyword kept as configured, plus its matching form
#[derive(Debug, Clone)]
struct Keyword {
    literal: String,
    pattern: NormalizedText,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: ThemeRule,
    keywords: Vec<Keyword>,
}

impl CompiledRule {
    fn compile(rule: ThemeRule) -> Self {
        let mut seen = HashSet::new();
        let mut keywords = Vec::new();

        for literal in &rule.keywords {
            let pattern = normalize(literal);
            if pattern.is_empty() {
                warn!(theme = %rule.theme, keyword = %literal, "keyword is empty after normalization, ignoring");
                continue;
            }
            if !seen.insert(pattern.clone()) {
                debug!(theme = %rule.theme, keyword = %literal, "duplicate keyword collapsed");
                continue;
            }
            keywords.push(Keyword {
                literal: literal.trim().to_string(),
                pattern,
            });
        }

        CompiledRule { rule, keywords }
    }

    fn matched_keywords(&self, text: &NormalizedText) -> BTreeSet<String> {
        self.keywords
            .iter()
            .filter(|kw| text.contains_phrase(&kw.pattern))
            .map(|kw| kw.literal.clone())
            .collect()
    }
}

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

/// One matched theme with the literal keyword evidence behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeMatch {
    pub theme: String,
    pub keywords: BTreeSet<String>,
}

// ============================================================================
// CLASSIFIER CAPABILITY
// ============================================================================

/// classify(text) → themes with evidence.
///
/// The keyword catalog is the only implementation today; a model-backed
/// classifier can sit behind the same trait.
pub trait ThemeClassifier: Send + Sync {
    /// Matched themes in a stable order. Empty text matches nothing.
    fn classify(&self, text: &NormalizedText) -> Vec<ThemeMatch>;

    /// Theme names this classifier can emit, in reporting order
    fn theme_names(&self) -> Vec<String>;
}

// ============================================================================
// THEME CATALOG
// ============================================================================

/// Ordered, immutable set of keyword rules
#[derive(Debug, Clone)]
pub struct ThemeCatalog {
    rules: Vec<CompiledRule>,
}

impl ThemeCatalog {
    /// Build a catalog, rejecting empty catalogs and duplicate theme names
    pub fn from_rules(rules: Vec<ThemeRule>) -> Result<Self, InsightError> {
        if rules.is_empty() {
            return Err(InsightError::InvalidCatalog("catalog has no rules".to_string()));
        }

        let mut names = HashSet::new();
        for rule in &rules {
            let name = rule.theme.trim();
            if name.is_empty() {
                return Err(InsightError::InvalidCatalog("rule with empty theme name".to_string()));
            }
            if !names.insert(name.to_string()) {
                return Err(InsightError::InvalidCatalog(format!("duplicate theme '{}'", name)));
            }
        }

        let rules: Vec<CompiledRule> = rules.into_iter().map(CompiledRule::compile).collect();
        for compiled in &rules {
            if compiled.keywords.is_empty() {
                warn!(theme = %compiled.rule.theme, "theme has no usable keywords and will never match");
            }
        }

        Ok(ThemeCatalog { rules })
    }

    /// Load rules from a YAML (.yaml/.yml) or JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read theme catalog: {:?}", path))?;

        let rules: Vec<ThemeRule> = if is_yaml(path) {
            serde_yaml::from_str(&content).context("Failed to parse theme catalog YAML")?
        } else {
            serde_json::from_str(&content).context("Failed to parse theme catalog JSON")?
        };

        let catalog = ThemeCatalog::from_rules(rules)?;
        debug!(path = ?path, themes = catalog.len(), "theme catalog loaded");
        Ok(catalog)
    }

    /// Catalog used when no file is configured
    pub fn default_catalog() -> Self {
        let rules = vec![
            ThemeRule::new(
                ACCOUNT_ACCESS,
                &[
                    "login", "log in", "signin", "sign in", "password", "pin", "otp",
                    "locked", "locked out", "verification", "verify", "face id",
                    "biometric", "fingerprint", "activation", "register", "registration",
                ],
            )
            .with_actions(&[
                "Improve OTP reliability (retry logic, fallback providers) and show clear error messages on failed sign-in.",
                "Add in-app account-access troubleshooting and instrument authentication failure metrics.",
            ]),
            ThemeRule::new(
                TRANSACTION_PERFORMANCE,
                &[
                    "slow", "lag", "loading", "timeout", "time out", "delay", "delayed",
                    "pending", "speed", "transfer", "transaction", "payment",
                ],
            )
            .with_actions(&[
                "Instrument transfer endpoints (p50/p95 latency) and add retries with idempotency on client and server.",
                "Investigate backend bottlenecks and alert on p95 transfer latency.",
            ]),
            ThemeRule::new(
                USER_INTERFACE,
                &[
                    "ui", "ux", "interface", "design", "layout", "navigation", "navigate",
                    "confusing", "user friendly", "easy to use",
                ],
            )
            .with_actions(&[
                "Run a usability test on the transfer flow and remove unnecessary steps.",
                "Fix confusing screens and add inline help for key tasks.",
            ]),
            ThemeRule::new(
                CUSTOMER_SUPPORT,
                &[
                    "support", "customer service", "customer care", "agent", "call center",
                    "contact", "help", "response", "branch",
                ],
            )
            .with_actions(&[
                "Add in-app support quick actions (chat, call, FAQ) and track first-response time.",
                "Give support agents canned responses for the most frequent issues.",
            ]),
            ThemeRule::new(
                FEATURE_REQUESTS,
                &[
                    "feature", "please add", "should add", "would be nice", "wish", "request",
                    "dark mode", "offline", "notification", "notifications", "receipt",
                    "statement", "qr", "scan", "budget",
                ],
            )
            .with_actions(&[
                "Prioritize the most requested features (notifications, receipts, offline mode) on the roadmap.",
                "Ship lightweight versions of high-demand features and measure adoption.",
            ]),
        ];

        ThemeCatalog {
            rules: rules.into_iter().map(CompiledRule::compile).collect(),
        }
    }

    /// Rules as configured, in catalog order
    pub fn rules(&self) -> impl Iterator<Item = &ThemeRule> {
        self.rules.iter().map(|r| &r.rule)
    }

    pub fn rule(&self, theme: &str) -> Option<&ThemeRule> {
        self.rules().find(|r| r.theme == theme)
    }

    /// Recommended actions for a theme (empty if unknown)
    pub fn actions_for(&self, theme: &str) -> &[String] {
        self.rule(theme).map(|r| r.actions.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for ThemeCatalog {
    fn default() -> Self {
        Self::default_catalog()
    }
}

impl ThemeClassifier for ThemeCatalog {
    fn classify(&self, text: &NormalizedText) -> Vec<ThemeMatch> {
        if text.is_empty() {
            return Vec::new();
        }

        self.rules
            .iter()
            .filter_map(|compiled| {
                let keywords = compiled.matched_keywords(text);
                if keywords.is_empty() {
                    None
                } else {
                    Some(ThemeMatch {
                        theme: compiled.rule.theme.clone(),
                        keywords,
                    })
                }
            })
            .collect()
    }

    fn theme_names(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.rule.theme.clone()).collect()
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()).as_deref(),
        Some("yaml") | Some("yml")
    )
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn themes_of(catalog: &ThemeCatalog, raw: &str) -> Vec<String> {
        catalog
            .classify(&normalize(raw))
            .into_iter()
            .map(|m| m.theme)
            .collect()
    }

    #[test]
    fn test_default_catalog_has_five_themes_in_order() {
        let catalog = ThemeCatalog::default_catalog();
        assert_eq!(
            catalog.theme_names(),
            vec![
                ACCOUNT_ACCESS,
                TRANSACTION_PERFORMANCE,
                USER_INTERFACE,
                CUSTOMER_SUPPORT,
                FEATURE_REQUESTS
            ]
        );
    }

    #[test]
    fn test_single_theme_match_with_evidence() {
        let catalog = ThemeCatalog::default_catalog();
        let matches = catalog.classify(&normalize("Crash on LOGIN, again!"));

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].theme, ACCOUNT_ACCESS);
        assert_eq!(matches[0].keywords, BTreeSet::from(["login".to_string()]));
    }

    #[test]
    fn test_multi_label_reported_in_catalog_order() {
        let catalog = ThemeCatalog::default_catalog();
        let themes = themes_of(&catalog, "Customer service ignored my slow transfer");
        assert_eq!(themes, vec![TRANSACTION_PERFORMANCE, CUSTOMER_SUPPORT]);
    }

    #[test]
    fn test_keyword_evidence_is_sorted_and_complete() {
        let catalog = ThemeCatalog::default_catalog();
        let matches = catalog.classify(&normalize("Transfer pending, very slow"));
        assert_eq!(matches[0].theme, TRANSACTION_PERFORMANCE);
        let keywords: Vec<&str> = matches[0].keywords.iter().map(|s| s.as_str()).collect();
        assert_eq!(keywords, vec!["pending", "slow", "transfer"]);
    }

    #[test]
    fn test_word_boundary_policy() {
        let catalog = ThemeCatalog::default_catalog();
        // "pin" must not fire inside "spinning", "ui" not inside "guide"
        assert!(themes_of(&catalog, "spinning wheel guide").is_empty());
        assert_eq!(themes_of(&catalog, "forgot my PIN"), vec![ACCOUNT_ACCESS]);
    }

    #[test]
    fn test_keywords_normalized_like_text() {
        let catalog =
            ThemeCatalog::from_rules(vec![ThemeRule::new("Access", &["Sign-In"])]).unwrap();
        let matches = catalog.classify(&normalize("cannot sign in since update"));
        assert_eq!(matches.len(), 1);
        assert!(matches[0].keywords.contains("Sign-In"));
    }

    #[test]
    fn test_unclassifiable_text_matches_nothing() {
        let catalog = ThemeCatalog::default_catalog();
        assert!(catalog.classify(&normalize("👍👍👍")).is_empty());
        assert!(catalog.classify(&normalize("")).is_empty());
    }

    #[test]
    fn test_evaluation_order_does_not_change_membership() {
        let forward = ThemeCatalog::from_rules(vec![
            ThemeRule::new("A", &["slow"]),
            ThemeRule::new("B", &["support"]),
        ])
        .unwrap();
        let reversed = ThemeCatalog::from_rules(vec![
            ThemeRule::new("B", &["support"]),
            ThemeRule::new("A", &["slow"]),
        ])
        .unwrap();

        let text = normalize("slow support");
        let mut a: Vec<String> = forward.classify(&text).into_iter().map(|m| m.theme).collect();
        let b: Vec<String> = reversed.classify(&text).into_iter().map(|m| m.theme).collect();
        assert_eq!(a, vec!["A", "B"]);
        assert_eq!(b, vec!["B", "A"]);
        a.sort();
        let mut b_sorted = b.clone();
        b_sorted.sort();
        assert_eq!(a, b_sorted);
    }

    #[test]
    fn test_catalog_validation() {
        assert!(ThemeCatalog::from_rules(vec![]).is_err());

        let dup = ThemeCatalog::from_rules(vec![
            ThemeRule::new("A", &["x"]),
            ThemeRule::new("A", &["y"]),
        ]);
        assert!(matches!(dup, Err(InsightError::InvalidCatalog(_))));

        // Keywords that normalize to nothing are dropped, not fatal
        let catalog = ThemeCatalog::from_rules(vec![ThemeRule::new("A", &["!!!", "ok"])]).unwrap();
        assert_eq!(catalog.classify(&normalize("ok")).len(), 1);
    }

    #[test]
    fn test_actions_lookup() {
        let catalog = ThemeCatalog::default_catalog();
        assert_eq!(catalog.actions_for(ACCOUNT_ACCESS).len(), 2);
        assert!(catalog.actions_for("Unknown Theme").is_empty());
    }
}
