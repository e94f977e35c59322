//! Keyword routing: maps user text to a template key.
//!
//! Rules are evaluated in declaration order, first match wins. A rule set is
//! only valid when its final rule is a catch-all, so routing always yields a
//! key.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Full-string equality.
    Exact(String),
    /// Substring presence.
    Contains(String),
    /// Always matches. Valid only as the final rule.
    Any,
}

impl Matcher {
    fn matches(&self, text: &str) -> bool {
        match self {
            Matcher::Exact(pattern) => text == pattern,
            Matcher::Contains(pattern) => text.contains(pattern.as_str()),
            Matcher::Any => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
    pub matcher: Matcher,
    pub template_key: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleSetError {
    #[error("rule set must end with a catch-all rule")]
    MissingDefault,
    #[error("catch-all rule must be the last rule (found at position {0})")]
    EarlyDefault(usize),
    #[error("rule {0} has an empty pattern")]
    EmptyPattern(usize),
    #[error("rule {0} has an empty template key")]
    EmptyTemplateKey(usize),
}

/// An ordered, validated list of keyword rules ending in a catch-all.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<KeywordRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<KeywordRule>) -> Result<Self, RuleSetError> {
        let Some(last) = rules.last() else {
            return Err(RuleSetError::MissingDefault);
        };
        if last.matcher != Matcher::Any {
            return Err(RuleSetError::MissingDefault);
        }
        for (i, rule) in rules.iter().enumerate() {
            if rule.template_key.is_empty() {
                return Err(RuleSetError::EmptyTemplateKey(i));
            }
            match &rule.matcher {
                Matcher::Any if i + 1 != rules.len() => {
                    return Err(RuleSetError::EarlyDefault(i));
                }
                Matcher::Exact(p) | Matcher::Contains(p) if p.is_empty() => {
                    return Err(RuleSetError::EmptyPattern(i));
                }
                _ => {}
            }
        }
        Ok(Self { rules })
    }

    /// First-match-wins evaluation. The trailing catch-all guarantees a result.
    pub fn route(&self, text: &str) -> &str {
        for rule in &self.rules {
            if rule.matcher.matches(text) {
                return &rule.template_key;
            }
        }
        // Unreachable: construction enforces a trailing catch-all.
        &self.rules[self.rules.len() - 1].template_key
    }

    /// Template key of the trailing catch-all rule.
    pub fn default_key(&self) -> &str {
        &self.rules[self.rules.len() - 1].template_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_rules() -> RuleSet {
        RuleSet::new(vec![
            KeywordRule {
                matcher: Matcher::Contains("予約".into()),
                template_key: "reservation".into(),
            },
            KeywordRule {
                matcher: Matcher::Exact("こんにちは".into()),
                template_key: "greeting".into(),
            },
            KeywordRule {
                matcher: Matcher::Any,
                template_key: "echo".into(),
            },
        ])
        .unwrap()
    }

    #[test]
    fn contains_rule_matches_substring() {
        assert_eq!(fixture_rules().route("予約したい"), "reservation");
    }

    #[test]
    fn exact_rule_requires_full_equality() {
        let rules = fixture_rules();
        assert_eq!(rules.route("こんにちは"), "greeting");
        // A superset of the exact pattern falls through to the default.
        assert_eq!(rules.route("こんにちは！"), "echo");
    }

    #[test]
    fn first_match_wins_in_declaration_order() {
        // Satisfies the contains rule; later rules never get a look.
        assert_eq!(
            fixture_rules().route("こんにちは、予約お願いします"),
            "reservation"
        );
    }

    #[test]
    fn unmatched_text_hits_default() {
        let rules = fixture_rules();
        assert_eq!(rules.route("xyz123"), "echo");
        assert_eq!(rules.default_key(), "echo");
    }

    #[test]
    fn rule_set_requires_trailing_catch_all() {
        let err = RuleSet::new(vec![KeywordRule {
            matcher: Matcher::Exact("hi".into()),
            template_key: "greeting".into(),
        }])
        .unwrap_err();
        assert_eq!(err, RuleSetError::MissingDefault);

        assert_eq!(RuleSet::new(vec![]).unwrap_err(), RuleSetError::MissingDefault);
    }

    #[test]
    fn rule_set_rejects_catch_all_before_last() {
        let err = RuleSet::new(vec![
            KeywordRule {
                matcher: Matcher::Any,
                template_key: "echo".into(),
            },
            KeywordRule {
                matcher: Matcher::Any,
                template_key: "echo".into(),
            },
        ])
        .unwrap_err();
        assert_eq!(err, RuleSetError::EarlyDefault(0));
    }

    #[test]
    fn rule_set_rejects_empty_patterns_and_keys() {
        let err = RuleSet::new(vec![
            KeywordRule {
                matcher: Matcher::Contains(String::new()),
                template_key: "x".into(),
            },
            KeywordRule {
                matcher: Matcher::Any,
                template_key: "echo".into(),
            },
        ])
        .unwrap_err();
        assert_eq!(err, RuleSetError::EmptyPattern(0));

        let err = RuleSet::new(vec![KeywordRule {
            matcher: Matcher::Any,
            template_key: String::new(),
        }])
        .unwrap_err();
        assert_eq!(err, RuleSetError::EmptyTemplateKey(0));
    }
}
