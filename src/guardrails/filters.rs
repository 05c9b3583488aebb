//! Content filtering implementations

use super::result::{CheckResult, Violation, ViolationType};
use regex::Regex;

/// Trait for content filters
pub trait ContentFilter: Send + Sync {
    /// Check content for violations
    fn check(&self, content: &str) -> CheckResult;

    /// Number of distinct rules that match `content`.
    fn count_matches(&self, content: &str) -> usize {
        self.check(content).distinct_patterns()
    }
}

/// Case-insensitive keyword filter
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    rules: Vec<CompiledKeywordRule>,
}

#[derive(Debug, Clone)]
struct CompiledKeywordRule {
    keyword: String,
    keyword_lower: String,
    category: Option<String>,
}

impl KeywordFilter {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn from_keywords<I, S>(keywords: I, category: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filter = Self::new();
        for k in keywords {
            filter.add_keyword(k, category);
        }
        filter
    }

    pub fn add_keyword(&mut self, keyword: impl Into<String>, category: Option<&str>) {
        let keyword = keyword.into();
        self.rules.push(CompiledKeywordRule {
            keyword_lower: keyword.to_lowercase(),
            keyword,
            category: category.map(str::to_string),
        });
    }

    /// First keyword found in `content`, if any.
    pub fn first_match(&self, content: &str) -> Option<&str> {
        let content_lower = content.to_lowercase();
        self.rules
            .iter()
            .find(|r| content_lower.contains(&r.keyword_lower))
            .map(|r| r.keyword.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl ContentFilter for KeywordFilter {
    fn check(&self, content: &str) -> CheckResult {
        let content_lower = content.to_lowercase();
        let violations = self
            .rules
            .iter()
            .filter(|rule| content_lower.contains(&rule.keyword_lower))
            .map(|rule| Violation {
                violation_type: ViolationType::Keyword,
                pattern: rule.keyword.clone(),
                category: rule.category.clone(),
                matched_text: Some(rule.keyword.clone()),
            })
            .collect();
        CheckResult::from_violations(violations)
    }
}

/// Regex pattern-based content filter.
///
/// Patterns are compiled once when added; an invalid pattern is logged and
/// skipped.
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    rules: Vec<CompiledPatternRule>,
}

#[derive(Debug, Clone)]
struct CompiledPatternRule {
    pattern_str: String,
    regex: Regex,
    category: Option<String>,
}

impl PatternFilter {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add_pattern(&mut self, pattern: &str, case_sensitive: bool, category: Option<&str>) {
        match Self::compile_pattern(pattern, case_sensitive) {
            Some(regex) => self.rules.push(CompiledPatternRule {
                pattern_str: pattern.to_string(),
                regex,
                category: category.map(str::to_string),
            }),
            None => tracing::warn!(pattern, "skipping invalid filter pattern"),
        }
    }

    fn compile_pattern(pattern: &str, case_sensitive: bool) -> Option<Regex> {
        let pattern_str = if case_sensitive {
            pattern.to_string()
        } else {
            format!("(?i){}", pattern)
        };

        Regex::new(&pattern_str).ok()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl ContentFilter for PatternFilter {
    fn check(&self, content: &str) -> CheckResult {
        let violations = self
            .rules
            .iter()
            .filter_map(|rule| {
                rule.regex.find(content).map(|m| Violation {
                    violation_type: ViolationType::Pattern,
                    pattern: rule.pattern_str.clone(),
                    category: rule.category.clone(),
                    matched_text: Some(m.as_str().to_string()),
                })
            })
            .collect();
        CheckResult::from_violations(violations)
    }
}
