//! Check result types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Type of violation detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    /// Keyword match
    Keyword,
    /// Regex pattern match
    Pattern,
}

/// A detected violation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub violation_type: ViolationType,
    /// The pattern or keyword that matched
    pub pattern: String,
    /// Category of the rule, e.g. `field_label` or `salary`
    pub category: Option<String>,
    /// The matched text
    pub matched_text: Option<String>,
}

/// Result of a content check
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckResult {
    violations: Vec<Violation>,
}

impl CheckResult {
    /// Create a passed result (no violations)
    pub fn passed() -> Self {
        Self::default()
    }

    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn is_passed(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Number of different rules that matched at least once.
    pub fn distinct_patterns(&self) -> usize {
        self.violations
            .iter()
            .map(|v| v.pattern.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}
