//! Detection of job listings the model invented instead of fetching.

use super::filters::{ContentFilter, PatternFilter};
use super::result::CheckResult;

/// Shown to the user once per turn when fabricated listings are intercepted.
pub const INTERCEPTION_NOTICE: &str =
    "抱歉，我需要先查询实际的岗位数据才能为您推荐。请稍等，我正在为您搜索符合条件的岗位...";

/// Appended as a user message before forcing the job tool.
pub const CORRECTIVE_MESSAGE: &str = "请调用岗位查询工具获取真实数据，不要自行编造岗位信息。";

/// Distinct pattern matches needed before text counts as fabricated.
pub const DEFAULT_THRESHOLD: usize = 2;

const FIELD_LABEL_PATTERNS: &[&str] = &[
    r"岗位名称[：:]\s*\S+",
    r"公司名称[：:]\s*\S+",
    r"薪资范围[：:]\s*\d+",
    r"工作地点[：:]\s*\S+",
    r"学历要求[：:]\s*\S+",
    r"经验要求[：:]\s*\S+",
    r"\bjob\s+title\s*:\s*\S+",
    r"\bcompany(?:\s+name)?\s*:\s*\S+",
    r"\bsalary(?:\s+range)?\s*:\s*\$?\d+",
];

const SALARY_PATTERNS: &[&str] = &[
    r"\d+[-~到至]\d+元[/／每]月",
    r"\d+[kK][-~到至]\d+[kK]",
    r"\b\d{4,6}\s*[-~]\s*\d{4,6}\s*(?:/\s*month|per\s+month|yuan|rmb)",
];

const LISTING_PHRASE_PATTERNS: &[&str] = &[
    r"(?:推荐|适合)[^。]*(?:岗位|职位|工作)[：:]\s*\d+[.、]",
    r"以下是[^。]*(?:岗位|职位|工作)",
    r"为您(?:推荐|找到)[^。]*(?:岗位|职位|工作)",
    r"\brecommended\s+(?:positions|jobs|roles)\s*:",
];

/// Pattern-count classifier for job-shaped prose.
#[derive(Debug, Clone)]
pub struct FabricationDetector {
    patterns: PatternFilter,
    threshold: usize,
}

impl Default for FabricationDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FabricationDetector {
    pub fn new() -> Self {
        let mut patterns = PatternFilter::new();
        for (group, category) in [
            (FIELD_LABEL_PATTERNS, "field_label"),
            (SALARY_PATTERNS, "salary"),
            (LISTING_PHRASE_PATTERNS, "listing_phrase"),
        ] {
            for p in group {
                patterns.add_pattern(p, false, Some(category));
            }
        }
        Self {
            patterns,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold.max(1);
        self
    }

    pub fn check(&self, text: &str) -> CheckResult {
        if text.is_empty() {
            return CheckResult::passed();
        }
        self.patterns.check(text)
    }

    /// True when `text` matches at least `threshold` distinct patterns.
    pub fn is_fabricated(&self, text: &str) -> bool {
        let result = self.check(text);
        let hits = result.distinct_patterns();
        if hits >= self.threshold {
            tracing::info!(patterns = hits, "job-shaped text without tool data detected");
            true
        } else {
            false
        }
    }
}
