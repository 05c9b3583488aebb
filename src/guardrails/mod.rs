//! 内容守卫模块：思维链过滤、岗位幻觉检测和用户意图识别。
//!
//! # Guardrails Module
//!
//! Content checks applied to model output and user input.
//!
//! ## Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ReasoningFilter`] | Streaming removal of `<think>` spans |
//! | [`strip_reasoning_spans`] | Whole-text removal of `<think>` spans |
//! | [`FabricationDetector`] | Flags job listings the model made up |
//! | [`IntentClassifier`] | Job intent and resume keyword checks |
//! | [`KeywordFilter`] / [`PatternFilter`] | Building blocks for the above |
//! | [`CheckResult`] | Matches found by a filter |
//!
//! ## Example
//!
//! ```rust
//! use job_chat_gateway::guardrails::{FabricationDetector, ReasoningFilter};
//!
//! let mut filter = ReasoningFilter::new();
//! assert_eq!(filter.filter_fragment("<think>plan"), "");
//! assert_eq!(filter.filter_fragment("</think>您好"), "您好");
//!
//! let detector = FabricationDetector::new();
//! assert!(detector.is_fabricated("job title: Java Engineer\nsalary range: 8000-12000"));
//! ```

mod fabrication;
mod filters;
mod intent;
mod reasoning;
mod result;

pub use fabrication::{FabricationDetector, CORRECTIVE_MESSAGE, DEFAULT_THRESHOLD, INTERCEPTION_NOTICE};
pub use filters::{ContentFilter, KeywordFilter, PatternFilter};
pub use intent::{IntentClassifier, NON_RESUME_IMAGE_HINT, RESUME_KEYWORD_THRESHOLD};
pub use reasoning::{
    contains_reasoning_markers, strip_reasoning_spans, ReasoningFilter, SpanState, SPAN_END,
    SPAN_START,
};
pub use result::{CheckResult, Violation, ViolationType};
