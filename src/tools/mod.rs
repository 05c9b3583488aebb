//! 工具模块：工具定义、系统提示词和工具调用分发。
//!
//! # Tools Module
//!
//! | Tool | Backend |
//! |------|---------|
//! | `queryLocation` | Amap place search |
//! | `queryJobsByArea` / `queryJobsByLocation` | Job API |
//! | `parsePDF` / `parseImage` | none (files are resolved at upload time) |
//! | `queryPolicy` | Policy consultation service |
//!
//! Tool failures are values: the orchestrator turns a [`ToolError`] into a
//! tool message for the model. Only [`ToolError::is_fatal`] errors end a turn.

pub mod args;
pub mod catalog;
pub mod dispatcher;
pub mod format;

pub use catalog::{system_prompt, tool_definitions};
pub use dispatcher::ToolDispatcher;
pub use format::{JobListing, JobSearchOutput};

use crate::types::ToolDefinition;
use async_trait::async_trait;

pub mod names {
    pub const QUERY_LOCATION: &str = "queryLocation";
    pub const QUERY_JOBS_BY_AREA: &str = "queryJobsByArea";
    pub const QUERY_JOBS_BY_LOCATION: &str = "queryJobsByLocation";
    pub const PARSE_PDF: &str = "parsePDF";
    pub const PARSE_IMAGE: &str = "parseImage";
    pub const QUERY_POLICY: &str = "queryPolicy";
}

/// Tools whose successful result is a job listing.
pub fn is_job_tool(name: &str) -> bool {
    matches!(name, names::QUERY_JOBS_BY_AREA | names::QUERY_JOBS_BY_LOCATION)
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("工具参数为空")]
    EmptyArguments,

    /// The model produced arguments that are not JSON at all.
    #[error("工具参数不是合法的JSON: {0}")]
    MalformedArguments(String),

    #[error("缺少{0}参数")]
    MissingArgument(&'static str),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Unsupported(&'static str),

    #[error("未知的工具: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    Backend(#[from] crate::Error),
}

impl ToolError {
    /// Errors that break the tool-calling protocol rather than a single call.
    pub fn is_fatal(&self) -> bool {
        match self {
            ToolError::MalformedArguments(_) => true,
            ToolError::Backend(e) => e.is_cancelled(),
            _ => false,
        }
    }
}

#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn definitions(&self) -> &[ToolDefinition];

    /// Runs one tool. `arguments` is the raw JSON text from the model.
    async fn execute(&self, name: &str, arguments: &str) -> Result<String, ToolError>;
}
