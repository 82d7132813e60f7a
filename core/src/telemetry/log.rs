use crate::prelude::{SurveyError, ToolKind};
use log::{info, warn};

/// Routes a tool session's records through the `log` facade, tagged with the tool slug.
#[derive(Debug, Clone, Copy)]
pub struct LogManager {
    tool: ToolKind,
}

impl LogManager {
    pub fn for_tool(tool: ToolKind) -> Self {
        Self { tool }
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn record(&self, message: &str) {
        info!(target: "survey", "[{}] {}", self.tool, message);
    }

    pub fn warn(&self, message: &str) {
        warn!(target: "survey", "[{}] {}", self.tool, message);
    }

    pub fn failure(&self, action: &str, error: &SurveyError) {
        warn!(target: "survey", "[{}] {} failed: {}", self.tool, action, error);
    }
}
