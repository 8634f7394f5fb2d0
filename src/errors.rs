use thiserror::Error;

#[derive(Debug, Error)]
#[error("{message}")]
pub struct InvalidParamsError {
    tool: &'static str,
    message: String,
    path: Option<String>,
}

impl InvalidParamsError {
    pub fn new(tool: &'static str, message: impl Into<String>) -> Self {
        Self {
            tool,
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn tool(&self) -> &'static str {
        self.tool
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

#[derive(Debug, Error)]
#[error("Unknown tool: {0}")]
pub struct UnknownToolError(pub String);

#[derive(Debug, Error)]
#[error(
    "spreadsheet discovery is unavailable: '{tool_name}' requires extended (OAuth) authorization; \
API-key mode can only read public sheets by id"
)]
pub struct DiscoveryUnavailableError {
    tool_name: &'static str,
}

impl DiscoveryUnavailableError {
    pub fn new(tool_name: &'static str) -> Self {
        Self { tool_name }
    }
}

#[derive(Debug, Error)]
#[error("tool '{tool_name}' timed out after {millis}ms")]
pub struct ToolTimeoutError {
    tool_name: String,
    millis: u128,
}

impl ToolTimeoutError {
    pub fn new(tool_name: &str, millis: u128) -> Self {
        Self {
            tool_name: tool_name.to_ascii_lowercase(),
            millis,
        }
    }
}

#[derive(Debug, Error)]
#[error(
    "tool '{tool_name}' response too large ({size} bytes > {limit} bytes); narrow the range or lower the limit"
)]
pub struct ResponseTooLargeError {
    tool_name: String,
    size: usize,
    limit: usize,
}

impl ResponseTooLargeError {
    pub fn new(tool_name: &str, size: usize, limit: usize) -> Self {
        Self {
            tool_name: tool_name.to_ascii_lowercase(),
            size,
            limit,
        }
    }
}
