/// Workspace-wide error type.
///
/// The completion-endpoint variants (`Authentication`, `RateLimited`,
/// `Network`) are kept distinct so the message handler can pick a
/// user-facing notice per cause.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("agent error: {0}")]
    Agent(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("network error: {0}")]
    Network(String),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures raised while dispatching a model-requested tool call.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("external lookup failed: {0}")]
    ExternalLookup(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_converts_transparently() {
        let err: Error = ToolError::UnknownTool("weather".into()).into();
        assert!(matches!(err, Error::Tool(ToolError::UnknownTool(_))));
        assert_eq!(err.to_string(), "unknown tool: weather");
    }

    #[test]
    fn invalid_arguments_names_the_tool() {
        let err = ToolError::InvalidArguments {
            tool: "get_crypto_price".into(),
            reason: "missing field `symbols`".into(),
        };
        let text = err.to_string();
        assert!(text.contains("get_crypto_price"));
        assert!(text.contains("symbols"));
    }
}
