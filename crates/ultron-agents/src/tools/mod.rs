//! Capabilities the model may ask the bot to run on its behalf.
//!
//! The set is closed: every capability is a [`Tool`] variant, and a name
//! that matches no variant is an explicit [`ToolError::UnknownTool`].

use serde_json::Value;
use tracing::{info, instrument};
use ultron_common::ToolError;

use crate::providers::ToolDefinition;

pub mod crypto_price;

pub use crypto_price::CryptoPriceTool;

/// A callable capability.
#[derive(Clone)]
pub enum Tool {
    CryptoPrice(CryptoPriceTool),
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::CryptoPrice(_) => CryptoPriceTool::NAME,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::CryptoPrice(_) => CryptoPriceTool::DESCRIPTION,
        }
    }

    pub fn input_schema(&self) -> Value {
        match self {
            Tool::CryptoPrice(_) => CryptoPriceTool::input_schema(),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }

    /// Validate `args` against this tool's shape and run it.
    pub async fn invoke(&self, args: &Value) -> Result<Value, ToolError> {
        match self {
            Tool::CryptoPrice(tool) => tool.invoke(args).await,
        }
    }
}

/// Fixed set of tools offered to the model.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Tool>) -> Self {
        for tool in &tools {
            info!("registered tool: {}", tool.name());
        }
        Self { tools }
    }

    /// Registry with the price lookup pointed at `price_api_base_url`.
    pub fn with_defaults(price_api_base_url: impl Into<String>) -> Self {
        Self::new(vec![Tool::CryptoPrice(CryptoPriceTool::new(
            price_api_base_url,
        ))])
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(Tool::definition).collect()
    }

    pub fn find(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Run the tool called `name` with the model-supplied arguments.
    #[instrument(skip(self, args))]
    pub async fn dispatch(&self, name: &str, args: &Value) -> Result<Value, ToolError> {
        let tool = self
            .find(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.invoke(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn definitions_describe_the_price_tool() {
        let registry = ToolRegistry::with_defaults("http://localhost");
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "get_crypto_price");
        assert_eq!(defs[0].input_schema["required"], json!(["symbols"]));
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let registry = ToolRegistry::with_defaults("http://localhost");
        let err = registry
            .dispatch("get_weather", &json!({"location": "Boston"}))
            .await
            .expect_err("should not dispatch");
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "get_weather"));
    }

    #[tokio::test]
    async fn empty_registry_knows_nothing() {
        let registry = ToolRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.definitions().is_empty());
        assert!(matches!(
            registry.dispatch("get_crypto_price", &json!({})).await,
            Err(ToolError::UnknownTool(_))
        ));
    }
}
