pub mod openai;
pub mod providers;
pub mod tools;

pub use openai::OpenAiProvider;
pub use providers::{
    ChatMessage, ChatRole, ContentBlock, LlmProvider, LlmRequest, LlmResponse, MessagePart,
    SamplingParams, ToolDefinition, Usage, extract_text,
};
pub use tools::{CryptoPriceTool, Tool, ToolRegistry};
